use std::cmp::Ordering;
use std::ops::Range;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::Ranker;
use crate::attribute::Attribute;
use crate::classifier::{ClassifierKind, LinearClassifier};
use crate::dataset::TrainingData;
use crate::error::{Error, Result};
use crate::feature::{AggregateFeatureVector, FeatureVectorFactory};
use crate::train::{ClassifierConfig, CostTable};
use crate::weights::WeightAggregate;

/// Normalization applied to the initial scores of the top candidates
/// before they are featurized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rescaling {
    #[default]
    None,
    /// Mean 0, unit variance within one query; constant scores map to 0
    Standardize,
}

impl Rescaling {
    pub fn apply(&self, scores: &mut [f64]) {
        if *self == Rescaling::None || scores.is_empty() {
            return;
        }
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        for s in scores.iter_mut() {
            *s = if std_dev > 0.0 { (*s - mean) / std_dev } else { 0.0 };
        }
    }
}

/// Turns one candidate of a query into features for the rerank classifier.
pub trait CandidateFeaturizer<Q, C> {
    /// `score` is the (rescaled) initial score, `rank` the 1-based initial rank
    fn features(&self, query: &Q, candidate: &C, score: f64, rank: usize) -> Vec<Attribute>;
}

impl<Q, C, T> CandidateFeaturizer<Q, C> for T
where
    T: Fn(&Q, &C, f64, usize) -> Vec<Attribute>,
{
    fn features(&self, query: &Q, candidate: &C, score: f64, rank: usize) -> Vec<Attribute> {
        self(query, candidate, score, rank)
    }
}

/// Trains the initial ranker from `(query, correct candidate)` examples.
pub trait InitialRankerTrainer<Q, C> {
    type Ranker: Ranker<Q, C>;

    fn train(&self, corpus: &[(Q, C)]) -> Result<Self::Ranker>;
}

/// Reranker settings.
#[derive(Debug, Clone)]
pub struct RerankerConfig {
    top_n: usize,
    number_of_splits: usize,
    rescaling: Rescaling,
    classifier: ClassifierConfig,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            number_of_splits: 5,
            rescaling: Rescaling::None,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl RerankerConfig {
    /// Number of initial candidates the classifier rescores
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn set_top_n(&mut self, top_n: usize) -> Result<()> {
        if top_n < 1 {
            return Err(Error::invalid("top_n must be at least 1"));
        }
        self.top_n = top_n;
        Ok(())
    }

    pub fn number_of_splits(&self) -> usize {
        self.number_of_splits
    }

    pub fn set_number_of_splits(&mut self, number_of_splits: usize) -> Result<()> {
        if number_of_splits < 2 {
            return Err(Error::invalid("number_of_splits must be at least 2"));
        }
        self.number_of_splits = number_of_splits;
        Ok(())
    }

    pub fn rescaling(&self) -> Rescaling {
        self.rescaling
    }

    pub fn set_rescaling(&mut self, rescaling: Rescaling) {
        self.rescaling = rescaling;
    }

    pub fn classifier(&self) -> &ClassifierConfig {
        &self.classifier
    }

    pub fn classifier_mut(&mut self) -> &mut ClassifierConfig {
        &mut self.classifier
    }

    pub fn with_top_n(mut self, top_n: usize) -> Result<Self> {
        self.set_top_n(top_n)?;
        Ok(self)
    }

    pub fn with_number_of_splits(mut self, number_of_splits: usize) -> Result<Self> {
        self.set_number_of_splits(number_of_splits)?;
        Ok(self)
    }

    pub fn with_rescaling(mut self, rescaling: Rescaling) -> Self {
        self.rescaling = rescaling;
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }
}

/// Two-stage ranker: an initial ranker proposes candidates and a linear
/// classifier reorders the best `top_n` of them.
#[derive(Debug, Clone)]
pub struct Reranker<R, Fz> {
    initial: R,
    classifier: LinearClassifier,
    featurizer: Fz,
    factory: FeatureVectorFactory,
    top_n: usize,
    rescaling: Rescaling,
}

impl<R, Fz> Reranker<R, Fz> {
    /// Combine an initial ranker with a rerank classifier.
    ///
    /// The classifier must score candidates with one shared weight vector,
    /// so that it yields exactly one score per candidate of any query.
    pub fn new(
        initial: R,
        classifier: LinearClassifier,
        featurizer: Fz,
        factory: FeatureVectorFactory,
        top_n: usize,
        rescaling: Rescaling,
    ) -> Result<Self> {
        let shared = matches!(classifier.weights(), WeightAggregate::Single(_));
        if classifier.kind() != ClassifierKind::MultiLabel || !shared {
            return Err(Error::invalid(
                "reranking requires a multi-label classifier with shared weights",
            ));
        }
        if top_n < 1 {
            return Err(Error::invalid("top_n must be at least 1"));
        }
        Ok(Self {
            initial,
            classifier,
            featurizer,
            factory,
            top_n,
            rescaling,
        })
    }

    pub fn initial_ranker(&self) -> &R {
        &self.initial
    }

    pub fn classifier(&self) -> &LinearClassifier {
        &self.classifier
    }

    pub fn factory(&self) -> &FeatureVectorFactory {
        &self.factory
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }
}

/// Features of each candidate in `top`, in order
fn featurize<Q, C, Fz>(
    featurizer: &Fz,
    query: &Q,
    top: &[(C, f64)],
    rescaling: Rescaling,
) -> Vec<Vec<Attribute>>
where
    Fz: CandidateFeaturizer<Q, C> + ?Sized,
{
    let mut scores: Vec<f64> = top.iter().map(|(_, s)| *s).collect();
    rescaling.apply(&mut scores);
    top.iter()
        .zip(scores)
        .enumerate()
        .map(|(i, ((candidate, _), score))| featurizer.features(query, candidate, score, i + 1))
        .collect()
}

fn by_score_desc<C>(a: &(C, f64), b: &(C, f64)) -> Ordering {
    b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal)
}

impl<Q, C, R, Fz> Ranker<Q, C> for Reranker<R, Fz>
where
    R: Ranker<Q, C>,
    Fz: CandidateFeaturizer<Q, C>,
{
    fn evaluate(
        &self,
        query: &Q,
        correct: Option<&C>,
        include_correct: bool,
    ) -> Result<Vec<(C, f64)>> {
        let mut ranked = self.initial.evaluate(query, correct, include_correct)?;
        if ranked.is_empty() {
            return Ok(ranked);
        }
        let rest = ranked.split_off(self.top_n.min(ranked.len()));
        let top = ranked;

        let candidates = featurize(&self.featurizer, query, &top, self.rescaling);
        // features unseen in training carry no weight; leave the mapper as is
        let fv = self.factory.lookup_aggregate(&candidates)?;
        let scores = self.classifier.scores(&fv);
        if scores.len() != top.len() {
            return Err(Error::DepthMismatch {
                expected: top.len(),
                actual: scores.len(),
            });
        }

        let mut reranked: Vec<(C, f64)> = top
            .into_iter()
            .zip(scores)
            .map(|((candidate, _), score)| (candidate, score))
            .collect();
        // stable: ties keep their initial order
        reranked.sort_by(by_score_desc);

        // keep every reranked score strictly above the remainder
        if let Some(best_rest) = rest.iter().map(|(_, s)| *s).reduce(f64::max) {
            let lowest = reranked.iter().map(|(_, s)| *s).fold(f64::INFINITY, f64::min);
            let shift = best_rest + 1.0 - lowest;
            for (_, score) in reranked.iter_mut() {
                *score += shift;
            }
        }

        reranked.extend(rest);
        Ok(reranked)
    }
}

/// Per-split accounting of reranker training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitReport {
    pub split: usize,
    /// Examples in the held-out split
    pub held_out: usize,
    /// Examples turned into training instances
    pub used: usize,
    /// Examples dropped because their correct candidate could not be placed
    pub skipped: usize,
}

/// Contiguous, nearly equal ranges covering `0..len`
pub fn split_ranges(len: usize, number_of_splits: usize) -> Vec<Range<usize>> {
    (0..number_of_splits)
        .map(|i| (i * len / number_of_splits)..((i + 1) * len / number_of_splits))
        .collect()
}

/// One held-out example ready to become a training instance
struct RawInstance {
    /// Features of each top candidate, padded to `top_n`
    candidates: Vec<Vec<Attribute>>,
    /// Position of the correct candidate
    label: usize,
    costs: Vec<Vec<f64>>,
}

/// Cost matrix of one example; only the row of the correct candidate is
/// ever consulted, so only that row is filled.
///
/// Padding slots cost as much as the costliest real rival, or 1 when there
/// is none.
fn candidate_costs<Q, C, K>(
    cost: &K,
    query: &Q,
    top: &[(C, f64)],
    label: usize,
    top_n: usize,
) -> Vec<Vec<f64>>
where
    K: Fn(&Q, &C, &C) -> f64 + ?Sized,
{
    let correct = &top[label].0;
    let mut row: Vec<f64> = top
        .iter()
        .enumerate()
        .map(|(i, (candidate, _))| {
            if i == label {
                0.0
            } else {
                cost(query, correct, candidate)
            }
        })
        .collect();
    let padding = if top.len() > 1 {
        row.iter().copied().fold(0.0, f64::max)
    } else {
        1.0
    };
    row.resize(top_n, padding);

    let mut matrix = vec![vec![0.0; top_n]; top_n];
    matrix[label] = row;
    matrix
}

/// Trains a [`Reranker`] by k-fold cross-training of the initial ranker.
#[derive(Debug, Clone)]
pub struct RerankerTrainer<T, Fz> {
    initial_trainer: T,
    featurizer: Fz,
    factory: FeatureVectorFactory,
    config: RerankerConfig,
    verbose: bool,
}

impl<T, Fz> RerankerTrainer<T, Fz> {
    pub fn new(
        initial_trainer: T,
        featurizer: Fz,
        factory: FeatureVectorFactory,
        config: RerankerConfig,
    ) -> Self {
        Self {
            initial_trainer,
            featurizer,
            factory,
            config,
            verbose: false,
        }
    }

    /// Enable or disable verbose output
    pub fn verbose(&mut self, enabled: bool) -> &mut Self {
        self.verbose = enabled;
        self
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }
}

impl<T, Fz> RerankerTrainer<T, Fz>
where
    Fz: Clone,
{
    /// Train the rerank classifier on held-out rankings and a final initial
    /// ranker on the whole corpus.
    ///
    /// Each split is ranked by an initial ranker trained on every other
    /// split, so no example contributes to the ranking that produces its
    /// own training instance. Cost-sensitive training charges every wrong
    /// candidate the same; see [`train_with_cost`](Self::train_with_cost).
    pub fn train<Q, C>(
        &self,
        corpus: &[(Q, C)],
    ) -> Result<(Reranker<<T as InitialRankerTrainer<Q, C>>::Ranker, Fz>, Vec<SplitReport>)>
    where
        Q: Clone + Send + Sync,
        C: Clone + PartialEq + Send + Sync,
        T: InitialRankerTrainer<Q, C> + Sync,
        Fz: CandidateFeaturizer<Q, C> + Sync,
    {
        self.train_with_cost(corpus, &|_: &Q, _: &C, _: &C| 1.0)
    }

    /// Like [`train`](Self::train), with `cost(query, correct, predicted)`
    /// pricing each wrong candidate for the cost-sensitive trainer.
    ///
    /// Other training methods ignore the cost.
    pub fn train_with_cost<Q, C, K>(
        &self,
        corpus: &[(Q, C)],
        cost: &K,
    ) -> Result<(Reranker<<T as InitialRankerTrainer<Q, C>>::Ranker, Fz>, Vec<SplitReport>)>
    where
        Q: Clone + Send + Sync,
        C: Clone + PartialEq + Send + Sync,
        T: InitialRankerTrainer<Q, C> + Sync,
        Fz: CandidateFeaturizer<Q, C> + Sync,
        K: Fn(&Q, &C, &C) -> f64 + Sync + ?Sized,
    {
        if corpus.is_empty() {
            return Err(Error::EmptyTrainingData);
        }
        let ranges = split_ranges(corpus.len(), self.config.number_of_splits);

        // Rankers and features are built in parallel; interning happens below
        // in split order so feature indices do not depend on scheduling.
        let per_split = ranges
            .par_iter()
            .enumerate()
            .map(|(split, range)| self.held_out_instances(corpus, split, range.clone(), cost))
            .collect::<Result<Vec<_>>>()?;

        let mut instances = Vec::new();
        let mut costs = CostTable::new();
        let mut reports = Vec::with_capacity(per_split.len());
        for (raw, report) in per_split {
            if self.verbose {
                info!(
                    split = report.split,
                    held_out = report.held_out,
                    used = report.used,
                    skipped = report.skipped,
                    "split ranked"
                );
            }
            if report.skipped > 0 {
                warn!(split = report.split, skipped = report.skipped, "examples skipped");
            }
            for example in raw {
                instances.push((self.factory.make_aggregate(&example.candidates)?, example.label));
                costs.push(example.costs);
            }
            reports.push(report);
        }

        let data: TrainingData<AggregateFeatureVector> = TrainingData::new(instances)?;
        let mut classifier_config = self.config.classifier.clone();
        classifier_config.set_verbose(self.verbose);
        let classifier = classifier_config
            .build()?
            .train_multi_label_with_cost(&data, &costs)?;

        let initial = self.initial_trainer.train(corpus)?;
        let reranker = Reranker::new(
            initial,
            classifier,
            self.featurizer.clone(),
            self.factory.clone(),
            self.config.top_n,
            self.config.rescaling,
        )?;
        Ok((reranker, reports))
    }

    fn held_out_instances<Q, C, K>(
        &self,
        corpus: &[(Q, C)],
        split: usize,
        range: Range<usize>,
        cost: &K,
    ) -> Result<(Vec<RawInstance>, SplitReport)>
    where
        Q: Clone,
        C: Clone + PartialEq,
        T: InitialRankerTrainer<Q, C>,
        Fz: CandidateFeaturizer<Q, C>,
        K: Fn(&Q, &C, &C) -> f64 + ?Sized,
    {
        let mut report = SplitReport {
            split,
            held_out: range.len(),
            ..Default::default()
        };
        if range.is_empty() {
            return Ok((Vec::new(), report));
        }

        let others: Vec<(Q, C)> = corpus[..range.start]
            .iter()
            .chain(&corpus[range.end..])
            .cloned()
            .collect();
        let ranker = self.initial_trainer.train(&others)?;
        debug!(split, training = others.len(), "initial ranker trained");

        let top_n = self.config.top_n;
        let mut raw = Vec::new();
        for (query, correct) in &corpus[range] {
            let ranked = ranker.evaluate(query, Some(correct), true)?;
            let position = match ranked.iter().position(|(c, _)| c == correct) {
                Some(p) => p,
                None => {
                    report.skipped += 1;
                    continue;
                }
            };

            let mut top: Vec<(C, f64)> = ranked[..top_n.min(ranked.len())].to_vec();
            let label = if position < top.len() {
                position
            } else {
                // the correct candidate takes the last slot
                let last = top.len() - 1;
                top[last] = ranked[position].clone();
                last
            };
            let mut candidates = featurize(&self.featurizer, query, &top, self.config.rescaling);
            // short rankings get featureless candidates so every instance has depth top_n
            candidates.resize_with(top_n, Vec::new);
            raw.push(RawInstance {
                candidates,
                label,
                costs: candidate_costs(cost, query, &top, label, top_n),
            });
            report.used += 1;
        }
        Ok((raw, report))
    }
}
