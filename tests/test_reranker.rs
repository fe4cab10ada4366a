use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use linrank::feature::FeatureVectorFactory;
use linrank::rank::{
    evaluate_accuracy, InitialRankerTrainer, Ranker, RerankerConfig, RerankerTrainer, Rescaling,
};
use linrank::train::Method;
use linrank::{Attribute, ClassifierConfig, Result};

#[derive(Debug, Clone)]
struct Query {
    id: usize,
    target: i32,
    candidates: Vec<i32>,
}

/// Ranks a query's candidates by how often each was correct in training.
struct Popularity {
    counts: HashMap<i32, usize>,
    trained_on: HashSet<usize>,
    /// Whether each evaluated query was part of this ranker's training data
    seen: Arc<Mutex<Vec<bool>>>,
}

impl Ranker<Query, i32> for Popularity {
    fn evaluate(
        &self,
        query: &Query,
        _correct: Option<&i32>,
        _include_correct: bool,
    ) -> Result<Vec<(i32, f64)>> {
        self.seen.lock().push(self.trained_on.contains(&query.id));
        let mut ranked: Vec<(i32, f64)> = query
            .candidates
            .iter()
            .map(|c| (*c, *self.counts.get(c).unwrap_or(&0) as f64))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        Ok(ranked)
    }
}

#[derive(Default)]
struct PopularityTrainer {
    seen: Arc<Mutex<Vec<bool>>>,
    /// Size of every corpus a ranker was trained on
    trainings: Arc<Mutex<Vec<usize>>>,
}

impl InitialRankerTrainer<Query, i32> for PopularityTrainer {
    type Ranker = Popularity;

    fn train(&self, corpus: &[(Query, i32)]) -> Result<Popularity> {
        self.trainings.lock().push(corpus.len());
        let mut counts = HashMap::new();
        for (_, correct) in corpus {
            *counts.entry(*correct).or_insert(0) += 1;
        }
        Ok(Popularity {
            counts,
            trained_on: corpus.iter().map(|(q, _)| q.id).collect(),
            seen: self.seen.clone(),
        })
    }
}

fn distance_features(query: &Query, candidate: &i32, _score: f64, _rank: usize) -> Vec<Attribute> {
    vec![Attribute::new(
        "distance",
        (candidate - query.target).abs() as f64,
    )]
}

/// Twenty queries over ten candidates, one with only two candidates and
/// one whose correct candidate is not offered at all
fn corpus() -> Vec<(Query, i32)> {
    let mut corpus: Vec<(Query, i32)> = (0..20)
        .map(|id| {
            let target = (id as i32 * 7) % 10;
            let query = Query {
                id,
                target,
                candidates: (0..10).collect(),
            };
            (query, target)
        })
        .collect();
    for (id, target) in [(20, 1), (21, 5)] {
        let query = Query {
            id,
            target,
            candidates: vec![0, 1],
        };
        corpus.push((query, target));
    }
    corpus
}

#[test]
fn test_held_out_rankings_never_see_their_examples() {
    let corpus = corpus();
    let initial = PopularityTrainer::default();
    let seen = initial.seen.clone();
    let config = RerankerConfig::default()
        .with_top_n(10)
        .unwrap()
        .with_number_of_splits(5)
        .unwrap();
    let trainer = RerankerTrainer::new(
        initial,
        distance_features,
        FeatureVectorFactory::default(),
        config,
    );

    let (_, reports) = trainer.train(&corpus).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), corpus.len());
    assert!(seen.iter().all(|in_training| !in_training));
    assert_eq!(reports.len(), 5);
}

#[test]
fn test_split_reports_and_final_ranker() {
    let corpus = corpus();
    let config = RerankerConfig::default()
        .with_top_n(10)
        .unwrap()
        .with_number_of_splits(5)
        .unwrap();
    let initial = PopularityTrainer::default();
    let trainings = initial.trainings.clone();
    let mut trainer = RerankerTrainer::new(
        initial,
        distance_features,
        FeatureVectorFactory::default(),
        config,
    );
    trainer.verbose(true);

    let (reranker, reports) = trainer.train(&corpus).unwrap();

    let held_out: Vec<usize> = reports.iter().map(|r| r.held_out).collect();
    assert_eq!(held_out, vec![4, 4, 5, 4, 5]);
    // the short query is padded and kept; the one missing its correct
    // candidate is skipped, both in the last split
    assert_eq!(reports.iter().map(|r| r.used).sum::<usize>(), 21);
    assert_eq!(reports[4].used, 4);
    assert_eq!(reports[4].skipped, 1);
    assert_eq!(reports.iter().map(|r| r.skipped).sum::<usize>(), 1);

    // one ranker per split and one on the whole corpus
    let mut trainings = trainings.lock().clone();
    trainings.sort_unstable();
    assert_eq!(trainings, vec![17, 17, 18, 18, 18, 22]);

    assert_eq!(reranker.top_n(), 10);
    assert!(reranker.classifier().weights().apply(0)[0] < 0.0);
}

#[test]
fn test_reranker_beats_initial_ranker() {
    let corpus = corpus();
    let full: Vec<(Query, i32)> = corpus[..20].to_vec();
    let config = RerankerConfig::default().with_top_n(10).unwrap();
    let trainer = RerankerTrainer::new(
        PopularityTrainer::default(),
        distance_features,
        FeatureVectorFactory::default(),
        config,
    );
    let (reranker, _) = trainer.train(&corpus).unwrap();

    let reranked = evaluate_accuracy(&reranker, &full).unwrap();
    assert_eq!(reranked.correct, 20);
    assert_eq!(reranked.mean_reciprocal_rank, 1.0);

    let initial = evaluate_accuracy(reranker.initial_ranker(), &full).unwrap();
    assert!(initial.accuracy() < reranked.accuracy());
}

#[test]
fn test_short_top_n_keeps_order_invariant() {
    let corpus = corpus();
    let config = RerankerConfig::default()
        .with_top_n(3)
        .unwrap()
        .with_number_of_splits(4)
        .unwrap()
        .with_rescaling(Rescaling::Standardize);
    let featurizer = |query: &Query, candidate: &i32, score: f64, rank: usize| {
        vec![
            Attribute::new("distance", (candidate - query.target).abs() as f64),
            Attribute::new("initial", score),
            Attribute::new("rank", rank as f64),
        ]
    };
    let trainer = RerankerTrainer::new(
        PopularityTrainer::default(),
        featurizer,
        FeatureVectorFactory::default(),
        config,
    );
    let (reranker, reports) = trainer.train(&corpus).unwrap();
    // correct candidates ranked below the top 3 take the last slot instead
    // of being dropped
    assert_eq!(reports.iter().map(|r| r.used).sum::<usize>(), 21);
    assert_eq!(reports.iter().map(|r| r.skipped).sum::<usize>(), 1);

    for (query, _) in &corpus {
        let ranked = reranker.evaluate(query, None, false).unwrap();
        assert_eq!(ranked.len(), query.candidates.len());
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }
}

#[test]
fn test_cost_hook_prices_real_candidates() {
    let corpus = corpus();
    let mut classifier = ClassifierConfig::new(Method::CostSensitive);
    classifier.set("variant", "0").unwrap();
    let config = RerankerConfig::default()
        .with_top_n(10)
        .unwrap()
        .with_classifier(classifier);
    let trainer = RerankerTrainer::new(
        PopularityTrainer::default(),
        distance_features,
        FeatureVectorFactory::default(),
        config,
    );

    let (uniform, _) = trainer.train(&corpus).unwrap();

    let calls = Mutex::new(Vec::new());
    let cost = |query: &Query, correct: &i32, predicted: &i32| {
        calls.lock().push(*correct == query.target);
        let d = (correct - predicted).abs() as f64;
        9.0 * d * d
    };
    let (priced, reports) = trainer.train_with_cost(&corpus, &cost).unwrap();
    assert_eq!(reports.iter().map(|r| r.used).sum::<usize>(), 21);

    let calls = calls.into_inner();
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|is_target| *is_target));

    // the first mistake is fixed with margin 1 under uniform costs and with
    // margin 3 * distance under the priced ones
    let uniform = uniform.classifier().weights().apply(0)[0];
    let priced = priced.classifier().weights().apply(0)[0];
    assert!(uniform < 0.0 && uniform >= -1.0 - 1e-9);
    assert!((priced + 3.0).abs() < 1e-9);
}
