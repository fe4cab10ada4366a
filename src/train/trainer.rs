use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info};

use crate::classifier::{label_scores, ClassifierKind, LinearClassifier};
use crate::dataset::TrainingData;
use crate::error::{Error, Result};
use crate::feature::FeatureVector;
use crate::weights::WeightAggregate;

mod conditional_logit;
mod cost_sensitive;
mod passive_aggressive;
mod perceptron;

pub use self::conditional_logit::{
    ConditionalLogitParams, ConditionalLogitTrainer, LongRow, LongTable,
};
pub use self::cost_sensitive::{
    CostFunction, CostSelection, CostSensitiveParams, CostTable,
};
pub use self::passive_aggressive::{PaType, PassiveAggressiveParams};
pub use self::perceptron::PerceptronParams;

/// Training algorithm marker for the basic (optionally averaged) perceptron.
#[derive(Debug, Clone, Copy)]
pub struct Perceptron;

/// Training algorithm marker for Passive Aggressive.
#[derive(Debug, Clone, Copy)]
pub struct PassiveAggressive;

/// Training algorithm marker for cost-sensitive Passive Aggressive.
#[derive(Debug, Clone, Copy)]
pub struct CostSensitive;

/// Quantities an update rule sizes its step from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossInputs {
    /// Score of the correct label minus score of the competing label
    /// (for binary training, `y * score` with `y` in `{-1, +1}`)
    pub margin: f64,
    /// Margin the update tries to reach: 1, or `sqrt(cost)` when
    /// cost-sensitive
    pub required_margin: f64,
    /// Squared magnitude of the feature difference the update moves along
    pub sqmag: f64,
    /// Whether this is a binary (single signed update) step
    pub binary: bool,
}

impl LossInputs {
    /// Hinge loss `max(0, required_margin - margin)`
    pub fn loss(&self) -> f64 {
        (self.required_margin - self.margin).max(0.0)
    }
}

/// Training algorithm interface.
///
/// Every online algorithm shares one iteration loop and differs only in the
/// scale factor it computes for an instance.
pub trait TrainingAlgorithm {
    type Params: Default + Clone + fmt::Debug;

    /// Human-readable name used in log output
    const NAME: &'static str;

    /// Non-negative step size for one instance
    fn scale_factor(params: &Self::Params, inputs: &LossInputs) -> f64;
}

/// One weight change: `+scale` along `promote`'s features and, for
/// multi-label steps, `-scale` along `demote`'s.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Update {
    pub promote: usize,
    pub demote: Option<usize>,
    pub scale: f64,
}

/// Online linear-classifier trainer
#[derive(Debug, Clone)]
pub struct Trainer<A: TrainingAlgorithm> {
    /// Maximum number of passes over the training data
    max_iterations: usize,
    /// Stop once the summed absolute scale of a pass falls below this
    error_threshold: f64,
    /// Return the per-iteration average of the weights
    averaged: bool,
    /// Log per-iteration progress at info level
    verbose: bool,
    /// Algorithm parameters
    params: A::Params,
}

impl<A: TrainingAlgorithm> Trainer<A> {
    /// Create a new trainer with default parameters
    pub fn new() -> Self {
        Self {
            max_iterations: 100,
            error_threshold: 1e-10,
            averaged: false,
            verbose: false,
            params: A::Params::default(),
        }
    }

    /// Enable or disable verbose output
    pub fn verbose(&mut self, enabled: bool) -> &mut Self {
        self.verbose = enabled;
        self
    }

    /// Get training parameters
    pub fn params(&self) -> &A::Params {
        &self.params
    }

    /// Get training parameters for mutation
    pub fn params_mut(&mut self) -> &mut A::Params {
        &mut self.params
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::invalid("max_iterations must be at least 1"));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn error_threshold(&self) -> f64 {
        self.error_threshold
    }

    pub fn set_error_threshold(&mut self, error_threshold: f64) -> Result<()> {
        if error_threshold.is_nan() || error_threshold < 0.0 {
            return Err(Error::invalid("error_threshold must be non-negative"));
        }
        self.error_threshold = error_threshold;
        Ok(())
    }

    pub fn averaged(&self) -> bool {
        self.averaged
    }

    pub fn set_averaged(&mut self, averaged: bool) {
        self.averaged = averaged;
    }

    /// Set maximum iterations (builder pattern)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Result<Self> {
        self.set_max_iterations(max_iterations)?;
        Ok(self)
    }

    /// Set error threshold (builder pattern)
    pub fn with_error_threshold(mut self, error_threshold: f64) -> Result<Self> {
        self.set_error_threshold(error_threshold)?;
        Ok(self)
    }

    /// Set weight averaging (builder pattern)
    pub fn with_averaging(mut self, averaged: bool) -> Self {
        self.averaged = averaged;
        self
    }

    /// Train a binary classifier; labels must be 0 or 1.
    pub fn train_binary<F: FeatureVector>(
        &self,
        data: &TrainingData<F>,
    ) -> Result<LinearClassifier> {
        check_labels(data, 2)?;
        let weights = WeightAggregate::single(data.length());
        let weights = self.run(data, weights, |_, fv, label, weights| {
            Ok(Some(self.binary_step(fv, label, weights)))
        })?;
        Ok(LinearClassifier::from_parts(weights, ClassifierKind::Binary))
    }

    /// Train a multi-label classifier with one weight vector shared by all
    /// labels; each instance is an aggregate whose component `label` holds
    /// the features of candidate `label`.
    pub fn train_multi_label<F: FeatureVector>(
        &self,
        data: &TrainingData<F>,
    ) -> Result<LinearClassifier> {
        check_depth(data)?;
        let weights = WeightAggregate::single(data.length());
        let weights = self.run(data, weights, |_, fv, label, weights| {
            Ok(self.multi_label_step(fv, &[label], weights))
        })?;
        Ok(LinearClassifier::multi_label(weights))
    }

    /// Train a multi-label classifier with one weight vector per label over
    /// label-independent feature vectors.
    pub fn train_multi_weight<F: FeatureVector>(
        &self,
        data: &TrainingData<F>,
        num_labels: usize,
    ) -> Result<LinearClassifier> {
        check_multi_weight(data, num_labels)?;
        let weights = WeightAggregate::multi(num_labels, data.length());
        let weights = self.run(data, weights, |_, fv, label, weights| {
            Ok(self.multi_label_step(fv, &[label], weights))
        })?;
        Ok(LinearClassifier::multi_label(weights))
    }

    fn binary_step<F: FeatureVector>(
        &self,
        fv: &F,
        label: usize,
        weights: &WeightAggregate,
    ) -> Update {
        let y = if label == 1 { 1.0 } else { -1.0 };
        let score = fv.dot_product(weights.apply(0), 0);
        let inputs = LossInputs {
            margin: y * score,
            required_margin: 1.0,
            sqmag: fv.squared_magnitude(0),
            binary: true,
        };
        Update {
            promote: 0,
            demote: None,
            scale: y * A::scale_factor(&self.params, &inputs),
        }
    }

    fn multi_label_step<F: FeatureVector>(
        &self,
        fv: &F,
        correct: &[usize],
        weights: &WeightAggregate,
    ) -> Option<Update> {
        let scores = label_scores(weights, fv, num_labels_of(weights, fv));
        let (correct, competing) = margin_labels(&scores, correct)?;
        let inputs = LossInputs {
            margin: scores[correct] - scores[competing],
            required_margin: 1.0,
            sqmag: update_sqmag(weights, fv, correct, competing),
            binary: false,
        };
        Some(Update {
            promote: correct,
            demote: Some(competing),
            scale: A::scale_factor(&self.params, &inputs),
        })
    }

    /// The iteration loop shared by every online algorithm.
    ///
    /// `step` sees each instance in order together with the current weights
    /// and returns the update to apply, if any.
    pub(crate) fn run<F, S>(
        &self,
        data: &TrainingData<F>,
        mut weights: WeightAggregate,
        mut step: S,
    ) -> Result<WeightAggregate>
    where
        F: FeatureVector,
        S: FnMut(usize, &F, usize, &WeightAggregate) -> Result<Option<Update>>,
    {
        if data.is_empty() {
            return Err(Error::EmptyTrainingData);
        }

        let mut summed = if self.averaged {
            Some(weights.zeros_like())
        } else {
            None
        };
        let mut iterations = 0usize;

        if self.verbose {
            info!(
                algorithm = A::NAME,
                instances = data.len(),
                features = data.length(),
                averaged = self.averaged,
                "training started"
            );
        }

        for iteration in 0..self.max_iterations {
            let mut total_scale = 0.0;
            let mut mistakes = 0usize;

            for (index, (fv, label)) in data.iter().enumerate() {
                let update = match step(index, fv, *label, &weights)? {
                    Some(update) if update.scale != 0.0 => update,
                    _ => continue,
                };
                fv.update_weights(weights.apply_mut(update.promote), update.scale, update.promote);
                if let Some(demote) = update.demote {
                    fv.update_weights(weights.apply_mut(demote), -update.scale, demote);
                }
                total_scale += update.scale.abs();
                mistakes += 1;
            }

            iterations += 1;
            if let Some(summed) = summed.as_mut() {
                summed.add_assign(&weights);
            }

            if self.verbose {
                info!(
                    iteration = iteration + 1,
                    total_scale,
                    mistakes,
                    norm = weights.norm(),
                    "iteration finished"
                );
            } else {
                debug!(iteration = iteration + 1, total_scale, mistakes, "iteration finished");
            }

            if total_scale < self.error_threshold {
                if self.verbose {
                    info!(iteration = iteration + 1, "converged");
                }
                break;
            }
        }

        Ok(match summed {
            Some(mut summed) => {
                summed.scale(1.0 / iterations as f64);
                summed
            }
            None => weights,
        })
    }
}

impl<A: TrainingAlgorithm> Default for Trainer<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Labels scored for `fv`: one per weight vector, or one per candidate
pub(crate) fn num_labels_of<F: FeatureVector>(weights: &WeightAggregate, fv: &F) -> usize {
    match weights {
        WeightAggregate::Single(_) => fv.depth(),
        WeightAggregate::Multi(vs) => vs.len(),
    }
}

/// Squared magnitude of the change an update between `correct` and
/// `competing` makes.
///
/// With a shared vector both updates land on the same weights, so the step
/// moves along the difference of the two candidates' features; with
/// per-label vectors each side moves independently.
pub(crate) fn update_sqmag<F: FeatureVector>(
    weights: &WeightAggregate,
    fv: &F,
    correct: usize,
    competing: usize,
) -> f64 {
    match weights {
        WeightAggregate::Single(_) => fv.diff_squared_magnitude(correct, competing),
        WeightAggregate::Multi(_) => fv.squared_magnitude(correct) + fv.squared_magnitude(competing),
    }
}

/// The lowest-scoring correct label and the highest-scoring incorrect one.
///
/// Returns `None` when every label is correct.
pub(crate) fn margin_labels(scores: &[f64], correct: &[usize]) -> Option<(usize, usize)> {
    let min_correct = correct.iter().copied().min_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let max_incorrect = (0..scores.len())
        .filter(|label| !correct.contains(label))
        .max_by(|&a, &b| {
            scores[a]
                .partial_cmp(&scores[b])
                .unwrap_or(std::cmp::Ordering::Equal)
                // prefer the lower label on ties
                .then(b.cmp(&a))
        })?;
    Some((min_correct, max_incorrect))
}

pub(crate) fn check_labels<F: FeatureVector>(data: &TrainingData<F>, num_labels: usize) -> Result<()> {
    if data.is_empty() {
        return Err(Error::EmptyTrainingData);
    }
    for (_, label) in data.iter() {
        if *label >= num_labels {
            return Err(Error::LabelOutOfRange {
                label: *label,
                num_labels,
            });
        }
    }
    let distinct: BTreeSet<usize> = data.distinct_labels();
    if distinct.len() < 2 {
        return Err(Error::TooFewLabels {
            found: distinct.len(),
        });
    }
    Ok(())
}

/// Per-label weights score each component of an aggregate against its own
/// label, so a multi-candidate vector needs exactly one component per label.
pub(crate) fn check_multi_weight<F: FeatureVector>(
    data: &TrainingData<F>,
    num_labels: usize,
) -> Result<()> {
    check_labels(data, num_labels)?;
    let depth = data.depth();
    if depth > 1 && depth != num_labels {
        return Err(Error::DepthMismatch {
            expected: num_labels,
            actual: depth,
        });
    }
    Ok(())
}

pub(crate) fn check_depth<F: FeatureVector>(data: &TrainingData<F>) -> Result<()> {
    if data.is_empty() {
        return Err(Error::EmptyTrainingData);
    }
    if data.depth() < 2 {
        return Err(Error::TooFewLabels {
            found: data.depth(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_labels() {
        let scores = [0.5, 2.0, 1.0, 2.0];
        assert_eq!(margin_labels(&scores, &[0]), Some((0, 1)));
        assert_eq!(margin_labels(&scores, &[1]), Some((1, 3)));
        // lowest-scoring of several correct labels
        assert_eq!(margin_labels(&scores, &[1, 2]), Some((2, 3)));
        assert_eq!(margin_labels(&[1.0], &[0]), None);
    }

    #[test]
    fn test_loss_inputs() {
        let inputs = LossInputs {
            margin: 0.25,
            required_margin: 1.0,
            sqmag: 2.0,
            binary: false,
        };
        assert_eq!(inputs.loss(), 0.75);
        let satisfied = LossInputs {
            margin: 3.0,
            ..inputs
        };
        assert_eq!(satisfied.loss(), 0.0);
    }

    #[test]
    fn test_trainer_params() {
        let mut trainer: Trainer<Perceptron> = Trainer::new();
        assert!(trainer.set_max_iterations(0).is_err());
        assert!(trainer.set_error_threshold(-1.0).is_err());
        assert!(trainer.set_error_threshold(f64::NAN).is_err());
        assert!(trainer.set_max_iterations(5).is_ok());
        assert_eq!(trainer.max_iterations(), 5);
    }
}
