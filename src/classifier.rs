//! Immutable linear classifiers produced by training.

use std::cmp::Ordering;

use crate::feature::FeatureVector;
use crate::vector::Vector;
use crate::weights::WeightAggregate;

/// How a classifier maps feature vectors to labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    /// Labels `{0, 1}` decided by the sign of a single dot product
    Binary,
    /// One score per label; the highest wins
    MultiLabel,
}

/// A weight aggregate paired with a scoring rule.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearClassifier {
    weights: WeightAggregate,
    kind: ClassifierKind,
}

/// Score every label of `fv` against `weights`.
pub(crate) fn label_scores<F>(weights: &WeightAggregate, fv: &F, num_labels: usize) -> Vec<f64>
where
    F: FeatureVector + ?Sized,
{
    (0..num_labels)
        .map(|label| fv.dot_product(weights.apply(label), label))
        .collect()
}

/// Index of the largest score; ties go to the lowest label
pub(crate) fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (label, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = label;
        }
    }
    best
}

impl LinearClassifier {
    /// Binary classifier over a single weight vector
    pub fn binary(weights: Vector) -> Self {
        Self {
            weights: WeightAggregate::Single(weights),
            kind: ClassifierKind::Binary,
        }
    }

    /// Multi-label classifier over a shared or per-label weight aggregate
    pub fn multi_label(weights: WeightAggregate) -> Self {
        Self {
            weights,
            kind: ClassifierKind::MultiLabel,
        }
    }

    pub(crate) fn from_parts(weights: WeightAggregate, kind: ClassifierKind) -> Self {
        Self { weights, kind }
    }

    pub fn weights(&self) -> &WeightAggregate {
        &self.weights
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    /// Number of labels this classifier distinguishes for `fv`.
    ///
    /// Per-label weights fix the label count; a shared vector scores as many
    /// labels as `fv` has depth.
    pub fn num_labels<F: FeatureVector + ?Sized>(&self, fv: &F) -> usize {
        match (&self.kind, &self.weights) {
            (ClassifierKind::Binary, _) => 2,
            (ClassifierKind::MultiLabel, WeightAggregate::Multi(vs)) => vs.len(),
            (ClassifierKind::MultiLabel, WeightAggregate::Single(_)) => fv.depth(),
        }
    }

    /// Raw dot-product score of `label`
    pub fn score<F: FeatureVector + ?Sized>(&self, fv: &F, label: usize) -> f64 {
        match self.kind {
            ClassifierKind::Binary => {
                let s = self.binary_score(fv);
                if label == 1 {
                    s
                } else {
                    -s
                }
            }
            ClassifierKind::MultiLabel => fv.dot_product(self.weights.apply(label), label),
        }
    }

    /// Signed score of a binary classifier; positive means label 1
    pub fn binary_score<F: FeatureVector + ?Sized>(&self, fv: &F) -> f64 {
        fv.dot_product(self.weights.apply(0), 0)
    }

    /// Scores of every label.
    ///
    /// A binary classifier with score `s` reports `[-s, s]`.
    pub fn scores<F: FeatureVector + ?Sized>(&self, fv: &F) -> Vec<f64> {
        match self.kind {
            ClassifierKind::Binary => {
                let s = self.binary_score(fv);
                vec![-s, s]
            }
            ClassifierKind::MultiLabel => {
                label_scores(&self.weights, fv, self.num_labels(fv))
            }
        }
    }

    /// Best-scoring label
    pub fn classify<F: FeatureVector + ?Sized>(&self, fv: &F) -> usize {
        argmax(&self.scores(fv))
    }

    /// All labels paired with their scores, best first
    pub fn sorted_labels<F: FeatureVector + ?Sized>(&self, fv: &F) -> Vec<(usize, f64)> {
        let mut labels: Vec<(usize, f64)> = self.scores(fv).into_iter().enumerate().collect();
        labels.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        labels
    }
}
