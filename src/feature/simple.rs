use std::sync::Arc;

use super::{DenseFeatureVector, FeatureMapper, FeatureVector, SparseFeatureVector};
use crate::vector::Vector;

/// A label-independent vector in either representation.
///
/// Both variants are numerically interchangeable; the choice only affects
/// memory use and the cost of each operation.
#[derive(Debug, Clone)]
pub enum SimpleFeatureVector {
    Dense(DenseFeatureVector),
    Sparse(SparseFeatureVector),
}

impl SimpleFeatureVector {
    /// Squared Euclidean distance between two vectors
    pub fn squared_distance(&self, other: &SimpleFeatureVector) -> f64 {
        use SimpleFeatureVector::*;

        match (self, other) {
            (Sparse(a), Sparse(b)) => a.squared_distance(b),
            (Dense(a), Dense(b)) => a.squared_distance(b),
            (Sparse(s), Dense(d)) | (Dense(d), Sparse(s)) => s.squared_distance_dense(d),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, SimpleFeatureVector::Sparse(_))
    }
}

impl From<DenseFeatureVector> for SimpleFeatureVector {
    fn from(v: DenseFeatureVector) -> Self {
        SimpleFeatureVector::Dense(v)
    }
}

impl From<SparseFeatureVector> for SimpleFeatureVector {
    fn from(v: SparseFeatureVector) -> Self {
        SimpleFeatureVector::Sparse(v)
    }
}

macro_rules! delegate {
    ($self:ident, $v:ident => $e:expr) => {
        match $self {
            SimpleFeatureVector::Dense($v) => $e,
            SimpleFeatureVector::Sparse($v) => $e,
        }
    };
}

impl FeatureVector for SimpleFeatureVector {
    fn mapper(&self) -> &Arc<FeatureMapper> {
        delegate!(self, v => v.mapper())
    }

    fn depth(&self) -> usize {
        1
    }

    fn apply(&self, index: usize, label: usize) -> f64 {
        delegate!(self, v => v.apply(index, label))
    }

    fn dot_product(&self, weights: &Vector, label: usize) -> f64 {
        delegate!(self, v => v.dot_product(weights, label))
    }

    fn squared_magnitude(&self, label: usize) -> f64 {
        delegate!(self, v => v.squared_magnitude(label))
    }

    fn diff_squared_magnitude(&self, _label1: usize, _label2: usize) -> f64 {
        0.0
    }

    fn update_weights(&self, weights: &mut Vector, scale: f64, label: usize) {
        delegate!(self, v => v.update_weights(weights, scale, label))
    }

    fn nonzeros(&self, label: usize) -> Vec<(usize, f64)> {
        delegate!(self, v => v.nonzeros(label))
    }
}
