//! Feature vectors: `(feature index, label) -> value` mappings.
//!
//! All vectors built by one [`FeatureVectorFactory`] share a
//! [`FeatureMapper`], and with it their length. Dense and sparse vectors are
//! label-independent (depth 1); an [`AggregateFeatureVector`] holds one
//! component vector per candidate label.

use std::fmt;
use std::sync::Arc;

use crate::vector::Vector;

mod aggregate;
mod dense;
mod factory;
mod mapper;
mod simple;
mod sparse;

pub use self::aggregate::AggregateFeatureVector;
pub use self::dense::DenseFeatureVector;
pub use self::factory::{FeatureVectorFactory, VectorKind};
pub use self::mapper::FeatureMapper;
pub use self::simple::SimpleFeatureVector;
pub use self::sparse::SparseFeatureVector;

/// Common contract of every feature vector.
pub trait FeatureVector: fmt::Debug + Send + Sync {
    /// The mapper shared by all vectors trained together
    fn mapper(&self) -> &Arc<FeatureMapper>;

    /// Number of distinct feature indices
    fn length(&self) -> usize {
        self.mapper().len()
    }

    /// Number of labels for which this vector carries distinguishable data
    fn depth(&self) -> usize;

    /// Largest label with its own view of the data
    fn max_label(&self) -> usize {
        self.depth().saturating_sub(1)
    }

    /// Value of feature `index` under `label`
    fn apply(&self, index: usize, label: usize) -> f64;

    /// `sum(value(i, label) * weights[i])`
    ///
    /// Indices beyond the end of `weights` (features interned after the
    /// weights were sized) contribute nothing.
    fn dot_product(&self, weights: &Vector, label: usize) -> f64;

    /// Squared Euclidean norm of the `label` view
    fn squared_magnitude(&self, label: usize) -> f64;

    /// Squared Euclidean distance between the `label1` and `label2` views
    fn diff_squared_magnitude(&self, label1: usize, label2: usize) -> f64;

    /// `weights[i] += scale * value(i, label)` for every `i`
    fn update_weights(&self, weights: &mut Vector, scale: f64, label: usize);

    /// Non-zero `(index, value)` pairs of the `label` view in ascending index order
    fn nonzeros(&self, label: usize) -> Vec<(usize, f64)>;
}

impl<F: FeatureVector + ?Sized> FeatureVector for Box<F> {
    fn mapper(&self) -> &Arc<FeatureMapper> {
        (**self).mapper()
    }

    fn length(&self) -> usize {
        (**self).length()
    }

    fn depth(&self) -> usize {
        (**self).depth()
    }

    fn max_label(&self) -> usize {
        (**self).max_label()
    }

    fn apply(&self, index: usize, label: usize) -> f64 {
        (**self).apply(index, label)
    }

    fn dot_product(&self, weights: &Vector, label: usize) -> f64 {
        (**self).dot_product(weights, label)
    }

    fn squared_magnitude(&self, label: usize) -> f64 {
        (**self).squared_magnitude(label)
    }

    fn diff_squared_magnitude(&self, label1: usize, label2: usize) -> f64 {
        (**self).diff_squared_magnitude(label1, label2)
    }

    fn update_weights(&self, weights: &mut Vector, scale: f64, label: usize) {
        (**self).update_weights(weights, scale, label)
    }

    fn nonzeros(&self, label: usize) -> Vec<(usize, f64)> {
        (**self).nonzeros(label)
    }
}
