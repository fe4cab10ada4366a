use std::sync::Arc;

use super::{FeatureMapper, FeatureVector};
use crate::vector::Vector;

/// Label-independent vector storing a value for every feature index.
///
/// Indices at or beyond the stored values (features interned after this
/// vector was built) read as zero.
#[derive(Debug, Clone)]
pub struct DenseFeatureVector {
    values: Vec<f64>,
    mapper: Arc<FeatureMapper>,
}

impl DenseFeatureVector {
    pub fn new(values: Vec<f64>, mapper: Arc<FeatureMapper>) -> Self {
        Self { values, mapper }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    pub(crate) fn squared_distance(&self, other: &DenseFeatureVector) -> f64 {
        let len = self.values.len().max(other.values.len());
        (0..len)
            .map(|i| {
                let d = self.get(i) - other.get(i);
                d * d
            })
            .sum()
    }
}

impl FeatureVector for DenseFeatureVector {
    fn mapper(&self) -> &Arc<FeatureMapper> {
        &self.mapper
    }

    fn depth(&self) -> usize {
        1
    }

    fn apply(&self, index: usize, _label: usize) -> f64 {
        self.get(index)
    }

    fn dot_product(&self, weights: &Vector, _label: usize) -> f64 {
        self.values
            .iter()
            .zip(weights.iter())
            .map(|(v, w)| v * w)
            .sum()
    }

    fn squared_magnitude(&self, _label: usize) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    fn diff_squared_magnitude(&self, _label1: usize, _label2: usize) -> f64 {
        0.0
    }

    fn update_weights(&self, weights: &mut Vector, scale: f64, _label: usize) {
        for (w, v) in weights.as_mut_slice().iter_mut().zip(&self.values) {
            *w += scale * v;
        }
    }

    fn nonzeros(&self, _label: usize) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v != 0.0)
            .map(|(i, &v)| (i, v))
            .collect()
    }
}
