use std::sync::Arc;

use super::dense::DenseFeatureVector;
use super::{FeatureMapper, FeatureVector};
use crate::vector::Vector;

/// Label-independent vector storing only non-zero `(index, value)` pairs.
///
/// Indices are kept sorted and unique so that lookups are logarithmic and
/// pairwise distances are a single merge walk.
#[derive(Debug, Clone)]
pub struct SparseFeatureVector {
    indices: Vec<usize>,
    values: Vec<f64>,
    mapper: Arc<FeatureMapper>,
}

impl SparseFeatureVector {
    /// Build from arbitrary `(index, value)` pairs.
    ///
    /// Pairs are sorted, repeated indices are summed, and zeros are dropped.
    pub fn new<I>(pairs: I, mapper: Arc<FeatureMapper>) -> Self
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        let mut pairs: Vec<(usize, f64)> = pairs.into_iter().collect();
        pairs.sort_by_key(|&(i, _)| i);

        let mut indices = Vec::with_capacity(pairs.len());
        let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
        for (index, value) in pairs {
            match indices.last() {
                Some(&last) if last == index => {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                }
                _ => {
                    indices.push(index);
                    values.push(value);
                }
            }
        }

        // summing repeated indices can cancel out
        let (indices, values): (Vec<usize>, Vec<f64>) = indices
            .into_iter()
            .zip(values)
            .filter(|&(_, v)| v != 0.0)
            .unzip();

        Self {
            indices,
            values,
            mapper,
        }
    }

    pub fn num_nonzeros(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Squared distance to another sparse vector, walking both index lists once
    pub(crate) fn squared_distance(&self, other: &SparseFeatureVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut total = 0.0;
        while i < self.indices.len() && j < other.indices.len() {
            let (a, b) = (self.indices[i], other.indices[j]);
            let d = if a == b {
                let d = self.values[i] - other.values[j];
                i += 1;
                j += 1;
                d
            } else if a < b {
                i += 1;
                self.values[i - 1]
            } else {
                j += 1;
                other.values[j - 1]
            };
            total += d * d;
        }
        total += self.values[i..].iter().map(|v| v * v).sum::<f64>();
        total += other.values[j..].iter().map(|v| v * v).sum::<f64>();
        total
    }

    /// Squared distance to a dense vector in O(dense length + non-zeros)
    pub(crate) fn squared_distance_dense(&self, dense: &DenseFeatureVector) -> f64 {
        let mut total = dense.squared_magnitude(0);
        for (index, value) in self.iter() {
            let d = dense.get(index);
            total += (d - value) * (d - value) - d * d;
        }
        total
    }
}

impl FeatureVector for SparseFeatureVector {
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
        let w = weights.as_slice();
        self.iter()
            .filter(|&(i, _)| i < w.len())
            .map(|(i, v)| v * w[i])
            .sum()
    }

    fn squared_magnitude(&self, _label: usize) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    fn diff_squared_magnitude(&self, _label1: usize, _label2: usize) -> f64 {
        0.0
    }

    fn update_weights(&self, weights: &mut Vector, scale: f64, _label: usize) {
        let w = weights.as_mut_slice();
        for (i, v) in self.iter() {
            if let Some(slot) = w.get_mut(i) {
                *slot += scale * v;
            }
        }
    }

    fn nonzeros(&self, _label: usize) -> Vec<(usize, f64)> {
        self.iter().collect()
    }
}
