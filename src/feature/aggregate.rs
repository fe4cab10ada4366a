use std::sync::Arc;

use super::{FeatureMapper, FeatureVector, SimpleFeatureVector};
use crate::error::{Error, Result};
use crate::vector::Vector;

/// One query with several candidates: component `label` is the feature
/// vector of candidate `label`.
///
/// Every per-label operation delegates to the matching component, so a
/// single shared weight vector scores each candidate separately.
#[derive(Debug, Clone)]
pub struct AggregateFeatureVector {
    components: Vec<SimpleFeatureVector>,
}

impl AggregateFeatureVector {
    /// Build from per-candidate vectors.
    ///
    /// Fails if `components` is empty or the components were built against
    /// different mappers.
    pub fn new(components: Vec<SimpleFeatureVector>) -> Result<Self> {
        let first = components.first().ok_or_else(|| {
            Error::invalid("aggregate feature vector requires at least one candidate")
        })?;
        for (index, component) in components.iter().enumerate().skip(1) {
            if !Arc::ptr_eq(component.mapper(), first.mapper()) {
                return Err(Error::MapperMismatch { index });
            }
        }
        Ok(Self { components })
    }

    pub fn components(&self) -> &[SimpleFeatureVector] {
        &self.components
    }

    pub fn component(&self, label: usize) -> &SimpleFeatureVector {
        &self.components[label]
    }

    /// Consume the aggregate, returning its components
    pub fn into_components(self) -> Vec<SimpleFeatureVector> {
        self.components
    }
}

impl FeatureVector for AggregateFeatureVector {
    fn mapper(&self) -> &Arc<FeatureMapper> {
        self.components[0].mapper()
    }

    fn depth(&self) -> usize {
        self.components.len()
    }

    fn apply(&self, index: usize, label: usize) -> f64 {
        self.components[label].apply(index, 0)
    }

    fn dot_product(&self, weights: &Vector, label: usize) -> f64 {
        self.components[label].dot_product(weights, 0)
    }

    fn squared_magnitude(&self, label: usize) -> f64 {
        self.components[label].squared_magnitude(0)
    }

    fn diff_squared_magnitude(&self, label1: usize, label2: usize) -> f64 {
        if label1 == label2 {
            return 0.0;
        }
        self.components[label1].squared_distance(&self.components[label2])
    }

    fn update_weights(&self, weights: &mut Vector, scale: f64, label: usize) {
        self.components[label].update_weights(weights, scale, 0)
    }

    fn nonzeros(&self, label: usize) -> Vec<(usize, f64)> {
        self.components[label].nonzeros(0)
    }
}
