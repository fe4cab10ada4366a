use std::sync::Arc;

use super::{
    AggregateFeatureVector, DenseFeatureVector, FeatureMapper, SimpleFeatureVector,
    SparseFeatureVector,
};
use crate::attribute::Attribute;
use crate::error::Result;

/// Storage representation for vectors built by a factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VectorKind {
    /// A value slot for every feature index
    Dense,
    /// Non-zero `(index, value)` pairs only
    #[default]
    Sparse,
}

/// Builds feature vectors that all share one [`FeatureMapper`].
#[derive(Debug, Clone)]
pub struct FeatureVectorFactory {
    mapper: Arc<FeatureMapper>,
    kind: VectorKind,
}

impl FeatureVectorFactory {
    /// Create a factory with a fresh mapper
    pub fn new(kind: VectorKind) -> Self {
        Self::with_mapper(Arc::new(FeatureMapper::new()), kind)
    }

    /// Create a factory that interns into an existing mapper
    pub fn with_mapper(mapper: Arc<FeatureMapper>, kind: VectorKind) -> Self {
        Self { mapper, kind }
    }

    pub fn mapper(&self) -> &Arc<FeatureMapper> {
        &self.mapper
    }

    pub fn kind(&self) -> VectorKind {
        self.kind
    }

    /// Build a label-independent vector, interning every attribute name.
    ///
    /// Values of repeated names are summed.
    pub fn make(&self, attrs: &[Attribute]) -> SimpleFeatureVector {
        let pairs: Vec<(usize, f64)> = attrs
            .iter()
            .map(|attr| (self.mapper.intern(&attr.name), attr.value))
            .collect();
        self.make_from_pairs(pairs)
    }

    /// Build a label-independent vector from already interned indices
    pub fn make_from_pairs<I>(&self, pairs: I) -> SimpleFeatureVector
    where
        I: IntoIterator<Item = (usize, f64)>,
    {
        match self.kind {
            VectorKind::Sparse => SparseFeatureVector::new(pairs, self.mapper.clone()).into(),
            VectorKind::Dense => {
                let pairs: Vec<(usize, f64)> = pairs.into_iter().collect();
                let len = pairs
                    .iter()
                    .map(|&(i, _)| i + 1)
                    .max()
                    .unwrap_or(0)
                    .max(self.mapper.len());
                let mut values = vec![0.0; len];
                for (index, value) in pairs {
                    values[index] += value;
                }
                DenseFeatureVector::new(values, self.mapper.clone()).into()
            }
        }
    }

    /// Build one aggregate vector holding a component per candidate
    pub fn make_aggregate<C>(&self, candidates: &[C]) -> Result<AggregateFeatureVector>
    where
        C: AsRef<[Attribute]>,
    {
        let components = candidates.iter().map(|c| self.make(c.as_ref())).collect();
        AggregateFeatureVector::new(components)
    }

    /// Build a label-independent vector from known features only.
    ///
    /// Names the mapper has not seen are dropped, so the mapper never grows.
    pub fn lookup(&self, attrs: &[Attribute]) -> SimpleFeatureVector {
        let pairs: Vec<(usize, f64)> = attrs
            .iter()
            .filter_map(|attr| self.mapper.index_of(&attr.name).map(|i| (i, attr.value)))
            .collect();
        self.make_from_pairs(pairs)
    }

    /// Aggregate counterpart of [`lookup`](Self::lookup)
    pub fn lookup_aggregate<C>(&self, candidates: &[C]) -> Result<AggregateFeatureVector>
    where
        C: AsRef<[Attribute]>,
    {
        let components = candidates.iter().map(|c| self.lookup(c.as_ref())).collect();
        AggregateFeatureVector::new(components)
    }
}

impl Default for FeatureVectorFactory {
    fn default() -> Self {
        Self::new(VectorKind::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureVector;
    use crate::vector::Vector;

    #[test]
    fn test_factory_shares_mapper() {
        let factory = FeatureVectorFactory::new(VectorKind::Sparse);
        let a = factory.make(&[Attribute::new("x", 1.0), Attribute::new("y", 2.0)]);
        let b = factory.make(&[Attribute::new("z", 3.0), Attribute::new("x", 1.0)]);

        assert!(Arc::ptr_eq(a.mapper(), b.mapper()));
        assert_eq!(a.length(), 3);
        assert_eq!(b.apply(0, 0), 1.0);
        assert_eq!(b.apply(2, 0), 3.0);
    }

    #[test]
    fn test_dense_and_sparse_agree() {
        let attrs = [
            Attribute::new("a", 1.5),
            Attribute::new("b", -2.0),
            Attribute::new("a", 0.5),
        ];
        let dense = FeatureVectorFactory::new(VectorKind::Dense).make(&attrs);
        let sparse = FeatureVectorFactory::new(VectorKind::Sparse).make(&attrs);
        assert!(!dense.is_sparse());
        assert!(sparse.is_sparse());

        let w = Vector::from_vec(vec![2.0, 1.0]);
        assert_eq!(dense.dot_product(&w, 0), sparse.dot_product(&w, 0));
        assert_eq!(dense.squared_magnitude(0), sparse.squared_magnitude(0));
        assert_eq!(dense.nonzeros(0), sparse.nonzeros(0));
    }

    #[test]
    fn test_make_aggregate() {
        let factory = FeatureVectorFactory::default();
        let agg = factory
            .make_aggregate(&[
                vec![Attribute::new("pop", 1.0)],
                vec![Attribute::new("pop", 3.0), Attribute::new("dist", 1.0)],
                vec![],
            ])
            .unwrap();
        assert_eq!(agg.depth(), 3);
        assert_eq!(agg.length(), 2);
        assert_eq!(agg.diff_squared_magnitude(0, 1), 5.0);
        assert_eq!(agg.squared_magnitude(2), 0.0);
    }

    #[test]
    fn test_lookup_ignores_unknown_names() {
        let factory = FeatureVectorFactory::new(VectorKind::Dense);
        factory.mapper().intern("pop");
        let fv = factory.lookup(&[Attribute::new("pop", 2.0), Attribute::new("elev", 5.0)]);
        assert_eq!(factory.mapper().len(), 1);
        assert_eq!(fv.length(), 1);
        assert_eq!(fv.apply(0, 0), 2.0);

        let agg = factory
            .lookup_aggregate(&[vec![Attribute::new("dist", 1.0)], vec![]])
            .unwrap();
        assert_eq!(agg.depth(), 2);
        assert_eq!(agg.squared_magnitude(0), 0.0);
        assert_eq!(factory.mapper().len(), 1);
    }
}
