use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::feature::{FeatureMapper, FeatureVector};

/// Ordered `(feature vector, correct label)` pairs that are trained together.
///
/// Construction checks that every instance shares length, depth and mapper
/// with the first one, and that labels of multi-candidate vectors lie in
/// `[0, depth)`.
#[derive(Debug, Clone)]
pub struct TrainingData<F> {
    instances: Vec<(F, usize)>,
    /// Feature indices that never vary across the candidates of any instance
    removed: BTreeSet<usize>,
}

impl<F: FeatureVector> TrainingData<F> {
    pub fn new(instances: Vec<(F, usize)>) -> Result<Self> {
        if let Some((first, _)) = instances.first() {
            let length = first.length();
            let depth = first.depth();
            let mapper = first.mapper();
            for (index, (fv, label)) in instances.iter().enumerate() {
                if !Arc::ptr_eq(fv.mapper(), mapper) {
                    return Err(Error::MapperMismatch { index });
                }
                if fv.length() != length {
                    return Err(Error::LengthMismatch {
                        expected: length,
                        actual: fv.length(),
                    });
                }
                if fv.depth() != depth {
                    return Err(Error::DepthMismatch {
                        expected: depth,
                        actual: fv.depth(),
                    });
                }
                // label-independent vectors are bounded by the trainer instead
                if depth > 1 && *label >= depth {
                    return Err(Error::LabelOutOfRange {
                        label: *label,
                        num_labels: depth,
                    });
                }
            }
        }
        Ok(Self {
            instances,
            removed: BTreeSet::new(),
        })
    }

    /// Record features that exporters and the conditional-logit solver skip
    pub fn with_removed_features(mut self, removed: BTreeSet<usize>) -> Self {
        self.removed = removed;
        self
    }

    /// Mark every feature that has the same value for all candidates of
    /// every instance, returning how many were marked.
    ///
    /// Such features add the same amount to every candidate's score and
    /// make the conditional-logit design matrix singular.
    pub fn remove_non_discriminative(&mut self) -> usize {
        let length = self.length();
        let mut discriminative = HashSet::new();

        for (fv, _) in &self.instances {
            let depth = fv.depth();
            if depth < 2 {
                continue;
            }
            // index -> (first value seen, number of candidates with a value, varies)
            let mut seen: HashMap<usize, (f64, usize, bool)> = HashMap::new();
            for label in 0..depth {
                for (index, value) in fv.nonzeros(label) {
                    let entry = seen.entry(index).or_insert((value, 0, false));
                    if entry.0 != value {
                        entry.2 = true;
                    }
                    entry.1 += 1;
                }
            }
            for (index, (_, count, varies)) in seen {
                if varies || count < depth {
                    discriminative.insert(index);
                }
            }
        }

        self.removed = (0..length).filter(|i| !discriminative.contains(i)).collect();
        self.removed.len()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn instances(&self) -> &[(F, usize)] {
        &self.instances
    }

    pub fn iter(&self) -> impl Iterator<Item = &(F, usize)> + '_ {
        self.instances.iter()
    }

    pub fn removed_features(&self) -> &BTreeSet<usize> {
        &self.removed
    }

    /// Shared length of every instance, 0 when empty
    pub fn length(&self) -> usize {
        self.instances.first().map_or(0, |(fv, _)| fv.length())
    }

    /// Shared depth of every instance, 0 when empty
    pub fn depth(&self) -> usize {
        self.instances.first().map_or(0, |(fv, _)| fv.depth())
    }

    pub fn mapper(&self) -> Option<&Arc<FeatureMapper>> {
        self.instances.first().map(|(fv, _)| fv.mapper())
    }

    /// Distinct correct labels in ascending order
    pub fn distinct_labels(&self) -> BTreeSet<usize> {
        self.instances.iter().map(|(_, label)| *label).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureVectorFactory, VectorKind};
    use crate::Attribute;

    #[test]
    fn test_rejects_label_out_of_range() {
        let factory = FeatureVectorFactory::default();
        let fv = factory
            .make_aggregate(&[vec![Attribute::from("a")], vec![Attribute::from("b")]])
            .unwrap();
        let err = TrainingData::new(vec![(fv, 2)]).unwrap_err();
        assert!(matches!(
            err,
            Error::LabelOutOfRange {
                label: 2,
                num_labels: 2
            }
        ));
    }

    #[test]
    fn test_rejects_depth_mismatch() {
        let factory = FeatureVectorFactory::default();
        let a = factory
            .make_aggregate(&[vec![Attribute::from("a")], vec![Attribute::from("b")]])
            .unwrap();
        let b = factory
            .make_aggregate(&[
                vec![Attribute::from("a")],
                vec![Attribute::from("b")],
                vec![Attribute::from("c")],
            ])
            .unwrap();
        assert!(matches!(
            TrainingData::new(vec![(a, 0), (b, 0)]),
            Err(Error::DepthMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_rejects_foreign_mapper() {
        let a = FeatureVectorFactory::new(VectorKind::Dense).make(&[Attribute::from("a")]);
        let b = FeatureVectorFactory::new(VectorKind::Dense).make(&[Attribute::from("a")]);
        assert!(matches!(
            TrainingData::new(vec![(a, 0), (b, 1)]),
            Err(Error::MapperMismatch { index: 1 })
        ));
    }

    #[test]
    fn test_remove_non_discriminative() {
        let factory = FeatureVectorFactory::default();
        let fv1 = factory
            .make_aggregate(&[
                vec![Attribute::new("bias", 1.0), Attribute::new("pop", 2.0)],
                vec![Attribute::new("bias", 1.0), Attribute::new("pop", 5.0)],
            ])
            .unwrap();
        let fv2 = factory
            .make_aggregate(&[
                vec![Attribute::new("bias", 1.0), Attribute::new("seen", 1.0)],
                vec![Attribute::new("bias", 1.0)],
            ])
            .unwrap();
        // "never" is interned but absent from every candidate
        factory.mapper().intern("never");

        let mut data = TrainingData::new(vec![(fv1, 0), (fv2, 1)]).unwrap();
        assert_eq!(data.remove_non_discriminative(), 2);
        let bias = factory.mapper().index_of("bias").unwrap();
        let never = factory.mapper().index_of("never").unwrap();
        assert_eq!(
            data.removed_features().iter().copied().collect::<Vec<_>>(),
            vec![bias, never]
        );
    }
}
