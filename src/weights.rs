//! Learned parameters of a linear classifier.

use crate::vector::Vector;

/// Either one weight vector shared by every label, or one vector per label.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightAggregate {
    /// A single vector; `apply(label)` ignores `label`
    Single(Vector),
    /// One vector per label
    Multi(Vec<Vector>),
}

impl WeightAggregate {
    /// Zero-initialized shared vector of the given length
    pub fn single(length: usize) -> Self {
        WeightAggregate::Single(Vector::zeros(length))
    }

    /// Zero-initialized per-label vectors
    pub fn multi(num_labels: usize, length: usize) -> Self {
        WeightAggregate::Multi((0..num_labels).map(|_| Vector::zeros(length)).collect())
    }

    /// Weights used to score `label`
    ///
    /// # Panics
    ///
    /// Panics if this is a per-label aggregate and `label` is out of range.
    pub fn apply(&self, label: usize) -> &Vector {
        match self {
            WeightAggregate::Single(v) => v,
            WeightAggregate::Multi(vs) => &vs[label],
        }
    }

    pub fn apply_mut(&mut self, label: usize) -> &mut Vector {
        match self {
            WeightAggregate::Single(v) => v,
            WeightAggregate::Multi(vs) => &mut vs[label],
        }
    }

    /// Number of contained vectors
    pub fn num_vectors(&self) -> usize {
        match self {
            WeightAggregate::Single(_) => 1,
            WeightAggregate::Multi(vs) => vs.len(),
        }
    }

    /// Length of each contained vector
    pub fn length(&self) -> usize {
        self.vectors().next().map_or(0, Vector::len)
    }

    pub fn is_single(&self) -> bool {
        matches!(self, WeightAggregate::Single(_))
    }

    pub fn vectors(&self) -> impl Iterator<Item = &Vector> + '_ {
        let slice: &[Vector] = match self {
            WeightAggregate::Single(v) => std::slice::from_ref(v),
            WeightAggregate::Multi(vs) => vs,
        };
        slice.iter()
    }

    fn vectors_mut(&mut self) -> impl Iterator<Item = &mut Vector> + '_ {
        let slice: &mut [Vector] = match self {
            WeightAggregate::Single(v) => std::slice::from_mut(v),
            WeightAggregate::Multi(vs) => vs,
        };
        slice.iter_mut()
    }

    /// A zero aggregate of the same shape
    pub fn zeros_like(&self) -> Self {
        match self {
            WeightAggregate::Single(v) => WeightAggregate::single(v.len()),
            WeightAggregate::Multi(vs) => {
                WeightAggregate::multi(vs.len(), vs.first().map_or(0, Vector::len))
            }
        }
    }

    /// Elementwise `self += other`
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn add_assign(&mut self, other: &WeightAggregate) {
        self.scaled_add(1.0, other);
    }

    /// Elementwise `self += scale * other`
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn scaled_add(&mut self, scale: f64, other: &WeightAggregate) {
        assert_eq!(
            self.num_vectors(),
            other.num_vectors(),
            "weight aggregates must have the same number of vectors"
        );
        for (dst, src) in self.vectors_mut().zip(other.vectors()) {
            dst.scaled_add(scale, src);
        }
    }

    /// Multiply every weight by `factor`
    pub fn scale(&mut self, factor: f64) {
        for v in self.vectors_mut() {
            v.scale(factor);
        }
    }

    pub fn max(&self) -> f64 {
        self.vectors().map(Vector::max).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min(&self) -> f64 {
        self.vectors().map(Vector::min).fold(f64::INFINITY, f64::min)
    }

    pub fn sum(&self) -> f64 {
        self.vectors().map(Vector::sum).sum()
    }

    /// Euclidean norm over all contained weights
    pub fn norm(&self) -> f64 {
        self.vectors().map(Vector::squared_norm).sum::<f64>().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_ignores_label() {
        let mut w = WeightAggregate::single(3);
        w.apply_mut(7)[1] = 2.0;
        assert_eq!(w.apply(0)[1], 2.0);
        assert_eq!(w.apply(42)[1], 2.0);
        assert_eq!(w.num_vectors(), 1);
        assert_eq!(w.length(), 3);
    }

    #[test]
    fn test_multi_indexes_by_label() {
        let mut w = WeightAggregate::multi(2, 2);
        w.apply_mut(1)[0] = -1.0;
        assert_eq!(w.apply(0)[0], 0.0);
        assert_eq!(w.apply(1)[0], -1.0);
        assert_eq!(w.num_vectors(), 2);
        assert!(!w.is_single());
    }

    #[test]
    fn test_aggregate_arithmetic() {
        let mut a = WeightAggregate::Multi(vec![
            Vector::from_vec(vec![1.0, 2.0]),
            Vector::from_vec(vec![-3.0, 0.0]),
        ]);
        let b = a.clone();
        a.add_assign(&b);
        a.scaled_add(-0.5, &b);
        a.scale(2.0);
        assert_eq!(a.apply(0).as_slice(), &[3.0, 6.0]);
        assert_eq!(a.apply(1).as_slice(), &[-9.0, 0.0]);
        assert_eq!(a.max(), 6.0);
        assert_eq!(a.min(), -9.0);
        assert_eq!(a.sum(), 0.0);

        let z = a.zeros_like();
        assert_eq!(z.sum(), 0.0);
        assert_eq!(z.num_vectors(), 2);
    }
}
