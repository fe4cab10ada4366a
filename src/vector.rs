use std::ops::{Index, IndexMut};

use ndarray::Array1;

/// Fixed-length numeric vector used to store weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    data: Array1<f64>,
}

impl Vector {
    /// Create a zero-filled vector of the given length
    pub fn zeros(len: usize) -> Self {
        Self {
            data: Array1::zeros(len),
        }
    }

    /// Create a vector from raw values
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self {
            data: Array1::from(values),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the values as a contiguous slice
    pub fn as_slice(&self) -> &[f64] {
        // Array1 built by `zeros`/`from` is always in standard layout
        self.data
            .as_slice()
            .expect("weight vectors are always contiguous")
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data
            .as_slice_mut()
            .expect("weight vectors are always contiguous")
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> + '_ {
        self.data.iter()
    }

    /// Elementwise `self += other`
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn add_assign(&mut self, other: &Vector) {
        self.data += &other.data;
    }

    /// Elementwise `self += scale * other`
    ///
    /// # Panics
    ///
    /// Panics if the lengths differ.
    pub fn scaled_add(&mut self, scale: f64, other: &Vector) {
        self.data.scaled_add(scale, &other.data);
    }

    /// Multiply every element by `factor`
    pub fn scale(&mut self, factor: f64) {
        self.data *= factor;
    }

    /// Largest element, or negative infinity for an empty vector
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest element, or positive infinity for an empty vector
    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    pub fn squared_norm(&self) -> f64 {
        self.data.dot(&self.data)
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.data[index]
    }
}

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.data[index]
    }
}

impl From<Vec<f64>> for Vector {
    fn from(values: Vec<f64>) -> Self {
        Self::from_vec(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_arithmetic() {
        let mut v = Vector::from_vec(vec![1.0, -2.0, 3.0]);
        let w = Vector::from_vec(vec![0.5, 0.5, 0.5]);

        v.add_assign(&w);
        assert_eq!(v.as_slice(), &[1.5, -1.5, 3.5]);

        v.scaled_add(-2.0, &w);
        assert_eq!(v.as_slice(), &[0.5, -2.5, 2.5]);

        v.scale(2.0);
        assert_eq!(v.as_slice(), &[1.0, -5.0, 5.0]);

        assert_eq!(v.max(), 5.0);
        assert_eq!(v.min(), -5.0);
        assert_eq!(v.sum(), 1.0);
        assert_eq!(v.squared_norm(), 51.0);
    }

    #[test]
    fn test_zeros() {
        let v = Vector::zeros(4);
        assert_eq!(v.len(), 4);
        assert_eq!(v.sum(), 0.0);
        assert!(Vector::zeros(0).is_empty());
    }
}
