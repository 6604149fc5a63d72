use std::ops::{Index, IndexMut};

use crate::element::Element;
use crate::error::{Result, TensorError};
use crate::shape::Shape;

/// A dense 2-D tensor with contiguous row-major storage.
///
/// The backing vector always holds exactly `shape.numel()` elements. Kernels
/// borrow tensors and overwrite their contents; they never resize them.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor2D<T> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Element> Tensor2D<T> {
    /// Create a new tensor from row-major data and a shape.
    ///
    /// # Panics
    /// Panics if `data.len() != shape.numel()`.
    pub fn new(data: Vec<T>, shape: impl Into<Shape>) -> Self {
        match Self::from_vec(data, shape) {
            Ok(t) => t,
            Err(e) => panic!("{}", e),
        }
    }

    /// Create a new tensor, reporting a length mismatch as an error.
    pub fn from_vec(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        if data.len() != shape.numel() {
            return Err(TensorError::DataLength {
                len: data.len(),
                shape,
            });
        }
        Ok(Tensor2D { data, shape })
    }

    /// Create a zero-filled tensor with the given shape.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, T::zero())
    }

    /// Create a tensor with every element set to `value`.
    pub fn full(shape: impl Into<Shape>, value: T) -> Self {
        let shape = shape.into();
        Tensor2D {
            data: vec![value; shape.numel()],
            shape,
        }
    }

    /// Returns the tensor's shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.shape.rows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.shape.cols()
    }

    /// Returns row `i` as a slice.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row(&self, i: usize) -> &[T] {
        let cols = self.cols();
        &self.data[i * cols..(i + 1) * cols]
    }

    /// Returns row `i` as a mutable slice.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row_mut(&mut self, i: usize) -> &mut [T] {
        let cols = self.cols();
        &mut self.data[i * cols..(i + 1) * cols]
    }

    /// Returns the underlying row-major data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the underlying row-major data mutably.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Overwrite every element with `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Returns a new tensor with rows and columns swapped.
    pub fn transpose(&self) -> Tensor2D<T> {
        let (rows, cols) = (self.rows(), self.cols());
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..cols {
            for i in 0..rows {
                data.push(self.data[i * cols + j]);
            }
        }
        Tensor2D {
            data,
            shape: self.shape.transposed(),
        }
    }

    /// Returns a new tensor with `f` applied to every element.
    pub fn map(&self, f: impl Fn(T) -> T) -> Tensor2D<T> {
        Tensor2D {
            data: self.data.iter().map(|&v| f(v)).collect(),
            shape: self.shape,
        }
    }

    /// Largest absolute element-wise difference to `other`.
    ///
    /// Returns NaN if any pair differs by NaN.
    pub fn max_abs_diff(&self, other: &Tensor2D<T>) -> Result<T> {
        if self.shape != other.shape {
            return Err(TensorError::ShapeMismatch {
                expected: self.shape,
                got: other.shape,
            });
        }
        Ok(self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| (a - b).abs())
            .fold(T::zero(), |acc, d| if acc.is_nan() || d <= acc { acc } else { d }))
    }
}

impl<T: Element> Index<(usize, usize)> for Tensor2D<T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(
            i < self.rows() && j < self.cols(),
            "index ({}, {}) out of bounds for shape {}",
            i,
            j,
            self.shape
        );
        &self.data[i * self.cols() + j]
    }
}

impl<T: Element> IndexMut<(usize, usize)> for Tensor2D<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        debug_assert!(
            i < self.rows() && j < self.cols(),
            "index ({}, {}) out of bounds for shape {}",
            i,
            j,
            self.shape
        );
        let cols = self.cols();
        &mut self.data[i * cols + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_tensor() {
        let t = Tensor2D::new(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3));
        assert_eq!(t.rows(), 2);
        assert_eq!(t.cols(), 3);
        assert_eq!(t.shape(), Shape::new(2, 3));
        assert_eq!(t.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(t[(1, 0)], 4.0);
        assert_eq!(t.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "does not match shape [3, 1]")]
    fn test_new_shape_mismatch_panics() {
        let _t = Tensor2D::new(vec![1.0f32, 2.0], (3, 1));
    }

    #[test]
    fn test_from_vec_mismatch() {
        let err = Tensor2D::from_vec(vec![1.0f64; 5], (2, 3)).unwrap_err();
        assert_eq!(
            err,
            TensorError::DataLength {
                len: 5,
                shape: Shape::new(2, 3)
            }
        );
    }

    #[test]
    fn test_zeros_full_fill() {
        let mut t = Tensor2D::<f32>::zeros((2, 2));
        assert_eq!(t.as_slice(), &[0.0; 4]);
        t.fill(3.5);
        assert_eq!(t, Tensor2D::full((2, 2), 3.5));
    }

    #[test]
    fn test_index_mut_and_row_mut() {
        let mut t = Tensor2D::<f64>::zeros((2, 3));
        t[(0, 2)] = 7.0;
        t.row_mut(1).copy_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(t.as_slice(), &[0.0, 0.0, 7.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_transpose() {
        let t = Tensor2D::new(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3));
        let tt = t.transpose();
        assert_eq!(tt.shape(), Shape::new(3, 2));
        assert_eq!(tt.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(tt.transpose(), t);
    }

    #[test]
    fn test_map_and_max_abs_diff() {
        let a = Tensor2D::new(vec![1.0f32, -2.0, 3.0], (1, 3));
        let b = a.map(|v| v * 2.0);
        assert_eq!(b.as_slice(), &[2.0, -4.0, 6.0]);
        assert_relative_eq!(a.max_abs_diff(&b).unwrap(), 3.0);
        assert!(a.max_abs_diff(&Tensor2D::zeros((3, 1))).is_err());
    }

    #[test]
    fn test_max_abs_diff_propagates_nan() {
        let a = Tensor2D::new(vec![1.0f32, 2.0, 3.0], (1, 3));
        let mut b = a.clone();
        b[(0, 1)] = f32::NAN;
        assert!(a.max_abs_diff(&b).unwrap().is_nan());
        assert!(b.max_abs_diff(&a).unwrap().is_nan());

        // NaN in the first slot must survive larger later differences.
        let c = Tensor2D::new(vec![f32::NAN, 100.0, -50.0], (1, 3));
        assert!(a.max_abs_diff(&c).unwrap().is_nan());
    }
}
