use std::fmt;

/// The shape of a row-major 2-D tensor: `[rows, cols]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    /// Create a new shape with the given number of rows and columns.
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    /// Number of rows (dimension 0).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (dimension 1).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the dimension sizes as an array.
    pub fn dims(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// The shape with rows and columns swapped.
    pub fn transposed(&self) -> Shape {
        Shape::new(self.cols, self.rows)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape::new(rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_shape() {
        let s = Shape::new(2, 3);
        assert_eq!(s.rows(), 2);
        assert_eq!(s.cols(), 3);
        assert_eq!(s.numel(), 6);
        assert_eq!(s.dims(), [2, 3]);
    }

    #[test]
    fn test_transposed() {
        assert_eq!(Shape::new(2, 7).transposed(), Shape::new(7, 2));
    }

    #[test]
    fn test_empty_shape() {
        let s = Shape::new(0, 4);
        assert_eq!(s.numel(), 0);
        assert_eq!(s.transposed().numel(), 0);
    }

    #[test]
    fn test_display_and_from() {
        let s: Shape = (3, 1).into();
        assert_eq!(s.to_string(), "[3, 1]");
        assert_eq!(Shape::from((3, 1)), Shape::new(3, 1));
    }
}
