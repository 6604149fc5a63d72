use thiserror::Error;

use crate::shape::Shape;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Shape, got: Shape },
    #[error("data length {len} does not match shape {shape} (numel={})", .shape.numel())]
    DataLength { len: usize, shape: Shape },
}

pub type Result<T> = std::result::Result<T, TensorError>;
