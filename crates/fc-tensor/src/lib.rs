//! `fc-tensor` - Dense 2-D tensors for the fully-connected kernels.
//!
//! This crate provides:
//! - A `Tensor2D<T>` type with contiguous row-major storage
//! - A two-dimensional `Shape`
//! - The `Element` trait for supported floating-point element types (f32, f64, f16)

pub mod element;
pub mod error;
pub mod shape;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use element::Element;
pub use error::{Result, TensorError};
pub use shape::Shape;
pub use tensor::Tensor2D;
