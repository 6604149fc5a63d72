//! `fc-ops` - Fully-connected layer kernels with selectable backends.
//!
//! This crate provides:
//! - `forward` / `backward` entry points that dispatch on the context's backend
//! - A `FullyConnectedKernel` trait with `NaiveKernel` and `BlasKernel` implementations
//! - An `ExecutionContext` carrying the backend and parallelism policy
//! - A row-parallel loop primitive and a gemm binding

#[cfg(feature = "openblas")]
extern crate blas_src;

pub mod blas;
pub mod context;
pub mod error;
pub mod fully_connected;
pub mod kernels;
pub mod parallel;

// Re-export primary types at the crate root for convenience.
pub use context::{Backend, ExecutionContext, ExecutionContextBuilder};
pub use error::{OpError, Result};
pub use fully_connected::{backward, forward};
pub use kernels::{BlasKernel, FullyConnectedKernel, NaiveKernel};
