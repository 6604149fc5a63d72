use fc_tensor::Shape;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpError {
    #[error("{op}: shape mismatch for `{operand}`: expected {expected}, got {got}")]
    ShapeMismatch {
        op: &'static str,
        operand: &'static str,
        expected: Shape,
        got: Shape,
    },
    #[error("unsupported backend: {0:?}")]
    UnsupportedBackend(String),
    #[error("invalid configuration value for {key}: {value:?}")]
    Config { key: &'static str, value: String },
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, OpError>;
