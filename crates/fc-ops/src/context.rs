//! Execution context: backend selection and parallelism policy.
//!
//! A context is built once by the caller and passed by reference to every
//! kernel call. Kernels never mutate it.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::{OpError, Result};

/// Environment variable selecting the backend (`naive` or `blas`).
pub const ENV_BACKEND: &str = "FC_BACKEND";
/// Environment variable sizing a dedicated thread pool.
pub const ENV_NUM_THREADS: &str = "FC_NUM_THREADS";
/// Environment variable toggling row-level parallelism (`true`/`false`/`1`/`0`).
pub const ENV_PARALLEL: &str = "FC_PARALLEL";

/// The execution strategies for fully-connected kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /// Nested loops, parallel over output rows.
    #[default]
    Naive,
    /// General matrix multiply through the BLAS binding.
    Blas,
}

impl Backend {
    /// Returns the canonical name of this backend.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Naive => "naive",
            Backend::Blas => "blas",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(Backend::Naive),
            "blas" | "blas-library" | "openblas" => Ok(Backend::Blas),
            _ => Err(OpError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Call-scoped configuration shared by all kernel invocations.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    backend: Backend,
    parallel: bool,
    min_rows_per_task: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(Backend::default())
    }
}

impl ExecutionContext {
    /// A parallel context on rayon's global pool with the given backend.
    pub fn new(backend: Backend) -> Self {
        ExecutionContext {
            backend,
            parallel: true,
            min_rows_per_task: 1,
            pool: None,
        }
    }

    /// Returns a builder starting from the defaults of [`ExecutionContext::new`].
    pub fn builder() -> ExecutionContextBuilder {
        ExecutionContextBuilder::default()
    }

    /// Build a context from `FC_BACKEND`, `FC_NUM_THREADS` and `FC_PARALLEL`.
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`ExecutionContext::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(value) = lookup(ENV_BACKEND) {
            builder = builder.backend(value.parse()?);
        }
        if let Some(value) = lookup(ENV_NUM_THREADS) {
            let n = value.trim().parse::<usize>().map_err(|_| OpError::Config {
                key: ENV_NUM_THREADS,
                value: value.clone(),
            })?;
            builder = builder.num_threads(n);
        }
        if let Some(value) = lookup(ENV_PARALLEL) {
            builder = builder.parallel(parse_bool(ENV_PARALLEL, &value)?);
        }
        builder.build()
    }

    /// The selected backend.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Whether row loops may run concurrently.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Minimum number of rows handed to a single task.
    pub fn min_rows_per_task(&self) -> usize {
        self.min_rows_per_task
    }

    /// Number of worker threads kernels will run on.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Returns a copy of this context with a different backend.
    pub fn with_backend(&self, backend: Backend) -> Self {
        ExecutionContext {
            backend,
            ..self.clone()
        }
    }

    /// Runs `op` inside the dedicated pool, or the global pool if none was configured.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Builder for [`ExecutionContext`].
#[derive(Debug, Clone)]
pub struct ExecutionContextBuilder {
    backend: Backend,
    parallel: bool,
    num_threads: Option<usize>,
    min_rows_per_task: usize,
}

impl Default for ExecutionContextBuilder {
    fn default() -> Self {
        ExecutionContextBuilder {
            backend: Backend::default(),
            parallel: true,
            num_threads: None,
            min_rows_per_task: 1,
        }
    }
}

impl ExecutionContextBuilder {
    /// Backend the context dispatches to.
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Allow or forbid running row loops concurrently.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Size of a dedicated thread pool. `0` lets rayon pick.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Rows per task lower bound; clamped to at least 1.
    pub fn min_rows_per_task(mut self, n: usize) -> Self {
        self.min_rows_per_task = n.max(1);
        self
    }

    /// Builds the context, creating the dedicated pool if one was sized.
    ///
    /// No pool is created for a sequential context.
    pub fn build(self) -> Result<ExecutionContext> {
        let pool = match self.num_threads {
            Some(n) if self.parallel => Some(Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("fc-worker-{}", i))
                    .build()?,
            )),
            _ => None,
        };
        let ctx = ExecutionContext {
            backend: self.backend,
            parallel: self.parallel,
            min_rows_per_task: self.min_rows_per_task,
            pool,
        };
        debug!(
            backend = %ctx.backend,
            parallel = ctx.parallel,
            threads = ctx.num_threads(),
            min_rows_per_task = ctx.min_rows_per_task,
            "built execution context"
        );
        Ok(ctx)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(OpError::Config {
            key,
            value: value.to_string(),
        }),
    }
}
