pub mod blas;
pub mod naive;

use fc_tensor::{Element, Shape, Tensor2D};

use crate::context::{Backend, ExecutionContext};
use crate::error::{OpError, Result};
use crate::parallel::for_each_row;

pub use self::blas::BlasKernel;
pub use self::naive::NaiveKernel;

/// A fully-connected layer implementation.
///
/// Shapes (row-major `[rows, cols]`), with N batch rows, K input features and
/// M output features:
///
/// - `input`: [N, K], `weight`: [K, M], `bias`: [1, M]
/// - `out`, `next_delta`: [N, M]
/// - `delta`: [N, K], `delta_weight`: [K, M], `delta_bias`: [1, M]
///
/// Implementations validate every operand before writing anything, then
/// zero their outputs and accumulate into them.
pub trait FullyConnectedKernel {
    /// Returns the name of this kernel (e.g., "naive", "blas").
    fn name(&self) -> &str;

    /// `out = input * weight + bias`, bias broadcast over rows.
    fn forward<T: Element>(
        &self,
        input: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        bias: &Tensor2D<T>,
        out: &mut Tensor2D<T>,
        ctx: &ExecutionContext,
    ) -> Result<()>;

    /// Gradients of the layer given the gradient `next_delta` flowing in from above:
    ///
    /// - `delta = next_delta * weight^T`
    /// - `delta_weight = input^T * next_delta / N`
    /// - `delta_bias = column mean of next_delta`
    #[allow(clippy::too_many_arguments)]
    fn backward<T: Element>(
        &self,
        input: &Tensor2D<T>,
        next_delta: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        delta: &mut Tensor2D<T>,
        delta_weight: &mut Tensor2D<T>,
        delta_bias: &mut Tensor2D<T>,
        ctx: &ExecutionContext,
    ) -> Result<()>;
}

/// The backend enum is itself a kernel: it routes to the variant it names.
impl FullyConnectedKernel for Backend {
    fn name(&self) -> &str {
        Backend::name(self)
    }

    fn forward<T: Element>(
        &self,
        input: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        bias: &Tensor2D<T>,
        out: &mut Tensor2D<T>,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        match self {
            Backend::Naive => NaiveKernel.forward(input, weight, bias, out, ctx),
            Backend::Blas => BlasKernel.forward(input, weight, bias, out, ctx),
        }
    }

    fn backward<T: Element>(
        &self,
        input: &Tensor2D<T>,
        next_delta: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        delta: &mut Tensor2D<T>,
        delta_weight: &mut Tensor2D<T>,
        delta_bias: &mut Tensor2D<T>,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        match self {
            Backend::Naive => {
                NaiveKernel.backward(input, next_delta, weight, delta, delta_weight, delta_bias, ctx)
            }
            Backend::Blas => {
                BlasKernel.backward(input, next_delta, weight, delta, delta_weight, delta_bias, ctx)
            }
        }
    }
}

/// Problem dimensions inferred from validated operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dims {
    /// Batch rows.
    pub n: usize,
    /// Input features.
    pub k: usize,
    /// Output features.
    pub m: usize,
}

impl Dims {
    /// Validates the forward operands.
    pub fn forward<T: Element>(
        input: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        bias: &Tensor2D<T>,
        out: &Tensor2D<T>,
    ) -> Result<Dims> {
        const OP: &str = "fully_connected_forward";
        let dims = Dims {
            n: input.rows(),
            k: input.cols(),
            m: weight.cols(),
        };
        expect(OP, "weight", weight.shape(), Shape::new(dims.k, dims.m))?;
        expect(OP, "bias", bias.shape(), Shape::new(1, dims.m))?;
        expect(OP, "out", out.shape(), Shape::new(dims.n, dims.m))?;
        Ok(dims)
    }

    /// Validates the backward operands.
    pub fn backward<T: Element>(
        input: &Tensor2D<T>,
        next_delta: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        delta: &Tensor2D<T>,
        delta_weight: &Tensor2D<T>,
        delta_bias: &Tensor2D<T>,
    ) -> Result<Dims> {
        const OP: &str = "fully_connected_backward";
        let dims = Dims {
            n: input.rows(),
            k: input.cols(),
            m: weight.cols(),
        };
        expect(OP, "weight", weight.shape(), Shape::new(dims.k, dims.m))?;
        expect(OP, "next_delta", next_delta.shape(), Shape::new(dims.n, dims.m))?;
        expect(OP, "delta", delta.shape(), Shape::new(dims.n, dims.k))?;
        expect(OP, "delta_weight", delta_weight.shape(), Shape::new(dims.k, dims.m))?;
        expect(OP, "delta_bias", delta_bias.shape(), Shape::new(1, dims.m))?;
        Ok(dims)
    }
}

fn expect(op: &'static str, operand: &'static str, got: Shape, expected: Shape) -> Result<()> {
    if got != expected {
        return Err(OpError::ShapeMismatch {
            op,
            operand,
            expected,
            got,
        });
    }
    Ok(())
}

/// Adds `bias[0, j]` to every `out[i, j]`, one task per row.
pub(crate) fn add_bias<T: Element>(ctx: &ExecutionContext, bias: &Tensor2D<T>, out: &mut Tensor2D<T>) {
    let bias = bias.row(0);
    let cols = out.cols();
    for_each_row(ctx, out.as_mut_slice(), cols, |_, row| {
        for (o, &b) in row.iter_mut().zip(bias) {
            *o = *o + b;
        }
    });
}

/// `delta_bias[0, j] = sum_i next_delta[i, j] * (1 / N)`, summed with i ascending.
///
/// Shared by both kernels: a column reduction has nothing to gain from gemm.
pub(crate) fn bias_gradient<T: Element>(next_delta: &Tensor2D<T>, delta_bias: &mut Tensor2D<T>) {
    let n = next_delta.rows();
    delta_bias.fill(T::zero());
    if n == 0 {
        return;
    }
    let acc = delta_bias.row_mut(0);
    for i in 0..n {
        for (a, &g) in acc.iter_mut().zip(next_delta.row(i)) {
            *a = *a + g;
        }
    }
    let scale = T::recip_count(n);
    for a in acc.iter_mut() {
        *a = *a * scale;
    }
}
