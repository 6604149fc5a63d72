//! Backend dispatch for the fully-connected forward and backward passes.

use fc_tensor::{Element, Tensor2D};
use tracing::debug_span;

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::kernels::FullyConnectedKernel;

/// Forward pass on the backend selected by `ctx`.
///
/// Returns `out` holding `input * weight + bias`. Shapes are checked before
/// anything is written; see [`FullyConnectedKernel`] for the expected shapes.
pub fn forward<'o, T: Element>(
    input: &Tensor2D<T>,
    weight: &Tensor2D<T>,
    bias: &Tensor2D<T>,
    out: &'o mut Tensor2D<T>,
    ctx: &ExecutionContext,
) -> Result<&'o mut Tensor2D<T>> {
    let backend = ctx.backend();
    let _span = debug_span!(
        "fully_connected_forward",
        %backend,
        dtype = T::NAME,
        n = input.rows(),
        k = input.cols(),
        m = weight.cols()
    )
    .entered();

    backend.forward(input, weight, bias, out, ctx)?;
    Ok(out)
}

/// Backward pass on the backend selected by `ctx`.
///
/// Writes `delta`, `delta_weight` and `delta_bias` and returns `delta`.
pub fn backward<'d, T: Element>(
    input: &Tensor2D<T>,
    next_delta: &Tensor2D<T>,
    weight: &Tensor2D<T>,
    delta: &'d mut Tensor2D<T>,
    delta_weight: &mut Tensor2D<T>,
    delta_bias: &mut Tensor2D<T>,
    ctx: &ExecutionContext,
) -> Result<&'d mut Tensor2D<T>> {
    let backend = ctx.backend();
    let _span = debug_span!(
        "fully_connected_backward",
        %backend,
        dtype = T::NAME,
        n = input.rows(),
        k = input.cols(),
        m = weight.cols()
    )
    .entered();

    backend.backward(input, next_delta, weight, delta, delta_weight, delta_bias, ctx)?;
    Ok(delta)
}
