use fc_tensor::{Element, Tensor2D};
use tracing::trace;

use super::{add_bias, bias_gradient, Dims, FullyConnectedKernel};
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::parallel::for_each_row;

/// Pure-Rust fully-connected kernel.
///
/// Straightforward triple loops with plain accumulation (k ascending), one
/// task per output row. Intended as the reference implementation the BLAS
/// kernel is checked against.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveKernel;

impl FullyConnectedKernel for NaiveKernel {
    fn name(&self) -> &str {
        "naive"
    }

    fn forward<T: Element>(
        &self,
        input: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        bias: &Tensor2D<T>,
        out: &mut Tensor2D<T>,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        let Dims { m, .. } = Dims::forward(input, weight, bias, out)?;
        out.fill(T::zero());

        trace!(kernel = "naive", phase = "matmul");
        for_each_row(ctx, out.as_mut_slice(), m, |i, row| {
            let x = input.row(i);
            for (j, o) in row.iter_mut().enumerate() {
                for (p, &xp) in x.iter().enumerate() {
                    *o = *o + xp * weight[(p, j)];
                }
            }
        });

        trace!(kernel = "naive", phase = "bias");
        add_bias(ctx, bias, out);
        Ok(())
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
        let Dims { n, k, m } =
            Dims::backward(input, next_delta, weight, delta, delta_weight, delta_bias)?;
        delta.fill(T::zero());
        delta_weight.fill(T::zero());

        // delta = next_delta * weight^T, one task per batch row.
        trace!(kernel = "naive", phase = "delta");
        for_each_row(ctx, delta.as_mut_slice(), k, |i, row| {
            let g = next_delta.row(i);
            for (j, d) in row.iter_mut().enumerate() {
                for (&gp, &wp) in g.iter().zip(weight.row(j)) {
                    *d = *d + gp * wp;
                }
            }
        });

        // delta_weight = input^T * next_delta / n, one task per input feature.
        // An empty batch leaves it at zero.
        trace!(kernel = "naive", phase = "delta_weight");
        if n > 0 {
            let scale = T::recip_count(n);
            for_each_row(ctx, delta_weight.as_mut_slice(), m, |i, row| {
                for (j, dw) in row.iter_mut().enumerate() {
                    for p in 0..n {
                        *dw = *dw + input[(p, i)] * next_delta[(p, j)];
                    }
                    *dw = *dw * scale;
                }
            });
        }

        trace!(kernel = "naive", phase = "delta_bias");
        bias_gradient(next_delta, delta_bias);
        Ok(())
    }
}
