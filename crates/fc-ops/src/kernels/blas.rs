use fc_tensor::{Element, Tensor2D};
use tracing::trace;

use super::{add_bias, bias_gradient, Dims, FullyConnectedKernel};
use crate::blas::{gemm, GemmOpts, Transpose};
use crate::context::ExecutionContext;
use crate::error::Result;

/// Fully-connected kernel built on general matrix multiply.
///
/// The gemm call may be multi-threaded internally; the row-parallel bias add
/// only starts after it has returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlasKernel;

impl FullyConnectedKernel for BlasKernel {
    fn name(&self) -> &str {
        "blas"
    }

    fn forward<T: Element>(
        &self,
        input: &Tensor2D<T>,
        weight: &Tensor2D<T>,
        bias: &Tensor2D<T>,
        out: &mut Tensor2D<T>,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        Dims::forward(input, weight, bias, out)?;
        out.fill(T::zero());

        trace!(kernel = "blas", phase = "gemm");
        gemm(ctx, &GemmOpts::default(), input, weight, out)?;

        trace!(kernel = "blas", phase = "bias");
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
        let Dims { n, .. } =
            Dims::backward(input, next_delta, weight, delta, delta_weight, delta_bias)?;
        delta.fill(T::zero());
        delta_weight.fill(T::zero());

        trace!(kernel = "blas", phase = "delta");
        let opts = GemmOpts::default().trans_b(Transpose::Trans);
        gemm(ctx, &opts, next_delta, weight, delta)?;

        trace!(kernel = "blas", phase = "delta_weight");
        if n > 0 {
            let opts = GemmOpts::default()
                .trans_a(Transpose::Trans)
                .alpha(T::recip_count(n));
            gemm(ctx, &opts, input, next_delta, delta_weight)?;
        }

        trace!(kernel = "blas", phase = "delta_bias");
        bias_gradient(next_delta, delta_bias);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpError;
    use approx::assert_relative_eq;

    fn ctx() -> ExecutionContext {
        ExecutionContext::default()
    }

    fn t(rows: usize, cols: usize, data: &[f32]) -> Tensor2D<f32> {
        Tensor2D::new(data.to_vec(), (rows, cols))
    }

    #[test]
    fn test_forward_identity() {
        let input = t(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let weight = t(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let bias = t(1, 2, &[0.0, 0.0]);
        let mut out = Tensor2D::zeros((2, 2));
        BlasKernel
            .forward(&input, &weight, &bias, &mut out, &ctx())
            .unwrap();
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_forward_bias_broadcast() {
        let input = t(3, 1, &[1.0, 2.0, 3.0]);
        let weight = t(1, 2, &[1.0, -1.0]);
        let bias = t(1, 2, &[10.0, 20.0]);
        let mut out = t(3, 2, &[f32::NAN; 6]);
        BlasKernel
            .forward(&input, &weight, &bias, &mut out, &ctx())
            .unwrap();
        assert_eq!(out.as_slice(), &[11.0, 19.0, 12.0, 18.0, 13.0, 17.0]);
    }

    #[test]
    fn test_backward_hand_computed() {
        let input = t(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let next_delta = t(2, 2, &[1.0, 0.0, 0.0, 2.0]);
        let weight = t(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let mut delta = Tensor2D::zeros((2, 2));
        let mut delta_weight = Tensor2D::zeros((2, 2));
        let mut delta_bias = Tensor2D::zeros((1, 2));
        BlasKernel
            .backward(
                &input,
                &next_delta,
                &weight,
                &mut delta,
                &mut delta_weight,
                &mut delta_bias,
                &ctx(),
            )
            .unwrap();

        assert_eq!(delta.as_slice(), &[1.0, 3.0, 4.0, 8.0]);
        for (got, want) in delta_weight.as_slice().iter().zip([0.5, 3.0, 1.0, 4.0]) {
            assert_relative_eq!(*got, want, max_relative = 1e-6);
        }
        assert_eq!(delta_bias.as_slice(), &[0.5, 1.0]);
    }

    #[test]
    fn test_backward_non_square() {
        // N = 3, K = 2, M = 1
        let input = t(3, 2, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let next_delta = t(3, 1, &[3.0, 6.0, 9.0]);
        let weight = t(2, 1, &[2.0, -1.0]);
        let mut delta = Tensor2D::zeros((3, 2));
        let mut delta_weight = Tensor2D::zeros((2, 1));
        let mut delta_bias = Tensor2D::zeros((1, 1));
        BlasKernel
            .backward(
                &input,
                &next_delta,
                &weight,
                &mut delta,
                &mut delta_weight,
                &mut delta_bias,
                &ctx(),
            )
            .unwrap();

        assert_eq!(delta.as_slice(), &[6.0, -3.0, 12.0, -6.0, 18.0, -9.0]);
        // input^T * next_delta = [12, 15], / 3
        assert_relative_eq!(delta_weight[(0, 0)], 4.0, max_relative = 1e-6);
        assert_relative_eq!(delta_weight[(1, 0)], 5.0, max_relative = 1e-6);
        assert_relative_eq!(delta_bias[(0, 0)], 6.0);
    }

    #[test]
    fn test_backward_shape_mismatch() {
        let input = t(2, 2, &[1.0; 4]);
        let next_delta = t(2, 2, &[1.0; 4]);
        let weight = t(2, 2, &[1.0; 4]);
        let mut delta = t(2, 2, &[9.0; 4]);
        let mut delta_weight = t(2, 2, &[9.0; 4]);
        let mut delta_bias = t(1, 3, &[9.0; 3]);
        let err = BlasKernel
            .backward(
                &input,
                &next_delta,
                &weight,
                &mut delta,
                &mut delta_weight,
                &mut delta_bias,
                &ctx(),
            )
            .unwrap_err();
        assert!(matches!(err, OpError::ShapeMismatch { operand: "delta_bias", .. }));
        assert_eq!(delta.as_slice(), &[9.0; 4]);
        assert_eq!(delta_weight.as_slice(), &[9.0; 4]);
        assert_eq!(delta_bias.as_slice(), &[9.0; 3]);
    }

    #[test]
    fn test_forward_shape_mismatch_leaves_output_untouched() {
        let input = t(2, 3, &[0.0; 6]);
        let weight = t(2, 2, &[0.0; 4]);
        let bias = t(1, 2, &[0.0; 2]);
        let mut out = t(2, 2, &[7.0; 4]);
        let err = BlasKernel
            .forward(&input, &weight, &bias, &mut out, &ctx())
            .unwrap_err();
        assert!(matches!(err, OpError::ShapeMismatch { operand: "weight", .. }));
        assert_eq!(out.as_slice(), &[7.0; 4]);

        let weight = t(3, 2, &[0.0; 6]);
        let mut out = t(3, 2, &[7.0; 6]);
        let err = BlasKernel
            .forward(&input, &weight, &bias, &mut out, &ctx())
            .unwrap_err();
        assert!(matches!(err, OpError::ShapeMismatch { operand: "out", .. }));
        assert_eq!(out.as_slice(), &[7.0; 6]);
    }
}
