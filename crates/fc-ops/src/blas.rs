//! General matrix multiply binding.
//!
//! `gemm` mirrors the BLAS `?gemm` contract (`C = alpha * op(A) * op(B) +
//! beta * C`) over `Tensor2D` operands. The multiply itself is done by
//! `ndarray::linalg::general_mat_mul`, which uses `matrixmultiply` for f32/f64
//! and cblas when the `openblas` feature is enabled.

use fc_tensor::{Element, Shape, Tensor2D};
use ndarray::linalg::general_mat_mul;
use ndarray::{ArrayView2, ArrayViewMut2, ShapeBuilder};

use crate::context::ExecutionContext;
use crate::error::{OpError, Result};

/// Memory layout the operand buffers are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    RowMajor,
    ColMajor,
}

/// Whether an operand is used as-is or transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    #[default]
    NoTrans,
    Trans,
}

/// Options for a single [`gemm`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GemmOpts<T> {
    /// Storage order of all three operands.
    pub layout: Layout,
    /// Whether `a` is used transposed.
    pub trans_a: Transpose,
    /// Whether `b` is used transposed.
    pub trans_b: Transpose,
    /// Scale applied to the product.
    pub alpha: T,
    /// Scale applied to the existing contents of `c`; zero overwrites it.
    pub beta: T,
}

impl<T: Element> Default for GemmOpts<T> {
    fn default() -> Self {
        GemmOpts {
            layout: Layout::RowMajor,
            trans_a: Transpose::NoTrans,
            trans_b: Transpose::NoTrans,
            alpha: T::one(),
            beta: T::zero(),
        }
    }
}

impl<T: Element> GemmOpts<T> {
    /// Sets the transpose flag for `a`.
    pub fn trans_a(mut self, trans: Transpose) -> Self {
        self.trans_a = trans;
        self
    }

    /// Sets the transpose flag for `b`.
    pub fn trans_b(mut self, trans: Transpose) -> Self {
        self.trans_b = trans;
        self
    }

    /// Sets the product scale.
    pub fn alpha(mut self, alpha: T) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the accumulator scale.
    pub fn beta(mut self, beta: T) -> Self {
        self.beta = beta;
        self
    }
}

/// `c = alpha * op(a) * op(b) + beta * c`.
///
/// The tensors' shapes are their logical `[rows, cols]`; with
/// [`Layout::ColMajor`] their buffers are read column by column instead.
/// `op(a)` must be `[m, k]`, `op(b)` `[k, n]` and `c` `[m, n]`.
pub fn gemm<T: Element>(
    ctx: &ExecutionContext,
    opts: &GemmOpts<T>,
    a: &Tensor2D<T>,
    b: &Tensor2D<T>,
    c: &mut Tensor2D<T>,
) -> Result<()> {
    let op_a = apply(a.shape(), opts.trans_a);
    let op_b = apply(b.shape(), opts.trans_b);
    let (m, k, n) = (op_a.rows(), op_a.cols(), op_b.cols());

    if op_b.rows() != k {
        return Err(OpError::ShapeMismatch {
            op: "gemm",
            operand: "b",
            expected: Shape::new(k, n),
            got: op_b,
        });
    }
    if c.shape() != Shape::new(m, n) {
        return Err(OpError::ShapeMismatch {
            op: "gemm",
            operand: "c",
            expected: Shape::new(m, n),
            got: c.shape(),
        });
    }

    let a_view = view(a, opts.layout, opts.trans_a)?;
    let b_view = view(b, opts.layout, opts.trans_b)?;
    let c_shape = c.shape();
    let mut c_view = match opts.layout {
        Layout::RowMajor => ArrayViewMut2::from_shape(c_shape.dims(), c.as_mut_slice()),
        Layout::ColMajor => ArrayViewMut2::from_shape(c_shape.dims().f(), c.as_mut_slice()),
    }
    .map_err(|e| OpError::Other(format!("gemm: {}", e)))?;

    ctx.install(|| general_mat_mul(opts.alpha, &a_view, &b_view, opts.beta, &mut c_view));
    Ok(())
}

fn apply(shape: Shape, trans: Transpose) -> Shape {
    match trans {
        Transpose::NoTrans => shape,
        Transpose::Trans => shape.transposed(),
    }
}

fn view<T: Element>(t: &Tensor2D<T>, layout: Layout, trans: Transpose) -> Result<ArrayView2<'_, T>> {
    let dims = t.shape().dims();
    let v = match layout {
        Layout::RowMajor => ArrayView2::from_shape(dims, t.as_slice()),
        Layout::ColMajor => ArrayView2::from_shape(dims.f(), t.as_slice()),
    }
    .map_err(|e| OpError::Other(format!("gemm: {}", e)))?;
    Ok(match trans {
        Transpose::NoTrans => v,
        Transpose::Trans => v.reversed_axes(),
    })
}
