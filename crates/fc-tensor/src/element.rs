use std::fmt::Debug;

use half::f16;
use num_traits::Float;

/// Floating-point element types a `Tensor2D` can hold.
///
/// Implemented for `f32`, `f64` and `half::f16`. The bounds are what both the
/// loop kernels and the gemm binding need: IEEE arithmetic, a zero and a one,
/// and the ability to cross thread boundaries.
pub trait Element: Float + Send + Sync + Debug + 'static {
    /// Short name used in log fields and error messages (e.g. "f32").
    const NAME: &'static str;

    /// `1 / n` for a count such as the batch size.
    ///
    /// Computed in f64 and rounded once, so counts past the type's largest
    /// finite value (65504 for f16) still give a non-zero scale. `n` must be
    /// non-zero.
    fn recip_count(n: usize) -> Self;
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    fn recip_count(n: usize) -> Self {
        (1.0 / n as f64) as f32
    }
}

impl Element for f64 {
    const NAME: &'static str = "f64";

    fn recip_count(n: usize) -> Self {
        1.0 / n as f64
    }
}

impl Element for f16 {
    const NAME: &'static str = "f16";

    fn recip_count(n: usize) -> Self {
        f16::from_f64(1.0 / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(f32::NAME, "f32");
        assert_eq!(f64::NAME, "f64");
        assert_eq!(f16::NAME, "f16");
    }

    #[test]
    fn test_recip_count() {
        assert_eq!(f32::recip_count(4), 0.25);
        assert_eq!(f64::recip_count(8), 0.125);
        assert_eq!(f16::recip_count(2), f16::from_f32(0.5));
    }

    #[test]
    fn test_f16_recip_count_beyond_max() {
        // 70000 itself is not representable in f16, its reciprocal is.
        assert!(f16::from_f64(70000.0).is_infinite());
        let r = f16::recip_count(70000);
        assert!(r > f16::ZERO);
        assert!(r.is_finite());
        assert_eq!(r, f16::from_f64(1.0 / 70000.0));
    }
}
