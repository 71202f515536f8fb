pub trait FloatExt {
    /// Absolute-difference comparison against the crate default tolerance.
    fn approximately_eq(self, other: Self) -> bool;
    /// Absolute-difference comparison against an explicit tolerance.
    fn within(self, other: Self, tolerance: Self) -> bool;
}

impl FloatExt for f64 {
    fn approximately_eq(self, other: Self) -> bool {
        (self - other).abs() < crate::EPSILON
    }
    fn within(self, other: Self, tolerance: Self) -> bool {
        (self - other).abs() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approximately_eq_default_tolerance() {
        assert!(1.0_f64.approximately_eq(1.0));
        assert!(1.0_f64.approximately_eq(1.0 + 1e-12));
        assert!(!1.0_f64.approximately_eq(1.0 + 1e-9));
    }

    #[test]
    fn within_explicit_tolerance() {
        assert!(23.9_f64.within(23.9001, 1e-3));
        assert!(!23.9_f64.within(23.91, 1e-3));
    }

    #[test]
    fn nan_is_never_equal() {
        // NaN != NaN per IEEE 754, abs(NaN - NaN) = NaN which is not < tolerance
        assert!(!f64::NAN.approximately_eq(f64::NAN));
        assert!(!f64::NAN.within(0.0, 1.0));
    }

    #[test]
    fn infinity_not_approximately_eq_to_finite() {
        assert!(!f64::INFINITY.approximately_eq(1.0));
        assert!(!f64::NEG_INFINITY.approximately_eq(-1.0));
    }
}
