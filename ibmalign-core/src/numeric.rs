//! Fixed-precision probability arithmetic.
//!
//! Every `+`, `*` and `/` is rounded to a fixed number of significant
//! digits, half away from zero, so a training run follows exactly the same
//! path on every platform. `Decimal` keeps at most 28 fractional digits, so
//! values too small to carry the full precision keep only the digits that
//! fit in 28 places, and anything below 1e-28 is zero.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{AlignError, Result};
use crate::types::{Prob, DEFAULT_PRECISION};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecimalContext {
    digits: u32,
}

impl Default for DecimalContext {
    fn default() -> Self {
        DecimalContext { digits: DEFAULT_PRECISION }
    }
}

impl DecimalContext {
    pub fn new(digits: u32) -> Result<Self> {
        if digits == 0 || digits > 28 {
            return Err(AlignError::InvalidArgument(format!(
                "precision must be between 1 and 28 significant digits, got {digits}"
            )));
        }
        Ok(DecimalContext { digits })
    }

    #[inline]
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Smallest magnitude that still has room for `digits` significant
    /// digits within 28 decimal places.
    #[inline]
    fn full_precision_floor(&self) -> Prob {
        Decimal::new(1, 29 - self.digits)
    }

    #[inline]
    pub fn round(&self, v: Prob) -> Prob {
        if v.is_zero() {
            return Decimal::ZERO;
        }
        // below the floor a Decimal already holds fewer than `digits`
        // significant digits, and round_sf would need a scale above 28
        if v.abs() < self.full_precision_floor() {
            return v;
        }
        v.round_sf_with_strategy(self.digits, RoundingStrategy::MidpointAwayFromZero)
            .unwrap_or(v)
    }

    #[inline]
    pub fn add(&self, a: Prob, b: Prob) -> Result<Prob> {
        a.checked_add(b)
            .map(|v| self.round(v))
            .ok_or_else(|| AlignError::NumericOverflow(format!("{a} + {b}")))
    }

    #[inline]
    pub fn mul(&self, a: Prob, b: Prob) -> Result<Prob> {
        a.checked_mul(b)
            .map(|v| self.round(v))
            .ok_or_else(|| AlignError::NumericOverflow(format!("{a} * {b}")))
    }

    /// Product of two probabilities. Both factors must lie in [0, 1].
    #[inline]
    pub fn mul_prob(&self, a: Prob, b: Prob) -> Prob {
        debug_assert!(a <= Decimal::ONE && b <= Decimal::ONE, "{a} * {b} outside [0, 1]");
        self.round(a * b)
    }

    /// `None` when `b` is zero.
    #[inline]
    pub fn div(&self, a: Prob, b: Prob) -> Option<Prob> {
        if b.is_zero() {
            return None;
        }
        a.checked_div(b).map(|q| self.round(q))
    }

    /// 1/n, rounded. `None` for n == 0.
    pub fn reciprocal(&self, n: usize) -> Option<Prob> {
        self.div(Decimal::ONE, Decimal::from(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn rounds_to_four_significant_digits_half_up() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.round(d("0.12345")), d("0.1235"));
        assert_eq!(ctx.round(d("0.000123449")), d("0.0001234"));
        assert_eq!(ctx.round(d("12.355")), d("12.36"));
        assert_eq!(ctx.reciprocal(3), Some(d("0.3333")));
        assert_eq!(ctx.div(d("2"), d("3")), Some(d("0.6667")));
    }

    #[test]
    fn sums_are_rounded_after_each_step() {
        let ctx = DecimalContext::default();
        let mut acc = Decimal::ZERO;
        for _ in 0..3 {
            acc = ctx.add(acc, d("0.3333")).unwrap();
        }
        assert_eq!(acc, d("0.9999"));
        assert_eq!(ctx.add(d("1.000"), d("0.00004")).unwrap(), d("1.000"));
    }

    #[test]
    fn values_beyond_28_places_keep_what_fits() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.round(Decimal::new(1, 27)), Decimal::new(1, 27));
        assert_eq!(ctx.round(Decimal::new(-3, 28)), Decimal::new(-3, 28));
        assert_eq!(ctx.round(Decimal::new(12345, 28)), Decimal::new(1235, 27));
        assert_eq!(
            ctx.mul_prob(Decimal::new(2, 14), Decimal::new(3, 14)),
            Decimal::new(6, 28)
        );
        assert_eq!(ctx.div(Decimal::new(1, 27), Decimal::from(3)), Some(Decimal::new(3, 28)));

        let wide = DecimalContext::new(28).unwrap();
        assert_eq!(wide.round(d("0.5")), d("0.5"));
        assert_eq!(wide.round(Decimal::new(1, 27)), Decimal::new(1, 27));
    }

    #[test]
    fn overflow_is_an_error_not_a_saturation() {
        let ctx = DecimalContext::default();
        assert!(matches!(
            ctx.add(Decimal::MAX, Decimal::ONE),
            Err(AlignError::NumericOverflow(_))
        ));
        assert!(matches!(
            ctx.mul(Decimal::MAX, Decimal::TWO),
            Err(AlignError::NumericOverflow(_))
        ));
    }

    #[test]
    fn division_by_zero_is_none() {
        let ctx = DecimalContext::default();
        assert_eq!(ctx.div(Decimal::ONE, Decimal::ZERO), None);
        assert_eq!(ctx.reciprocal(0), None);
    }

    #[test]
    fn precision_is_validated() {
        assert!(DecimalContext::new(0).is_err());
        assert!(DecimalContext::new(29).is_err());
        assert_eq!(DecimalContext::new(6).unwrap().digits(), 6);
    }
}
