//! Decimal arithmetic utilities for price and size calculations.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse an exchange decimal string ("65000.5"), tolerating surrounding whitespace.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    Decimal::from_str(value.trim()).ok()
}

/// Relative change from `base` to `current`: `(current - base) / base`.
///
/// `None` when `base` is zero.
pub fn relative_change(current: Decimal, base: Decimal) -> Option<Decimal> {
    (current - base).checked_div(base)
}

/// Truncate toward zero to `decimals` places (quantity precision).
pub fn truncate_to_precision(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("65000.5"), Some(dec!(65000.5)));
        assert_eq!(parse_decimal(" 98 "), Some(dec!(98)));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("1,000"), None);
    }

    #[test]
    fn test_relative_change() {
        assert_eq!(relative_change(dec!(98), dec!(100)), Some(dec!(-0.02)));
        assert_eq!(relative_change(dec!(101), dec!(100)), Some(dec!(0.01)));
        assert_eq!(relative_change(dec!(1), Decimal::ZERO), None);
    }

    #[test]
    fn test_truncate_to_precision() {
        assert_eq!(truncate_to_precision(dec!(1.5679), 3), dec!(1.567));
        assert_eq!(truncate_to_precision(dec!(0.0019), 3), dec!(0.001));
        assert_eq!(truncate_to_precision(dec!(2), 3), dec!(2));
    }
}
