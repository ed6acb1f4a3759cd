//! Exact rounding helpers shared by the aggregate and matching code.
//!
//! Everything here rounds half away from zero, so 2.25 becomes 2.3 and
//! -2.25 becomes -2.3.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to one fractional digit.
pub fn one_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole * 100`, rounded to one fractional digit. `whole` must be non-zero.
pub fn percent_of(part: i64, whole: i64) -> Decimal {
    one_decimal(Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole))
}

/// `numerator / denominator` rounded to the nearest integer. `denominator` must be positive.
pub fn div_round(numerator: i128, denominator: i128) -> i128 {
    let magnitude = (numerator.abs() * 2 + denominator) / (denominator * 2);
    if numerator < 0 {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_one_decimal_midpoint() {
        assert_eq!(one_decimal(dec!(2.25)), dec!(2.3));
        assert_eq!(one_decimal(dec!(2.24)), dec!(2.2));
        assert_eq!(one_decimal(dec!(-2.25)), dec!(-2.3));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(1, 2), dec!(50.0));
        assert_eq!(percent_of(2, 3), dec!(66.7));
        assert_eq!(percent_of(1000, 1200), dec!(83.3));
        assert_eq!(percent_of(3, 3), dec!(100));
    }

    #[test]
    fn test_div_round() {
        assert_eq!(div_round(10, 4), 3); // 2.5
        assert_eq!(div_round(9, 4), 2); // 2.25
        assert_eq!(div_round(11, 4), 3); // 2.75
        assert_eq!(div_round(-10, 4), -3);
        assert_eq!(div_round(4000, 4), 1000);
    }
}
