use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};

/// Decimal places used for every persisted price quantity (changes, gaps, ranges).
pub const PRICE_DECIMALS: u32 = 3;

/// Decimal places used for persisted percentages.
pub const PERCENT_DECIMALS: u32 = 4;

/// Rounds `value` half-up (away from zero on ties) to `places` decimal places.
///
/// The float is converted with its exact binary expansion, so a literal such as `1.0005`
/// (stored as `1.000499999...`) rounds down, the same way a decimal library fed the raw
/// float would. Non-finite values are returned unchanged.
pub fn round_half_up(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    let decimal = Decimal::from_f64_retain(value).or_else(|| Decimal::from_f64(value));
    match decimal {
        Some(d) => d
            .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or(value),
        None => value,
    }
}

/// Rounds a price quantity to [`PRICE_DECIMALS`].
pub fn round_price(value: f64) -> f64 {
    round_half_up(value, PRICE_DECIMALS)
}

/// Rounds a percentage to [`PERCENT_DECIMALS`].
pub fn round_percent(value: f64) -> f64 {
    round_half_up(value, PERCENT_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up_ties_go_away_from_zero() {
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(-2.5, 0), -3.0);
        assert_eq!(round_half_up(0.125, 2), 0.13);
        assert_eq!(round_half_up(-0.125, 2), -0.13);
    }

    #[test]
    fn test_round_half_up_uses_binary_expansion() {
        // 1.0005 is stored as 1.000499999..., so it must not round up.
        assert_eq!(round_half_up(1.0005, 3), 1.0);
        // 0.0625 is exact in binary and is a true tie.
        assert_eq!(round_half_up(0.0625, 3), 0.063);
    }

    #[test]
    fn test_round_price_and_percent() {
        assert_eq!(round_price(101.5 - 100.0), 1.5);
        assert_eq!(round_price(100.0 - 100.0), 0.0);
        assert!((round_percent(100.0 * 2.0 / 3.0) - 66.6667).abs() < 1e-9);
        assert!((round_percent(100.0 / 3.0) - 33.3333).abs() < 1e-9);
    }

    #[test]
    fn test_round_half_up_non_finite_passthrough() {
        assert!(round_half_up(f64::NAN, 3).is_nan());
        assert_eq!(round_half_up(f64::INFINITY, 3), f64::INFINITY);
    }
}
