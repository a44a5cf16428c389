//! Decimal helpers shared by the calculators and the analyzer.

use crate::error::AnalyticsError;
use core_types::RoundingMode;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub(crate) const HUNDRED: Decimal = dec!(100);

/// Turns the `None` of a checked `Decimal` operation into a calculation error.
pub(crate) fn checked(value: Option<Decimal>, operation: &str) -> Result<Decimal, AnalyticsError> {
    value.ok_or_else(|| AnalyticsError::Calculation(format!("decimal overflow in {operation}")))
}

/// `numerator / denominator` rounded to `scale`, or `None` when the denominator is zero.
/// A quotient beyond the `Decimal` range is an error.
pub(crate) fn ratio(numerator: Decimal, denominator: Decimal, scale: u32) -> Result<Option<Decimal>, AnalyticsError> {
    if denominator.is_zero() {
        return Ok(None);
    }
    let quotient = checked(numerator.checked_div(denominator), "division")?;
    Ok(Some(quotient.round_dp(scale)))
}

/// Geometric chaining of sub-period returns: `prod(1 + r_i) - 1`.
pub(crate) fn chain<I>(returns: I, scale: u32) -> Result<Decimal, AnalyticsError>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut growth = Decimal::ONE;
    for r in returns {
        let factor = checked(Decimal::ONE.checked_add(r), "return chaining")?;
        growth = checked(growth.checked_mul(factor), "return chaining")?.round_dp(scale);
    }
    checked(growth.checked_sub(Decimal::ONE), "return chaining")
}

/// Rounds to exactly `scale` fraction digits, padding with zeros where needed.
pub fn round_to_scale(value: Decimal, scale: u32, mode: RoundingMode) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, mode.strategy());
    rounded.rescale(scale);
    rounded
}

/// Arithmetic mean, zero for an empty input.
pub(crate) fn mean(values: &[Decimal], scale: u32) -> Result<Decimal, AnalyticsError> {
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| checked(acc.checked_add(*v), "mean"))?;
    Ok(ratio(sum, Decimal::from(values.len()), scale)?.unwrap_or(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_with_zero_denominator_is_none() {
        assert_eq!(ratio(dec!(1), Decimal::ZERO, 10), Ok(None));
        assert_eq!(ratio(dec!(1), dec!(3), 4), Ok(Some(dec!(0.3333))));
    }

    #[test]
    fn ratio_out_of_range_is_an_error() {
        assert!(matches!(ratio(Decimal::MAX, dec!(0.1), 10), Err(AnalyticsError::Calculation(_))));
    }

    #[test]
    fn chaining_is_geometric() {
        assert_eq!(chain([dec!(0.1), dec!(0.1)], 20), Ok(dec!(0.21)));
        assert_eq!(chain(Vec::new(), 20), Ok(Decimal::ZERO));
    }

    #[test]
    fn chaining_out_of_range_is_an_error() {
        let huge = Decimal::from(1_000_000_000_000_000_i64);
        assert!(matches!(chain([huge, huge], 20), Err(AnalyticsError::Calculation(_))));
        assert!(matches!(chain([Decimal::MAX], 20), Err(AnalyticsError::Calculation(_))));
    }

    #[test]
    fn round_to_scale_pads_and_honours_mode() {
        assert_eq!(round_to_scale(dec!(0.5), 2, RoundingMode::HalfUp).to_string(), "0.50");
        assert_eq!(round_to_scale(dec!(0.125), 2, RoundingMode::HalfUp).to_string(), "0.13");
        assert_eq!(round_to_scale(dec!(0.125), 2, RoundingMode::HalfEven).to_string(), "0.12");
        assert_eq!(round_to_scale(dec!(-0.125), 2, RoundingMode::Floor).to_string(), "-0.13");
    }

    #[test]
    fn mean_of_values() {
        assert_eq!(mean(&[dec!(1), dec!(2), dec!(6)], 6), Ok(dec!(3)));
        assert_eq!(mean(&[], 6), Ok(Decimal::ZERO));
        assert!(mean(&[Decimal::MAX, Decimal::MAX], 6).is_err());
    }
}
