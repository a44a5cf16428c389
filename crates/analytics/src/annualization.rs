//! Scaling of a cumulative return to a one-year-equivalent rate.

use chrono::NaiveDate;
use core_types::AnnualizationOption;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;

const DAYS_PER_YEAR: f64 = 365.0;

/// Annualizes `cumulative_return` earned between `start_date_incl` and `end_date_incl`.
///
/// With `AnnualizeIfOverOneYear` the return is left untouched unless the dates lie more
/// than 365 days apart; longer spans are scaled as `(1 + r)^(1 / years) - 1` with
/// `years = days / 365`. The power is evaluated in binary floating point and brought
/// back through its shortest decimal representation, so results are reproducible
/// bit for bit (`1.0` over 2020-02-28..2021-02-28 gives `0.9962158948735884`).
///
/// A cumulative loss of 100% or more annualizes to `-1`.
pub fn annualize(
    option: AnnualizationOption,
    cumulative_return: Decimal,
    start_date_incl: NaiveDate,
    end_date_incl: NaiveDate,
) -> Decimal {
    match option {
        AnnualizationOption::DoNotAnnualize => cumulative_return,
        AnnualizationOption::AnnualizeIfOverOneYear => {
            let days = (end_date_incl - start_date_incl).num_days();
            if days <= 365 {
                return cumulative_return;
            }
            let Some(base) = Decimal::ONE.checked_add(cumulative_return) else {
                tracing::warn!(%cumulative_return, days, "Growth factor is not representable, keeping cumulative return.");
                return cumulative_return;
            };
            if base <= Decimal::ZERO {
                return Decimal::NEGATIVE_ONE;
            }

            let years = days as f64 / DAYS_PER_YEAR;
            let annualized = to_f64(base).powf(1.0 / years) - 1.0;
            from_f64(annualized).unwrap_or_else(|| {
                tracing::warn!(
                    %cumulative_return, days,
                    "Annualized return is not representable, keeping cumulative return."
                );
                cumulative_return
            })
        }
    }
}

// Decimal -> f64 through text, which rounds correctly.
fn to_f64(value: Decimal) -> f64 {
    value
        .to_string()
        .parse::<f64>()
        .ok()
        .or_else(|| value.to_f64())
        .unwrap_or(f64::NAN)
}

fn from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn over_one_year_across_leap_day() {
        let r = annualize(
            AnnualizationOption::AnnualizeIfOverOneYear,
            dec!(1.0),
            date(2020, 2, 28),
            date(2021, 2, 28),
        );
        assert_eq!(r, dec!(0.9962158948735884));
        assert_eq!(r.to_string(), "0.9962158948735884");
    }

    #[test]
    fn full_calendar_year_is_unchanged() {
        let r = annualize(
            AnnualizationOption::AnnualizeIfOverOneYear,
            dec!(1.0),
            date(2021, 1, 1),
            date(2021, 12, 31),
        );
        assert_eq!(r, dec!(1.0));
    }

    #[test]
    fn spans_up_to_365_days_are_fixed_points() {
        let start = date(2019, 3, 1);
        for days in [0_u64, 1, 30, 180, 364, 365] {
            let end = start + chrono::Days::new(days);
            let r = annualize(AnnualizationOption::AnnualizeIfOverOneYear, dec!(0.123), start, end);
            assert_eq!(r, dec!(0.123), "span of {days} days");
        }
    }

    #[test]
    fn two_years_is_a_square_root() {
        let r = annualize(
            AnnualizationOption::AnnualizeIfOverOneYear,
            dec!(0.21),
            date(2021, 1, 1),
            date(2022, 12, 31) + chrono::Days::new(1),
        );
        assert!((r - dec!(0.1)).abs() < dec!(0.000000001));
    }

    #[test]
    fn do_not_annualize_returns_input() {
        let r = annualize(
            AnnualizationOption::DoNotAnnualize,
            dec!(3),
            date(2000, 1, 1),
            date(2020, 1, 1),
        );
        assert_eq!(r, dec!(3));
    }

    #[test]
    fn total_loss_stays_total_loss() {
        let r = annualize(
            AnnualizationOption::AnnualizeIfOverOneYear,
            dec!(-1),
            date(2018, 1, 1),
            date(2021, 1, 1),
        );
        assert_eq!(r, dec!(-1));
    }

    #[test]
    fn unrepresentable_growth_keeps_the_cumulative_return() {
        let r = annualize(
            AnnualizationOption::AnnualizeIfOverOneYear,
            Decimal::MAX,
            date(2018, 1, 1),
            date(2021, 1, 1),
        );
        assert_eq!(r, Decimal::MAX);
    }
}
