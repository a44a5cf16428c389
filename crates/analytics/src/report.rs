use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of a multi-period analysis, covering a single result period.
///
/// Returns are fractions, or percentages when the request asks for them, and are
/// rounded to the request's result scale. Money amounts use the same scale.
/// Metrics that were not switched on in the request are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfAnalysis {
    // Period
    pub period_start_date_incl: NaiveDate,
    pub period_end_date_incl: NaiveDate,
    pub period_caption: String,
    pub period_start_asset_value_excl: Decimal,
    pub period_end_asset_value_incl: Decimal,
    pub period_flow: Decimal,

    // Time-weighted returns
    pub period_twr: Decimal,
    pub cumulative_twr: Decimal,
    pub annualized_twr: Decimal,

    // Money-weighted returns
    pub period_mwr: Option<Decimal>,
    pub cumulative_mwr: Option<Decimal>,
    pub annualized_mwr: Option<Decimal>,

    // Profit and loss
    pub total_contribution: Decimal,
    pub period_profit: Decimal,
    pub total_profit: Decimal,
    pub period_income: Option<Decimal>,

    // Trailing averages over the rows of the last year
    pub trailing_avg_profit_1y: Option<Decimal>,
    pub trailing_avg_flow_1y: Option<Decimal>,
    pub trailing_avg_income_1y: Option<Decimal>,

    // Trailing TWR, annualized over the trailing window
    pub trailing_twr_1y: Option<Decimal>,
    pub trailing_twr_2y: Option<Decimal>,
    pub trailing_twr_3y: Option<Decimal>,
    pub trailing_twr_5y: Option<Decimal>,
    pub trailing_twr_10y: Option<Decimal>,
}

impl PerfAnalysis {
    /// The trailing TWR for a window of `years`, if that window is tracked.
    pub fn trailing_twr(&self, years: u32) -> Option<Decimal> {
        match years {
            1 => self.trailing_twr_1y,
            2 => self.trailing_twr_2y,
            3 => self.trailing_twr_3y,
            5 => self.trailing_twr_5y,
            10 => self.trailing_twr_10y,
            _ => None,
        }
    }

    pub(crate) fn set_trailing_twr(&mut self, years: u32, value: Decimal) {
        let slot = match years {
            1 => &mut self.trailing_twr_1y,
            2 => &mut self.trailing_twr_2y,
            3 => &mut self.trailing_twr_3y,
            5 => &mut self.trailing_twr_5y,
            10 => &mut self.trailing_twr_10y,
            _ => return,
        };
        *slot = Some(value);
    }
}
