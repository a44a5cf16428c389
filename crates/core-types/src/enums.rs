use crate::error::CoreError;
use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a flow dated D happens before or after that day's valuation movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowTiming {
    /// The flow is invested before the day's return is measured.
    #[default]
    BeginningOfDay,
    /// The flow arrives after the day's return has been measured.
    EndOfDay,
}

impl FlowTiming {
    /// The last date whose closing valuation does not yet contain a flow dated `flow_date`.
    pub fn boundary_before(&self, flow_date: NaiveDate) -> NaiveDate {
        match self {
            FlowTiming::BeginningOfDay => flow_date - Days::new(1),
            FlowTiming::EndOfDay => flow_date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnualizationOption {
    #[default]
    DoNotAnnualize,
    AnnualizeIfOverOneYear,
}

/// Calendar unit used to lay out the result grid of a multi-period analysis.
///
/// `Day` is only used internally for edge adjustments; multi-period requests
/// reject it as a result unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodUnit {
    Day,
    #[default]
    Month,
    Quarter,
    Year,
}

impl PeriodUnit {
    /// The first date of the unit containing `date`.
    pub fn floor(&self, date: NaiveDate) -> NaiveDate {
        let first = match self {
            PeriodUnit::Day => Some(date),
            PeriodUnit::Month => date.with_day(1),
            PeriodUnit::Quarter => NaiveDate::from_ymd_opt(date.year(), date.month0() / 3 * 3 + 1, 1),
            PeriodUnit::Year => date.with_ordinal(1),
        };
        first.unwrap_or(date)
    }

    /// The last date of the unit containing `date`.
    pub fn ceil(&self, date: NaiveDate) -> NaiveDate {
        let months = match self {
            PeriodUnit::Day => return date,
            PeriodUnit::Month => 1,
            PeriodUnit::Quarter => 3,
            PeriodUnit::Year => 12,
        };
        self.floor(date)
            .checked_add_months(Months::new(months))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// A short label for the unit containing `date`, e.g. `2021-03`, `2021-Q1` or `2021`.
    pub fn caption(&self, date: NaiveDate) -> String {
        match self {
            PeriodUnit::Day => date.format("%Y-%m-%d").to_string(),
            PeriodUnit::Month => date.format("%Y-%m").to_string(),
            PeriodUnit::Quarter => format!("{}-Q{}", date.year(), date.month0() / 3 + 1),
            PeriodUnit::Year => date.year().to_string(),
        }
    }
}

impl FromStr for PeriodUnit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "DAY" => Ok(PeriodUnit::Day),
            "MONTH" => Ok(PeriodUnit::Month),
            "QUARTER" => Ok(PeriodUnit::Quarter),
            "YEAR" => Ok(PeriodUnit::Year),
            _ => Err(CoreError::InvalidInput("period unit".to_string(), s.to_string())),
        }
    }
}

/// Rounding applied when a result is reduced to its final scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundingMode {
    #[default]
    HalfUp,
    HalfDown,
    HalfEven,
    Up,
    Down,
    Ceiling,
    Floor,
}

impl RoundingMode {
    pub fn strategy(&self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
            RoundingMode::Ceiling => RoundingStrategy::ToPositiveInfinity,
            RoundingMode::Floor => RoundingStrategy::ToNegativeInfinity,
        }
    }
}

/// Identifies one of the built-in return calculators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculatorType {
    TrueTwr,
    LinkedModifiedDietzTwr,
    ModifiedDietzMwr,
    SimpleReturn,
}

impl CalculatorType {
    pub fn name(&self) -> &'static str {
        match self {
            CalculatorType::TrueTwr => "TRUE_TWR",
            CalculatorType::LinkedModifiedDietzTwr => "LINKED_MODIFIED_DIETZ_TWR",
            CalculatorType::ModifiedDietzMwr => "MODIFIED_DIETZ_MWR",
            CalculatorType::SimpleReturn => "SIMPLE_RETURN",
        }
    }
}

impl fmt::Display for CalculatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CalculatorType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_token(s).as_str() {
            "TRUE_TWR" => Ok(CalculatorType::TrueTwr),
            "LINKED_MODIFIED_DIETZ_TWR" => Ok(CalculatorType::LinkedModifiedDietzTwr),
            "MODIFIED_DIETZ_MWR" => Ok(CalculatorType::ModifiedDietzMwr),
            "SIMPLE_RETURN" => Ok(CalculatorType::SimpleReturn),
            _ => Err(CoreError::UnsupportedCalculator(s.to_string())),
        }
    }
}

fn normalize_token(s: &str) -> String {
    s.trim().to_ascii_uppercase().replace(['-', ' '], "_")
}
