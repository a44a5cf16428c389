use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dated, signed amount. Used for cash flows, asset valuations and incomes alike.
///
/// Flows are positive when money enters the portfolio and negative when it is withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateAmount {
    pub date: NaiveDate,
    pub amount: Decimal,
}

impl DateAmount {
    pub fn new(date: NaiveDate, amount: Decimal) -> Self {
        Self { date, amount }
    }
}

impl From<(NaiveDate, Decimal)> for DateAmount {
    fn from((date, amount): (NaiveDate, Decimal)) -> Self {
        Self { date, amount }
    }
}
