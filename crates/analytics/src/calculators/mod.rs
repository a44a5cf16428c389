//! The return calculators.
//!
//! Every calculator is a stateless unit struct implementing [`ReturnCalculator`]; they
//! can be shared freely between threads. Adding a calculator means creating a module
//! here, implementing the trait, and registering a `CalculatorType` in the factory.

use crate::error::AnalyticsError;
use crate::math::{checked, ratio};
use crate::request::PerfCalcRequest;
use chrono::NaiveDate;
use core_types::FlowTiming;
use rust_decimal::Decimal;
use std::fmt;

pub mod dietz_mwr;
pub mod linked_dietz;
pub mod simple;
pub mod true_twr;

pub use dietz_mwr::ModifiedDietzMwrCalculator;
pub use linked_dietz::LinkedModifiedDietzTwrCalculator;
pub use simple::SimpleReturnCalculator;
pub use true_twr::TrueTwrCalculator;

/// A pure function from a single-period request to a return.
pub trait ReturnCalculator: fmt::Debug + Send + Sync {
    /// The cumulative return over the whole request period as a plain fraction,
    /// computed at the request's calculation scale and neither annualized nor rounded
    /// to the result scale.
    fn raw_return(&self, request: &PerfCalcRequest) -> Result<Decimal, AnalyticsError>;

    /// The return as requested: annualized per the request option, optionally in
    /// percent, rounded to the result scale.
    fn calculate_return(&self, request: &PerfCalcRequest) -> Result<Decimal, AnalyticsError> {
        let raw = self.raw_return(request)?;
        request.finalize_return(raw)
    }
}

/// Modified Dietz return over the sub-period `(after, to]`.
///
/// Each flow is weighted by the share of whole days it was invested: a beginning of
/// day flow dated D is invested for `to - D + 1` days, an end of day flow for `to - D`.
/// A zero denominator yields a zero return.
pub(crate) fn modified_dietz<I>(
    value_before: Decimal,
    value_after: Decimal,
    flows: I,
    after: NaiveDate,
    to: NaiveDate,
    timing: FlowTiming,
    scale: u32,
) -> Result<Decimal, AnalyticsError>
where
    I: IntoIterator<Item = (NaiveDate, Decimal)>,
{
    let period_days = (to - after).num_days();
    let mut net_flow = Decimal::ZERO;
    let mut weighted_flow_days = Decimal::ZERO;
    for (date, amount) in flows {
        let invested_days = match timing {
            FlowTiming::BeginningOfDay => (to - date).num_days() + 1,
            FlowTiming::EndOfDay => (to - date).num_days(),
        };
        net_flow = checked(net_flow.checked_add(amount), "Modified Dietz net flow")?;
        let weighted = checked(amount.checked_mul(Decimal::from(invested_days)), "Modified Dietz flow weight")?;
        weighted_flow_days = checked(weighted_flow_days.checked_add(weighted), "Modified Dietz flow weight")?;
    }
    let weighted_flow = ratio(weighted_flow_days, Decimal::from(period_days), scale)?.unwrap_or(Decimal::ZERO);
    let gain = checked(
        value_after
            .checked_sub(value_before)
            .and_then(|change| change.checked_sub(net_flow)),
        "Modified Dietz gain",
    )?;
    let base = checked(value_before.checked_add(weighted_flow), "Modified Dietz base")?;

    Ok(ratio(gain, base, scale)?.unwrap_or_else(|| {
        tracing::debug!(%after, %to, %gain, "Modified Dietz base is zero, return defined as zero.");
        Decimal::ZERO
    }))
}
