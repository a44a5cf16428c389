use super::{ReturnCalculator, modified_dietz};
use crate::error::AnalyticsError;
use crate::math::{HUNDRED, chain, checked};
use crate::request::PerfCalcRequest;
use crate::series::day_before;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

/// Time-weighted return approximated by linking Modified Dietz sub-period returns.
///
/// Only the valuation samples are used as chaining points, so coarse data (month end
/// marks, say) is enough; flows between two marks are weighted by the days they were
/// invested. A flow larger than `large_flow_level_in_percent` of the running base
/// forces an extra cut at its timing boundary to bound the approximation error.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkedModifiedDietzTwrCalculator;

impl ReturnCalculator for LinkedModifiedDietzTwrCalculator {
    fn raw_return(&self, request: &PerfCalcRequest) -> Result<Decimal, AnalyticsError> {
        let scale = request.calc_scale();
        let before_start = day_before(request.start_date_incl())?;
        let end = request.end_date_incl();

        let mut marks = request
            .asset_values()
            .sample_dates(request.start_date_incl(), end);
        marks.retain(|d| *d < end);
        marks.push(end);

        let mut returns = Vec::with_capacity(marks.len());
        let mut previous = before_start;
        let mut previous_value = request.start_asset_value_excl();
        for mark in marks {
            let value = if mark == end {
                request.end_asset_value_incl()
            } else {
                request.asset_value(mark).unwrap_or(previous_value)
            };
            let (cut, cut_value) = split_at_large_flows(request, previous, previous_value, mark)?;
            if cut != previous {
                tracing::debug!(%previous, %cut, %mark, "Large flow, sub-period split.");
            }
            returns.push(modified_dietz(
                cut_value,
                value,
                flows_in(request, cut, mark),
                cut,
                mark,
                request.flow_timing(),
                scale,
            )?);

            previous = mark;
            previous_value = value;
        }

        chain(returns, scale)
    }
}

/// Walks the flows of `(after, to]` and moves the sub-period start past every large
/// flow. The skipped stretch has no valuation, so it earns nothing: the new start
/// value is the old one plus the flows passed over. Returns the new start and value.
fn split_at_large_flows(
    request: &PerfCalcRequest,
    after: NaiveDate,
    value: Decimal,
    to: NaiveDate,
) -> Result<(NaiveDate, Decimal), AnalyticsError> {
    let mut cut = after;
    let mut cut_value = value;
    for (date, amount) in flows_in(request, after, to) {
        let boundary = request.flow_timing().boundary_before(date);
        if boundary <= cut || boundary >= to {
            continue;
        }
        if is_large(amount, cut_value, request.large_flow_level_in_percent()) {
            let passed_over = request.flow_between(cut + Days::new(1), boundary);
            cut_value = checked(cut_value.checked_add(passed_over), "large flow split")?;
            cut = boundary;
        }
    }
    Ok((cut, cut_value))
}

fn is_large(amount: Decimal, base: Decimal, level_in_percent: Decimal) -> bool {
    if amount.is_zero() {
        return false;
    }
    if base.is_zero() {
        return true;
    }
    // A flow too big to scale is large; a limit too big to compute is never reached.
    match amount.abs().checked_mul(HUNDRED) {
        Some(scaled) => level_in_percent
            .checked_mul(base.abs())
            .is_some_and(|limit| scaled > limit),
        None => true,
    }
}

fn flows_in(
    request: &PerfCalcRequest,
    after: NaiveDate,
    to: NaiveDate,
) -> Vec<(NaiveDate, Decimal)> {
    request
        .flows()
        .range(after + Days::new(1)..=to)
        .map(|(d, v)| (*d, *v))
        .collect()
}
