use super::ReturnCalculator;
use crate::error::AnalyticsError;
use crate::math::{chain, checked, ratio};
use crate::request::PerfCalcRequest;
use crate::series::day_before;
use chrono::{Days, NaiveDate};
use core_types::FlowTiming;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Time-weighted return chained over every valuation sample and every flow.
///
/// The period is cut at each valuation date and at each flow's timing boundary
/// (the day before a beginning of day flow, the day of an end of day flow). The
/// sub-period returns are then linked geometrically, which removes the effect of
/// the flows on the result.
///
/// A boundary without a valuation sample is valued at the previous boundary value
/// plus the flows in between, i.e. that sub-period earns nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrueTwrCalculator;

impl ReturnCalculator for TrueTwrCalculator {
    fn raw_return(&self, request: &PerfCalcRequest) -> Result<Decimal, AnalyticsError> {
        let scale = request.calc_scale();
        let timing = request.flow_timing();
        let before_start = day_before(request.start_date_incl())?;
        let end = request.end_date_incl();

        let boundaries = boundaries(request, before_start);
        tracing::debug!(
            start = %request.start_date_incl(),
            %end,
            sub_periods = boundaries.len(),
            "True TWR decomposition."
        );

        let mut returns = Vec::with_capacity(boundaries.len());
        let mut previous = before_start;
        let mut previous_value = request.start_asset_value_excl();
        for boundary in boundaries {
            let flow = request.flow_between(previous + Days::new(1), boundary);
            let carried = checked(previous_value.checked_add(flow), "True TWR carried value")?;
            let value = if boundary == end {
                request.end_asset_value_incl()
            } else {
                request.asset_value(boundary).unwrap_or(carried)
            };

            let (numerator, denominator) = match timing {
                FlowTiming::BeginningOfDay => (value, carried),
                FlowTiming::EndOfDay => (checked(value.checked_sub(flow), "True TWR closing value")?, previous_value),
            };
            let sub_return = match ratio(numerator, denominator, scale)? {
                Some(growth) => checked(growth.checked_sub(Decimal::ONE), "True TWR sub-period return")?,
                None => {
                    tracing::debug!(%previous, %boundary, "Zero base value, sub-period return is zero.");
                    Decimal::ZERO
                }
            };
            returns.push(sub_return);

            previous = boundary;
            previous_value = value;
        }

        chain(returns, scale)
    }
}

/// Sub-period end dates in ascending order; the last one is always the period end.
fn boundaries(request: &PerfCalcRequest, before_start: NaiveDate) -> BTreeSet<NaiveDate> {
    let end = request.end_date_incl();
    let mut boundaries: BTreeSet<NaiveDate> = request
        .asset_values()
        .sample_dates(request.start_date_incl(), end)
        .into_iter()
        .collect();
    for (date, amount) in request.flows() {
        if amount.is_zero() {
            continue;
        }
        let boundary = request.flow_timing().boundary_before(*date);
        if boundary > before_start {
            boundaries.insert(boundary);
        }
    }
    boundaries.insert(end);
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn flows_are_not_performance() {
        // 1000 grows 10%, then 500 is added at the start of the next day and the
        // whole 1600 stays flat.
        let mut values = BTreeMap::new();
        values.insert(date(2021, 1, 15), dec!(1100));
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 16), dec!(500));
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .start_asset_value_excl(dec!(1000))
            .end_asset_value_incl(dec!(1600))
            .asset_values(values)
            .flows(flows)
            .build()
            .unwrap();
        assert_eq!(TrueTwrCalculator.calculate_return(&req).unwrap(), dec!(0.1));
    }

    #[test]
    fn end_of_day_flow_is_taken_out_of_the_closing_value() {
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 31), dec!(-200));
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .start_asset_value_excl(dec!(1000))
            .end_asset_value_incl(dec!(900))
            .flows(flows)
            .flow_timing(FlowTiming::EndOfDay)
            .build()
            .unwrap();
        assert_eq!(TrueTwrCalculator.calculate_return(&req).unwrap(), dec!(0.1));
    }

    #[test]
    fn missing_valuation_at_flow_boundary_earns_nothing() {
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 16), dec!(1000));
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .start_asset_value_excl(dec!(1000))
            .end_asset_value_incl(dec!(2200))
            .flows(flows)
            .build()
            .unwrap();
        // Before the flow: 1000 -> 1000 (no sample). After: 2000 -> 2200.
        assert_eq!(TrueTwrCalculator.calculate_return(&req).unwrap(), dec!(0.1));
    }

    #[test]
    fn investment_from_zero() {
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 10), dec!(1000));
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .end_asset_value_incl(dec!(1050))
            .flows(flows)
            .build()
            .unwrap();
        assert_eq!(TrueTwrCalculator.calculate_return(&req).unwrap(), dec!(0.05));
    }

    #[test]
    fn liquidation_to_zero() {
        let mut values = BTreeMap::new();
        values.insert(date(2021, 1, 19), dec!(1200));
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 20), dec!(-1200));
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .start_asset_value_excl(dec!(1000))
            .end_asset_value_incl(Decimal::ZERO)
            .asset_values(values)
            .flows(flows)
            .build()
            .unwrap();
        assert_eq!(TrueTwrCalculator.calculate_return(&req).unwrap(), dec!(0.2));
    }

    #[test]
    fn zero_amount_flows_do_not_split() {
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 16), Decimal::ZERO);
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .start_asset_value_excl(dec!(1000))
            .end_asset_value_incl(dec!(1100))
            .flows(flows)
            .build()
            .unwrap();
        assert_eq!(boundaries(&req, date(2020, 12, 31)).len(), 1);
    }

    #[test]
    fn growth_beyond_the_decimal_range_is_an_error() {
        let mut values = BTreeMap::new();
        values.insert(date(2021, 1, 10), Decimal::from_scientific("1e10").unwrap());
        values.insert(date(2021, 1, 20), Decimal::from_scientific("1e20").unwrap());
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .start_asset_value_excl(dec!(0.00000001))
            .end_asset_value_incl(Decimal::from_scientific("1e27").unwrap())
            .asset_values(values)
            .build()
            .unwrap();
        let result = TrueTwrCalculator.calculate_return(&req);
        assert!(matches!(result, Err(AnalyticsError::Calculation(_))), "{result:?}");
    }
}
