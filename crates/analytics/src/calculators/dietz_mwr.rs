use super::{ReturnCalculator, modified_dietz};
use crate::error::AnalyticsError;
use crate::request::PerfCalcRequest;
use crate::series::day_before;
use rust_decimal::Decimal;

/// Money-weighted return: one Modified Dietz evaluation across the whole period.
///
/// Intra-period valuations are ignored and no chaining takes place, so the result is
/// deliberately sensitive to the size and timing of the flows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModifiedDietzMwrCalculator;

impl ReturnCalculator for ModifiedDietzMwrCalculator {
    fn raw_return(&self, request: &PerfCalcRequest) -> Result<Decimal, AnalyticsError> {
        let before_start = day_before(request.start_date_incl())?;
        modified_dietz(
            request.start_asset_value_excl(),
            request.end_asset_value_incl(),
            request.flows().iter().map(|(d, v)| (*d, *v)),
            before_start,
            request.end_date_incl(),
            request.flow_timing(),
            request.calc_scale(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::FlowTiming;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request(timing: FlowTiming) -> PerfCalcRequest {
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 21), dec!(300));
        let mut values = BTreeMap::new();
        values.insert(date(2021, 1, 10), dec!(99999));
        PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 30))
            .start_asset_value_excl(dec!(1000))
            .end_asset_value_incl(dec!(1400))
            .asset_values(values)
            .flows(flows)
            .flow_timing(timing)
            .build()
            .unwrap()
    }

    #[test]
    fn beginning_of_day_flow_weight() {
        // 300 invested for 10 of 30 days.
        let r = ModifiedDietzMwrCalculator.calculate_return(&request(FlowTiming::BeginningOfDay)).unwrap();
        assert_eq!(r, dec!(0.090909));
    }

    #[test]
    fn end_of_day_flow_weight() {
        // 300 invested for 9 of 30 days.
        let r = ModifiedDietzMwrCalculator.calculate_return(&request(FlowTiming::EndOfDay)).unwrap();
        assert_eq!(r, dec!(0.091743));
    }

    #[test]
    fn zero_start_and_offsetting_flows() {
        let mut flows = BTreeMap::new();
        flows.insert(date(2021, 1, 1), dec!(500));
        flows.insert(date(2021, 1, 31), dec!(-500));
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .flows(flows)
            .flow_timing(FlowTiming::EndOfDay)
            .build()
            .unwrap();
        let r = ModifiedDietzMwrCalculator.calculate_return(&req).unwrap();
        assert_eq!(r, Decimal::ZERO);
    }
}
