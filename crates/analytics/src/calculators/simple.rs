use super::ReturnCalculator;
use crate::error::AnalyticsError;
use crate::math::{checked, ratio};
use crate::request::PerfCalcRequest;
use rust_decimal::Decimal;

/// Naive baseline: `(end - start - net flow) / start`, ignoring flow timing and
/// intra-period valuations.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleReturnCalculator;

impl ReturnCalculator for SimpleReturnCalculator {
    fn raw_return(&self, request: &PerfCalcRequest) -> Result<Decimal, AnalyticsError> {
        let start_value = request.start_asset_value_excl();
        let gain = checked(
            request
                .end_asset_value_incl()
                .checked_sub(start_value)
                .and_then(|change| change.checked_sub(request.net_flow())),
            "simple return gain",
        )?;

        Ok(ratio(gain, start_value, request.calc_scale())?.unwrap_or_else(|| {
            tracing::debug!(%gain, "Simple return on a zero starting base, defined as zero.");
            Decimal::ZERO
        }))
    }
}
