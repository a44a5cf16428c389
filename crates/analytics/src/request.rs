use crate::annualization::annualize;
use crate::error::AnalyticsError;
use crate::math::{HUNDRED, checked, round_to_scale};
use crate::series::{AssetValueSeries, AssetValuesInput, FlowsInput, resolve_flows, sum_between};
use chrono::NaiveDate;
use core_types::{AnnualizationOption, FlowTiming, RoundingMode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

pub const DEFAULT_LARGE_FLOW_LEVEL_IN_PERCENT: Decimal = dec!(5);
pub const DEFAULT_CALC_SCALE: u32 = 20;
pub const DEFAULT_RESULT_SCALE: u32 = 6;
/// The largest scale a `Decimal` can carry.
pub const MAX_SCALE: u32 = 28;

/// A validated, immutable single-period return calculation request.
///
/// Built through [`PerfCalcRequest::builder`]. All input series are sanitized and
/// copied at construction, so later changes to the caller's collections cannot
/// affect a running calculation.
#[derive(Debug, Clone)]
pub struct PerfCalcRequest {
    start_date_incl: NaiveDate,
    end_date_incl: NaiveDate,
    start_asset_value_excl: Decimal,
    end_asset_value_incl: Decimal,
    asset_values: AssetValueSeries,
    flows: BTreeMap<NaiveDate, Decimal>,
    large_flow_level_in_percent: Decimal,
    flow_timing: FlowTiming,
    annualization: AnnualizationOption,
    result_in_percent: bool,
    calc_scale: u32,
    result_scale: u32,
    rounding_mode: RoundingMode,
}

impl PerfCalcRequest {
    pub fn builder() -> PerfCalcRequestBuilder {
        PerfCalcRequestBuilder::default()
    }

    pub fn start_date_incl(&self) -> NaiveDate {
        self.start_date_incl
    }

    pub fn end_date_incl(&self) -> NaiveDate {
        self.end_date_incl
    }

    /// Valuation immediately before the period, excluding anything dated on the start date.
    pub fn start_asset_value_excl(&self) -> Decimal {
        self.start_asset_value_excl
    }

    /// Valuation at the period end, including everything dated on the end date.
    pub fn end_asset_value_incl(&self) -> Decimal {
        self.end_asset_value_incl
    }

    pub fn asset_values(&self) -> &AssetValueSeries {
        &self.asset_values
    }

    /// Valuation sample at `date`, if the series holds one.
    pub fn asset_value(&self, date: NaiveDate) -> Option<Decimal> {
        self.asset_values.value(date)
    }

    /// Date-unique flows within `[start_date_incl, end_date_incl]`.
    pub fn flows(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.flows
    }

    /// Sum of all flows of the period.
    pub fn net_flow(&self) -> Decimal {
        self.flows.values().sum()
    }

    /// Sum of the flows dated in `[from, to]`.
    pub fn flow_between(&self, from: NaiveDate, to: NaiveDate) -> Decimal {
        sum_between(&self.flows, from, to)
    }

    pub fn large_flow_level_in_percent(&self) -> Decimal {
        self.large_flow_level_in_percent
    }

    pub fn flow_timing(&self) -> FlowTiming {
        self.flow_timing
    }

    pub fn annualization(&self) -> AnnualizationOption {
        self.annualization
    }

    pub fn result_in_percent(&self) -> bool {
        self.result_in_percent
    }

    pub fn calc_scale(&self) -> u32 {
        self.calc_scale
    }

    pub fn result_scale(&self) -> u32 {
        self.result_scale
    }

    pub fn rounding_mode(&self) -> RoundingMode {
        self.rounding_mode
    }

    /// Turns a raw cumulative return (a fraction at calculation scale) into the
    /// requested result: annualized, scaled to percent and rounded to the result scale.
    pub fn finalize_return(&self, raw_return: Decimal) -> Result<Decimal, AnalyticsError> {
        let annualized = annualize(
            self.annualization,
            raw_return,
            self.start_date_incl,
            self.end_date_incl,
        );
        let scaled = if self.result_in_percent {
            checked(annualized.checked_mul(HUNDRED), "percent scaling")?
        } else {
            annualized
        };
        Ok(round_to_scale(scaled, self.result_scale, self.rounding_mode))
    }
}

/// Named-parameter construction of a [`PerfCalcRequest`] with the documented defaults.
#[derive(Debug, Clone)]
pub struct PerfCalcRequestBuilder {
    start_date_incl: Option<NaiveDate>,
    end_date_incl: Option<NaiveDate>,
    start_asset_value_excl: Decimal,
    end_asset_value_incl: Decimal,
    asset_values: AssetValuesInput,
    flows: FlowsInput,
    large_flow_level_in_percent: Decimal,
    flow_timing: FlowTiming,
    annualization: AnnualizationOption,
    result_in_percent: bool,
    calc_scale: u32,
    result_scale: u32,
    rounding_mode: RoundingMode,
}

impl Default for PerfCalcRequestBuilder {
    fn default() -> Self {
        Self {
            start_date_incl: None,
            end_date_incl: None,
            start_asset_value_excl: Decimal::ZERO,
            end_asset_value_incl: Decimal::ZERO,
            asset_values: AssetValuesInput::default(),
            flows: FlowsInput::default(),
            large_flow_level_in_percent: DEFAULT_LARGE_FLOW_LEVEL_IN_PERCENT,
            flow_timing: FlowTiming::default(),
            annualization: AnnualizationOption::default(),
            result_in_percent: false,
            calc_scale: DEFAULT_CALC_SCALE,
            result_scale: DEFAULT_RESULT_SCALE,
            rounding_mode: RoundingMode::default(),
        }
    }
}

impl PerfCalcRequestBuilder {
    pub fn start_date_incl(mut self, date: NaiveDate) -> Self {
        self.start_date_incl = Some(date);
        self
    }

    pub fn end_date_incl(mut self, date: NaiveDate) -> Self {
        self.end_date_incl = Some(date);
        self
    }

    pub fn start_asset_value_excl(mut self, value: Decimal) -> Self {
        self.start_asset_value_excl = value;
        self
    }

    pub fn end_asset_value_incl(mut self, value: Decimal) -> Self {
        self.end_asset_value_incl = value;
        self
    }

    pub fn asset_values(mut self, values: impl Into<AssetValuesInput>) -> Self {
        self.asset_values = values.into();
        self
    }

    /// Valuations supplied as a lookup function.
    pub fn asset_value_fn<F>(mut self, lookup: F) -> Self
    where
        F: Fn(NaiveDate) -> Option<Decimal> + Send + Sync + 'static,
    {
        self.asset_values = AssetValuesInput::Lookup(std::sync::Arc::new(lookup));
        self
    }

    pub fn flows(mut self, flows: impl Into<FlowsInput>) -> Self {
        self.flows = flows.into();
        self
    }

    pub fn large_flow_level_in_percent(mut self, level: Decimal) -> Self {
        self.large_flow_level_in_percent = level;
        self
    }

    pub fn flow_timing(mut self, timing: FlowTiming) -> Self {
        self.flow_timing = timing;
        self
    }

    pub fn annualization(mut self, option: AnnualizationOption) -> Self {
        self.annualization = option;
        self
    }

    pub fn result_in_percent(mut self, in_percent: bool) -> Self {
        self.result_in_percent = in_percent;
        self
    }

    pub fn calc_scale(mut self, scale: u32) -> Self {
        self.calc_scale = scale;
        self
    }

    pub fn result_scale(mut self, scale: u32) -> Self {
        self.result_scale = scale;
        self
    }

    pub fn rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = mode;
        self
    }

    /// Validates the parameters and resolves the input series.
    pub fn build(self) -> Result<PerfCalcRequest, AnalyticsError> {
        let start = self
            .start_date_incl
            .ok_or_else(|| AnalyticsError::InvalidArgument("start_date_incl is required".to_string()))?;
        let end = self
            .end_date_incl
            .ok_or_else(|| AnalyticsError::InvalidArgument("end_date_incl is required".to_string()))?;
        if start > end {
            return Err(AnalyticsError::InvalidArgument(format!(
                "start_date_incl {start} is after end_date_incl {end}"
            )));
        }
        if self.start_asset_value_excl < Decimal::ZERO {
            return Err(AnalyticsError::InvalidArgument(format!(
                "start_asset_value_excl must not be negative: {}",
                self.start_asset_value_excl
            )));
        }
        if self.end_asset_value_incl < Decimal::ZERO {
            return Err(AnalyticsError::InvalidArgument(format!(
                "end_asset_value_incl must not be negative: {}",
                self.end_asset_value_incl
            )));
        }
        validate_numeric_settings(self.large_flow_level_in_percent, self.calc_scale, self.result_scale)?;

        let asset_values = AssetValueSeries::resolve(self.asset_values, start, end)?;
        let flows = resolve_flows(self.flows, start, end);

        Ok(PerfCalcRequest {
            start_date_incl: start,
            end_date_incl: end,
            start_asset_value_excl: self.start_asset_value_excl,
            end_asset_value_incl: self.end_asset_value_incl,
            asset_values,
            flows,
            large_flow_level_in_percent: self.large_flow_level_in_percent,
            flow_timing: self.flow_timing,
            annualization: self.annualization,
            result_in_percent: self.result_in_percent,
            calc_scale: self.calc_scale,
            result_scale: self.result_scale,
            rounding_mode: self.rounding_mode,
        })
    }
}

/// Checks the numeric settings shared by every kind of request.
pub fn validate_numeric_settings(
    large_flow_level_in_percent: Decimal,
    calc_scale: u32,
    result_scale: u32,
) -> Result<(), AnalyticsError> {
    if large_flow_level_in_percent < Decimal::ZERO {
        return Err(AnalyticsError::InvalidArgument(format!(
            "large_flow_level_in_percent must not be negative: {large_flow_level_in_percent}"
        )));
    }
    if calc_scale > MAX_SCALE {
        return Err(AnalyticsError::InvalidArgument(format!(
            "calc_scale {calc_scale} exceeds the maximum of {MAX_SCALE}"
        )));
    }
    if result_scale > calc_scale {
        return Err(AnalyticsError::InvalidArgument(format!(
            "result_scale {result_scale} exceeds calc_scale {calc_scale}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DateAmount;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults() {
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .build()
            .unwrap();
        assert_eq!(req.large_flow_level_in_percent(), dec!(5));
        assert_eq!(req.flow_timing(), FlowTiming::BeginningOfDay);
        assert_eq!(req.annualization(), AnnualizationOption::DoNotAnnualize);
        assert!(!req.result_in_percent());
        assert_eq!(req.calc_scale(), 20);
        assert_eq!(req.result_scale(), 6);
        assert_eq!(req.rounding_mode(), RoundingMode::HalfUp);
    }

    #[test]
    fn missing_dates_are_rejected() {
        let err = PerfCalcRequest::builder()
            .end_date_incl(date(2021, 1, 31))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("start_date_incl"));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let result = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 2, 1))
            .end_date_incl(date(2021, 1, 31))
            .build();
        assert!(matches!(result, Err(AnalyticsError::InvalidArgument(_))));
    }

    #[test]
    fn negative_boundary_values_are_rejected() {
        let result = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .start_asset_value_excl(dec!(-0.01))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn result_scale_above_calc_scale_is_rejected() {
        let result = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .calc_scale(4)
            .result_scale(6)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn flows_are_copied_and_restricted() {
        let mut flows = vec![
            DateAmount::new(date(2020, 12, 31), dec!(1)),
            DateAmount::new(date(2021, 1, 10), dec!(2)),
            DateAmount::new(date(2021, 1, 10), dec!(3)),
        ];
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .flows(flows.clone())
            .build()
            .unwrap();
        flows.push(DateAmount::new(date(2021, 1, 11), dec!(100)));
        assert_eq!(req.flows().len(), 1);
        assert_eq!(req.net_flow(), dec!(5));
        assert_eq!(req.flow_between(date(2021, 1, 11), date(2021, 1, 31)), Decimal::ZERO);
    }

    #[test]
    fn finalize_scales_percent_before_rounding() {
        let req = PerfCalcRequest::builder()
            .start_date_incl(date(2021, 1, 1))
            .end_date_incl(date(2021, 1, 31))
            .result_in_percent(true)
            .result_scale(2)
            .build()
            .unwrap();
        assert_eq!(req.finalize_return(dec!(0.123456)).unwrap().to_string(), "12.35");
    }
}
