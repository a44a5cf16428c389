use crate::error::AnalyticsError;
use crate::factory::{create_mwr_calculator, create_twr_calculator};
use crate::request::{
    DEFAULT_CALC_SCALE, DEFAULT_LARGE_FLOW_LEVEL_IN_PERCENT, DEFAULT_RESULT_SCALE, PerfCalcRequest,
    validate_numeric_settings,
};
use crate::series::{AssetValueSeries, AssetValuesInput, FlowsInput, resolve_flows, sum_between};
use chrono::NaiveDate;
use core_types::{AnnualizationOption, CalculatorType, FlowTiming, PeriodUnit, RoundingMode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Switches for the optional metrics of an analysis. Each one gates extra work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricSwitches {
    pub calculate_mwr: bool,
    pub calculate_period_mwr: bool,
    pub calculate_trailing_avg_profit_1y: bool,
    pub calculate_trailing_avg_flow_1y: bool,
    pub calculate_period_income: bool,
    pub calculate_trailing_avg_income_1y: bool,
    pub calculate_trailing_twr_1y: bool,
    pub calculate_trailing_twr_2y: bool,
    pub calculate_trailing_twr_3y: bool,
    pub calculate_trailing_twr_5y: bool,
    pub calculate_trailing_twr_10y: bool,
}

impl MetricSwitches {
    pub fn needs_incomes(&self) -> bool {
        self.calculate_period_income || self.calculate_trailing_avg_income_1y
    }

    /// The trailing TWR windows (in years) that are switched on.
    pub fn trailing_twr_years(&self) -> Vec<u32> {
        [
            (1, self.calculate_trailing_twr_1y),
            (2, self.calculate_trailing_twr_2y),
            (3, self.calculate_trailing_twr_3y),
            (5, self.calculate_trailing_twr_5y),
            (10, self.calculate_trailing_twr_10y),
        ]
        .into_iter()
        .filter_map(|(years, on)| on.then_some(years))
        .collect()
    }
}

/// A validated, immutable multi-period analysis request.
#[derive(Debug, Clone)]
pub struct PerfAnalysisRequest {
    result_period_unit: PeriodUnit,
    analysis_start_date_incl: NaiveDate,
    analysis_end_date_incl: NaiveDate,
    investment_start_date_incl: NaiveDate,
    investment_end_date_incl: NaiveDate,
    asset_values: AssetValueSeries,
    flows: BTreeMap<NaiveDate, Decimal>,
    incomes: Option<BTreeMap<NaiveDate, Decimal>>,
    twr_calculator_type: CalculatorType,
    mwr_calculator_type: CalculatorType,
    twr_flow_timing: FlowTiming,
    mwr_flow_timing: FlowTiming,
    metrics: MetricSwitches,
    large_flow_level_in_percent: Decimal,
    result_in_percent: bool,
    calc_scale: u32,
    result_scale: u32,
    rounding_mode: RoundingMode,
}

impl PerfAnalysisRequest {
    pub fn builder() -> PerfAnalysisRequestBuilder {
        PerfAnalysisRequestBuilder::default()
    }

    pub fn result_period_unit(&self) -> PeriodUnit {
        self.result_period_unit
    }

    pub fn analysis_start_date_incl(&self) -> NaiveDate {
        self.analysis_start_date_incl
    }

    pub fn analysis_end_date_incl(&self) -> NaiveDate {
        self.analysis_end_date_incl
    }

    pub fn investment_start_date_incl(&self) -> NaiveDate {
        self.investment_start_date_incl
    }

    pub fn investment_end_date_incl(&self) -> NaiveDate {
        self.investment_end_date_incl
    }

    /// First day of the intersection of the analysis and investment windows.
    pub fn effective_start_date_incl(&self) -> NaiveDate {
        self.analysis_start_date_incl.max(self.investment_start_date_incl)
    }

    /// Last day of the intersection of the analysis and investment windows.
    pub fn effective_end_date_incl(&self) -> NaiveDate {
        self.analysis_end_date_incl.min(self.investment_end_date_incl)
    }

    pub fn asset_values(&self) -> &AssetValueSeries {
        &self.asset_values
    }

    pub fn flows(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.flows
    }

    pub fn incomes(&self) -> Option<&BTreeMap<NaiveDate, Decimal>> {
        self.incomes.as_ref()
    }

    pub fn twr_calculator_type(&self) -> CalculatorType {
        self.twr_calculator_type
    }

    pub fn mwr_calculator_type(&self) -> CalculatorType {
        self.mwr_calculator_type
    }

    pub fn twr_flow_timing(&self) -> FlowTiming {
        self.twr_flow_timing
    }

    pub fn mwr_flow_timing(&self) -> FlowTiming {
        self.mwr_flow_timing
    }

    pub fn metrics(&self) -> &MetricSwitches {
        &self.metrics
    }

    pub fn large_flow_level_in_percent(&self) -> Decimal {
        self.large_flow_level_in_percent
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

    pub(crate) fn flow_between(&self, from: NaiveDate, to: NaiveDate) -> Decimal {
        sum_between(&self.flows, from, to)
    }

    pub(crate) fn income_between(&self, from: NaiveDate, to: NaiveDate) -> Decimal {
        self.incomes
            .as_ref()
            .map(|incomes| sum_between(incomes, from, to))
            .unwrap_or(Decimal::ZERO)
    }

    /// A single-period request over `[start, end]` sharing this request's series.
    ///
    /// The result is kept at full calculation precision: no annualization, no percent
    /// scaling and `result_scale == calc_scale`, so it can be chained further.
    pub(crate) fn period_request(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        start_value: Decimal,
        end_value: Decimal,
        flow_timing: FlowTiming,
    ) -> Result<PerfCalcRequest, AnalyticsError> {
        let flows: BTreeMap<NaiveDate, Decimal> =
            self.flows.range(start..=end).map(|(d, v)| (*d, *v)).collect();
        PerfCalcRequest::builder()
            .start_date_incl(start)
            .end_date_incl(end)
            .start_asset_value_excl(start_value)
            .end_asset_value_incl(end_value)
            .asset_values(self.asset_values.clone())
            .flows(flows)
            .large_flow_level_in_percent(self.large_flow_level_in_percent)
            .flow_timing(flow_timing)
            .annualization(AnnualizationOption::DoNotAnnualize)
            .result_in_percent(false)
            .calc_scale(self.calc_scale)
            .result_scale(self.calc_scale)
            .rounding_mode(self.rounding_mode)
            .build()
    }
}

/// Named-parameter construction of a [`PerfAnalysisRequest`] with the documented defaults.
#[derive(Debug, Clone)]
pub struct PerfAnalysisRequestBuilder {
    result_period_unit: PeriodUnit,
    analysis_start_date_incl: Option<NaiveDate>,
    analysis_end_date_incl: Option<NaiveDate>,
    investment_start_date_incl: Option<NaiveDate>,
    investment_end_date_incl: Option<NaiveDate>,
    asset_values: AssetValuesInput,
    flows: FlowsInput,
    incomes: Option<FlowsInput>,
    twr_calculator_type: CalculatorType,
    mwr_calculator_type: CalculatorType,
    twr_flow_timing: FlowTiming,
    mwr_flow_timing: FlowTiming,
    metrics: MetricSwitches,
    large_flow_level_in_percent: Decimal,
    result_in_percent: bool,
    calc_scale: u32,
    result_scale: u32,
    rounding_mode: RoundingMode,
}

impl Default for PerfAnalysisRequestBuilder {
    fn default() -> Self {
        Self {
            result_period_unit: PeriodUnit::Month,
            analysis_start_date_incl: None,
            analysis_end_date_incl: None,
            investment_start_date_incl: None,
            investment_end_date_incl: None,
            asset_values: AssetValuesInput::default(),
            flows: FlowsInput::default(),
            incomes: None,
            twr_calculator_type: CalculatorType::TrueTwr,
            mwr_calculator_type: CalculatorType::ModifiedDietzMwr,
            twr_flow_timing: FlowTiming::default(),
            mwr_flow_timing: FlowTiming::default(),
            metrics: MetricSwitches::default(),
            large_flow_level_in_percent: DEFAULT_LARGE_FLOW_LEVEL_IN_PERCENT,
            result_in_percent: false,
            calc_scale: DEFAULT_CALC_SCALE,
            result_scale: DEFAULT_RESULT_SCALE,
            rounding_mode: RoundingMode::default(),
        }
    }
}

impl PerfAnalysisRequestBuilder {
    pub fn result_period_unit(mut self, unit: PeriodUnit) -> Self {
        self.result_period_unit = unit;
        self
    }

    pub fn analysis_start_date_incl(mut self, date: NaiveDate) -> Self {
        self.analysis_start_date_incl = Some(date);
        self
    }

    pub fn analysis_end_date_incl(mut self, date: NaiveDate) -> Self {
        self.analysis_end_date_incl = Some(date);
        self
    }

    pub fn investment_start_date_incl(mut self, date: NaiveDate) -> Self {
        self.investment_start_date_incl = Some(date);
        self
    }

    pub fn investment_end_date_incl(mut self, date: NaiveDate) -> Self {
        self.investment_end_date_incl = Some(date);
        self
    }

    pub fn asset_values(mut self, values: impl Into<AssetValuesInput>) -> Self {
        self.asset_values = values.into();
        self
    }

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

    pub fn incomes(mut self, incomes: impl Into<FlowsInput>) -> Self {
        self.incomes = Some(incomes.into());
        self
    }

    pub fn twr_calculator_type(mut self, kind: CalculatorType) -> Self {
        self.twr_calculator_type = kind;
        self
    }

    pub fn mwr_calculator_type(mut self, kind: CalculatorType) -> Self {
        self.mwr_calculator_type = kind;
        self
    }

    pub fn twr_flow_timing(mut self, timing: FlowTiming) -> Self {
        self.twr_flow_timing = timing;
        self
    }

    pub fn mwr_flow_timing(mut self, timing: FlowTiming) -> Self {
        self.mwr_flow_timing = timing;
        self
    }

    pub fn metrics(mut self, metrics: MetricSwitches) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn calculate_mwr(mut self, on: bool) -> Self {
        self.metrics.calculate_mwr = on;
        self
    }

    pub fn calculate_period_mwr(mut self, on: bool) -> Self {
        self.metrics.calculate_period_mwr = on;
        self
    }

    pub fn calculate_trailing_avg_profit_1y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_avg_profit_1y = on;
        self
    }

    pub fn calculate_trailing_avg_flow_1y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_avg_flow_1y = on;
        self
    }

    pub fn calculate_period_income(mut self, on: bool) -> Self {
        self.metrics.calculate_period_income = on;
        self
    }

    pub fn calculate_trailing_avg_income_1y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_avg_income_1y = on;
        self
    }

    pub fn calculate_trailing_twr_1y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_twr_1y = on;
        self
    }

    pub fn calculate_trailing_twr_2y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_twr_2y = on;
        self
    }

    pub fn calculate_trailing_twr_3y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_twr_3y = on;
        self
    }

    pub fn calculate_trailing_twr_5y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_twr_5y = on;
        self
    }

    pub fn calculate_trailing_twr_10y(mut self, on: bool) -> Self {
        self.metrics.calculate_trailing_twr_10y = on;
        self
    }

    pub fn large_flow_level_in_percent(mut self, level: Decimal) -> Self {
        self.large_flow_level_in_percent = level;
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

    pub fn build(self) -> Result<PerfAnalysisRequest, AnalyticsError> {
        if self.result_period_unit == PeriodUnit::Day {
            return Err(AnalyticsError::InvalidArgument(
                "DAY is not supported as result period unit".to_string(),
            ));
        }
        let analysis_start = self.analysis_start_date_incl.ok_or_else(|| {
            AnalyticsError::InvalidArgument("analysis_start_date_incl is required".to_string())
        })?;
        let analysis_end = self.analysis_end_date_incl.ok_or_else(|| {
            AnalyticsError::InvalidArgument("analysis_end_date_incl is required".to_string())
        })?;
        if analysis_start > analysis_end {
            return Err(AnalyticsError::InvalidArgument(format!(
                "analysis start {analysis_start} is after analysis end {analysis_end}"
            )));
        }
        let investment_start = self.investment_start_date_incl.unwrap_or(analysis_start);
        let investment_end = self.investment_end_date_incl.unwrap_or(analysis_end);
        if investment_start > investment_end {
            return Err(AnalyticsError::InvalidArgument(format!(
                "investment start {investment_start} is after investment end {investment_end}"
            )));
        }
        let effective_start = analysis_start.max(investment_start);
        let effective_end = analysis_end.min(investment_end);
        if effective_start > effective_end {
            return Err(AnalyticsError::InvalidArgument(format!(
                "investment window {investment_start}..{investment_end} does not overlap analysis window {analysis_start}..{analysis_end}"
            )));
        }
        if self.metrics.needs_incomes() && self.incomes.is_none() {
            return Err(AnalyticsError::InvalidArgument(
                "incomes are required when an income metric is requested".to_string(),
            ));
        }
        validate_numeric_settings(self.large_flow_level_in_percent, self.calc_scale, self.result_scale)?;
        create_twr_calculator(self.twr_calculator_type)?;
        create_mwr_calculator(self.mwr_calculator_type)?;

        let asset_values = AssetValueSeries::resolve(self.asset_values, effective_start, effective_end)?;
        let flows = resolve_flows(self.flows, effective_start, effective_end);
        let incomes = self
            .incomes
            .map(|incomes| resolve_flows(incomes, effective_start, effective_end));

        Ok(PerfAnalysisRequest {
            result_period_unit: self.result_period_unit,
            analysis_start_date_incl: analysis_start,
            analysis_end_date_incl: analysis_end,
            investment_start_date_incl: investment_start,
            investment_end_date_incl: investment_end,
            asset_values,
            flows,
            incomes,
            twr_calculator_type: self.twr_calculator_type,
            mwr_calculator_type: self.mwr_calculator_type,
            twr_flow_timing: self.twr_flow_timing,
            mwr_flow_timing: self.mwr_flow_timing,
            metrics: self.metrics,
            large_flow_level_in_percent: self.large_flow_level_in_percent,
            result_in_percent: self.result_in_percent,
            calc_scale: self.calc_scale,
            result_scale: self.result_scale,
            rounding_mode: self.rounding_mode,
        })
    }
}
