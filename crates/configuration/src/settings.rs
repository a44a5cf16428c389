use crate::error::ConfigError;
use analytics::request::validate_numeric_settings;
use analytics::{
    MetricSwitches, PerfAnalysisRequest, PerfAnalysisRequestBuilder, PerfCalcRequest, PerfCalcRequestBuilder,
    create_mwr_calculator, create_twr_calculator,
};
use core_types::{AnnualizationOption, CalculatorType, FlowTiming, PeriodUnit, RoundingMode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

/// Defaults for every performance calculation started by the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Calendar unit of the analyzer rows. `DAY` is not accepted.
    pub result_period_unit: PeriodUnit,
    /// Name of the time-weighted calculator, e.g. `TRUE_TWR`.
    pub twr_calculator: String,
    /// Name of the money-weighted calculator, e.g. `MODIFIED_DIETZ_MWR`.
    pub mwr_calculator: String,
    pub twr_flow_timing: FlowTiming,
    pub mwr_flow_timing: FlowTiming,
    /// Flows above this share of the base value force an extra sub-period split
    /// in the linked Modified Dietz calculator. 5 means 5%.
    pub large_flow_level_in_percent: Decimal,
    pub result_in_percent: bool,
    pub calc_scale: u32,
    pub result_scale: u32,
    pub rounding_mode: RoundingMode,
    pub metrics: MetricSwitches,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            result_period_unit: PeriodUnit::Month,
            twr_calculator: CalculatorType::TrueTwr.name().to_string(),
            mwr_calculator: CalculatorType::ModifiedDietzMwr.name().to_string(),
            twr_flow_timing: FlowTiming::BeginningOfDay,
            mwr_flow_timing: FlowTiming::BeginningOfDay,
            large_flow_level_in_percent: dec!(5),
            result_in_percent: false,
            calc_scale: 20,
            result_scale: 6,
            rounding_mode: RoundingMode::HalfUp,
            metrics: MetricSwitches::default(),
        }
    }
}

impl AnalysisSettings {
    /// Checks the settings for values no request would accept.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.result_period_unit == PeriodUnit::Day {
            return Err(ConfigError::ValidationError(
                "analysis.result_period_unit must not be DAY".to_string(),
            ));
        }
        validate_numeric_settings(self.large_flow_level_in_percent, self.calc_scale, self.result_scale)
            .map_err(|e| ConfigError::ValidationError(format!("analysis: {e}")))?;
        create_twr_calculator(self.twr_calculator_type()?)
            .map_err(|e| ConfigError::ValidationError(format!("analysis.twr_calculator: {e}")))?;
        create_mwr_calculator(self.mwr_calculator_type()?)
            .map_err(|e| ConfigError::ValidationError(format!("analysis.mwr_calculator: {e}")))?;
        Ok(())
    }

    pub fn twr_calculator_type(&self) -> Result<CalculatorType, ConfigError> {
        parse_calculator(&self.twr_calculator)
    }

    pub fn mwr_calculator_type(&self) -> Result<CalculatorType, ConfigError> {
        parse_calculator(&self.mwr_calculator)
    }

    /// A multi-period request builder with every setting applied.
    /// Callers add the dates and the series.
    pub fn request_builder(&self) -> Result<PerfAnalysisRequestBuilder, ConfigError> {
        Ok(PerfAnalysisRequest::builder()
            .result_period_unit(self.result_period_unit)
            .twr_calculator_type(self.twr_calculator_type()?)
            .mwr_calculator_type(self.mwr_calculator_type()?)
            .twr_flow_timing(self.twr_flow_timing)
            .mwr_flow_timing(self.mwr_flow_timing)
            .metrics(self.metrics)
            .large_flow_level_in_percent(self.large_flow_level_in_percent)
            .result_in_percent(self.result_in_percent)
            .calc_scale(self.calc_scale)
            .result_scale(self.result_scale)
            .rounding_mode(self.rounding_mode))
    }

    /// A single-period request builder with the numeric settings applied.
    pub fn calc_request_builder(
        &self,
        flow_timing: FlowTiming,
        annualization: AnnualizationOption,
    ) -> PerfCalcRequestBuilder {
        PerfCalcRequest::builder()
            .flow_timing(flow_timing)
            .annualization(annualization)
            .large_flow_level_in_percent(self.large_flow_level_in_percent)
            .result_in_percent(self.result_in_percent)
            .calc_scale(self.calc_scale)
            .result_scale(self.result_scale)
            .rounding_mode(self.rounding_mode)
    }
}

fn parse_calculator(name: &str) -> Result<CalculatorType, ConfigError> {
    CalculatorType::from_str(name).map_err(|e| ConfigError::ValidationError(e.to_string()))
}
