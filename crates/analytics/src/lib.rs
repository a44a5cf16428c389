//! # Performance Analytics Engine
//!
//! This crate computes investment performance from two raw inputs: a dated, signed
//! cash-flow series and a dated asset-valuation series. It does not know where that
//! data comes from.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** Every calculator and the `PerformanceAnalyzer` are pure
//!   functions over immutable, validated requests. They hold no shared mutable state and
//!   can be used from any number of threads.
//! - **Exact Arithmetic:** All amounts and returns are `Decimal`s, computed at the request's
//!   calculation scale and rounded once, at the end, to its result scale.
//!
//! ## Public API
//!
//! - `PerfCalcRequest` / `PerfAnalysisRequest`: validated single- and multi-period requests.
//! - `ReturnCalculator`: the trait behind `TrueTwrCalculator`, `LinkedModifiedDietzTwrCalculator`,
//!   `ModifiedDietzMwrCalculator` and `SimpleReturnCalculator`.
//! - `PerformanceAnalyzer`: produces one `PerfAnalysis` row per calendar period.
//! - `annualize`: the annualization policy shared by all of the above.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

pub mod analysis_request;
pub mod analyzer;
pub mod annualization;
pub mod calculators;
pub mod error;
pub mod factory;
mod math;
pub mod report;
pub mod request;
pub mod series;

pub use analysis_request::{MetricSwitches, PerfAnalysisRequest, PerfAnalysisRequestBuilder};
pub use analyzer::PerformanceAnalyzer;
pub use annualization::annualize;
pub use calculators::{
    LinkedModifiedDietzTwrCalculator, ModifiedDietzMwrCalculator, ReturnCalculator,
    SimpleReturnCalculator, TrueTwrCalculator,
};
pub use error::AnalyticsError;
pub use factory::{create_calculator, create_calculator_by_name, create_mwr_calculator, create_twr_calculator};
pub use math::round_to_scale;
pub use report::PerfAnalysis;
pub use request::{PerfCalcRequest, PerfCalcRequestBuilder};
pub use series::{AssetValueSeries, AssetValuesInput, FlowsInput};
