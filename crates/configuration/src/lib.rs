use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{AnalysisSettings, Config};

/// Prefix of the environment variables overriding file settings,
/// e.g. `PERFCALC__ANALYSIS__RESULT_SCALE=4`.
pub const ENV_PREFIX: &str = "PERFCALC";

/// Loads the application configuration from the TOML file at `path`.
///
/// Environment variables prefixed with `PERFCALC` override the file, using `__` as the
/// section separator. The result is validated before it is returned, so every setting
/// can be turned into a request without further checks.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.analysis.validate()?;
    tracing::debug!(path = %path.display(), settings = ?config.analysis, "Configuration loaded.");

    Ok(config)
}

/// Like [`load_config`], but falls back to the built-in defaults when `path` does not exist.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "No configuration file, using defaults.");
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{FlowTiming, PeriodUnit, RoundingMode};
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_full_file() {
        let file = write_config(
            r#"
            [analysis]
            result_period_unit = "QUARTER"
            twr_calculator = "LINKED_MODIFIED_DIETZ_TWR"
            mwr_calculator = "simple-return"
            twr_flow_timing = "END_OF_DAY"
            large_flow_level_in_percent = 10
            result_in_percent = true
            calc_scale = 16
            result_scale = 4
            rounding_mode = "HALF_EVEN"

            [analysis.metrics]
            calculate_mwr = true
            calculate_trailing_twr_3y = true
            "#,
        );
        let config = load_config(file.path()).unwrap();
        let analysis = &config.analysis;
        assert_eq!(analysis.result_period_unit, PeriodUnit::Quarter);
        assert_eq!(analysis.twr_flow_timing, FlowTiming::EndOfDay);
        assert_eq!(analysis.mwr_flow_timing, FlowTiming::BeginningOfDay);
        assert_eq!(analysis.large_flow_level_in_percent, dec!(10));
        assert_eq!(analysis.calc_scale, 16);
        assert_eq!(analysis.rounding_mode, RoundingMode::HalfEven);
        assert!(analysis.metrics.calculate_mwr);
        assert!(analysis.metrics.calculate_trailing_twr_3y);
        assert!(!analysis.metrics.calculate_period_income);
        assert_eq!(
            analysis.mwr_calculator_type().unwrap(),
            core_types::CalculatorType::SimpleReturn
        );
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.analysis.result_scale, 6);
        assert_eq!(config.analysis.twr_calculator, "TRUE_TWR");
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let file = write_config(
            r#"
            [analysis]
            calc_scale = 2
            result_scale = 6
            "#,
        );
        assert!(matches!(load_config(file.path()), Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn unknown_units_fail_to_load() {
        let file = write_config("[analysis]\nresult_period_unit = \"WEEK\"\n");
        assert!(matches!(load_config(file.path()), Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn absent_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.analysis.calc_scale, 20);
    }
}
