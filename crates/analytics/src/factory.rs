use crate::calculators::{
    LinkedModifiedDietzTwrCalculator, ModifiedDietzMwrCalculator, ReturnCalculator,
    SimpleReturnCalculator, TrueTwrCalculator,
};
use crate::error::AnalyticsError;
use core_types::CalculatorType;
use std::sync::Arc;

/// Creates the calculator registered for `kind`.
// The match is exhaustive, so a new `CalculatorType` will not compile until it is handled here.
pub fn create_calculator(kind: CalculatorType) -> Arc<dyn ReturnCalculator> {
    match kind {
        CalculatorType::TrueTwr => Arc::new(TrueTwrCalculator),
        CalculatorType::LinkedModifiedDietzTwr => Arc::new(LinkedModifiedDietzTwrCalculator),
        CalculatorType::ModifiedDietzMwr => Arc::new(ModifiedDietzMwrCalculator),
        CalculatorType::SimpleReturn => Arc::new(SimpleReturnCalculator),
    }
}

/// Creates a calculator usable as the time-weighted calculator of an analysis.
pub fn create_twr_calculator(kind: CalculatorType) -> Result<Arc<dyn ReturnCalculator>, AnalyticsError> {
    match kind {
        CalculatorType::TrueTwr
        | CalculatorType::LinkedModifiedDietzTwr
        | CalculatorType::SimpleReturn => Ok(create_calculator(kind)),
        CalculatorType::ModifiedDietzMwr => Err(AnalyticsError::UnsupportedCalculator(format!(
            "{kind} is not a time-weighted calculator"
        ))),
    }
}

/// Creates a calculator usable as the money-weighted calculator of an analysis.
pub fn create_mwr_calculator(kind: CalculatorType) -> Result<Arc<dyn ReturnCalculator>, AnalyticsError> {
    match kind {
        CalculatorType::ModifiedDietzMwr | CalculatorType::SimpleReturn => Ok(create_calculator(kind)),
        CalculatorType::TrueTwr | CalculatorType::LinkedModifiedDietzTwr => Err(
            AnalyticsError::UnsupportedCalculator(format!("{kind} is not a money-weighted calculator")),
        ),
    }
}

/// Parses a calculator name and creates it; unknown names are rejected by name.
pub fn create_calculator_by_name(name: &str) -> Result<Arc<dyn ReturnCalculator>, AnalyticsError> {
    let kind: CalculatorType = name.parse()?;
    Ok(create_calculator(kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_reject_the_wrong_kind() {
        assert!(create_twr_calculator(CalculatorType::TrueTwr).is_ok());
        assert!(create_mwr_calculator(CalculatorType::ModifiedDietzMwr).is_ok());
        let err = create_twr_calculator(CalculatorType::ModifiedDietzMwr).unwrap_err();
        assert!(err.to_string().contains("MODIFIED_DIETZ_MWR"));
        assert!(create_mwr_calculator(CalculatorType::LinkedModifiedDietzTwr).is_err());
    }

    #[test]
    fn unknown_names_are_reported() {
        let err = create_calculator_by_name("BrinsonAttribution").unwrap_err();
        assert_eq!(
            err,
            AnalyticsError::UnsupportedCalculator("BrinsonAttribution".to_string())
        );
    }
}
