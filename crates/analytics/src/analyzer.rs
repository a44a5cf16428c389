use crate::analysis_request::PerfAnalysisRequest;
use crate::annualization::annualize;
use crate::calculators::ReturnCalculator;
use crate::error::AnalyticsError;
use crate::factory::{create_mwr_calculator, create_twr_calculator};
use crate::math::{HUNDRED, chain, checked, mean, round_to_scale};
use crate::report::PerfAnalysis;
use crate::series::day_before;
use chrono::{Days, Months, NaiveDate};
use core_types::AnnualizationOption;
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Walks the calendar grid of a [`PerfAnalysisRequest`] and produces one
/// [`PerfAnalysis`] row per result period.
///
/// The analyzer is stateless apart from the optional calculator overrides, so a
/// single instance can serve any number of threads.
#[derive(Debug, Default, Clone)]
pub struct PerformanceAnalyzer {
    twr_calculator: Option<Arc<dyn ReturnCalculator>>,
    mwr_calculator: Option<Arc<dyn ReturnCalculator>>,
}

/// Unrounded figures of a finished row, kept for the trailing windows.
#[derive(Debug, Clone, Copy)]
struct RowFigures {
    start: NaiveDate,
    period_twr: Decimal,
    profit: Decimal,
    flow: Decimal,
    income: Decimal,
}

/// Running totals carried from one row to the next.
#[derive(Debug)]
struct Totals {
    first_start_value: Decimal,
    previous_end_value: Decimal,
    cumulative_twr: Decimal,
    contribution: Decimal,
    profit: Decimal,
    rows: Vec<RowFigures>,
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// An analyzer that ignores the calculator types named in the requests and
    /// uses the given implementations instead.
    pub fn with_calculators(
        twr_calculator: Arc<dyn ReturnCalculator>,
        mwr_calculator: Arc<dyn ReturnCalculator>,
    ) -> Self {
        Self {
            twr_calculator: Some(twr_calculator),
            mwr_calculator: Some(mwr_calculator),
        }
    }

    /// Runs the analysis and returns the rows in ascending date order.
    ///
    /// # Errors
    ///
    /// Fails with an `AnalyticsError` when a calculator rejects one of the derived
    /// period requests. Input validation already happened when the request was built.
    pub fn analyze(&self, request: &PerfAnalysisRequest) -> Result<Vec<PerfAnalysis>, AnalyticsError> {
        let twr = match &self.twr_calculator {
            Some(calculator) => Arc::clone(calculator),
            None => create_twr_calculator(request.twr_calculator_type())?,
        };
        let mwr = match &self.mwr_calculator {
            Some(calculator) => Arc::clone(calculator),
            None => create_mwr_calculator(request.mwr_calculator_type())?,
        };

        let periods = period_grid(request);
        tracing::info!(
            start = %request.effective_start_date_incl(),
            end = %request.effective_end_date_incl(),
            unit = ?request.result_period_unit(),
            periods = periods.len(),
            "Starting performance analysis."
        );

        let first_start_value = request
            .asset_values()
            .value(day_before(request.effective_start_date_incl())?)
            .unwrap_or(Decimal::ZERO);
        let mut totals = Totals {
            first_start_value,
            previous_end_value: first_start_value,
            cumulative_twr: Decimal::ZERO,
            contribution: first_start_value,
            profit: Decimal::ZERO,
            rows: Vec::with_capacity(periods.len()),
        };

        let mut analyses = Vec::with_capacity(periods.len());
        for (start, end) in periods {
            let row = self.analyze_period(request, twr.as_ref(), mwr.as_ref(), start, end, &mut totals)?;
            tracing::debug!(
                period = %row.period_caption,
                period_twr = %row.period_twr,
                cumulative_twr = %row.cumulative_twr,
                "Period analyzed."
            );
            analyses.push(row);
        }

        tracing::info!(rows = analyses.len(), "Performance analysis finished.");
        Ok(analyses)
    }

    /// Analyzes independent requests in parallel, one task per request.
    /// The results are in the order of `requests`.
    pub fn analyze_all(
        &self,
        requests: &[PerfAnalysisRequest],
    ) -> Vec<Result<Vec<PerfAnalysis>, AnalyticsError>> {
        requests.par_iter().map(|request| self.analyze(request)).collect()
    }

    fn analyze_period(
        &self,
        request: &PerfAnalysisRequest,
        twr: &dyn ReturnCalculator,
        mwr: &dyn ReturnCalculator,
        start: NaiveDate,
        end: NaiveDate,
        totals: &mut Totals,
    ) -> Result<PerfAnalysis, AnalyticsError> {
        let scale = request.calc_scale();
        let metrics = *request.metrics();

        let start_value = totals.previous_end_value;
        let flow = request.flow_between(start, end);
        let end_value = match request.asset_values().value(end) {
            Some(value) => value,
            None => carried_end_value(request, start, end, start_value)?,
        }
        .max(Decimal::ZERO);

        let period_request = request.period_request(start, end, start_value, end_value, request.twr_flow_timing())?;
        let period_twr = twr.raw_return(&period_request)?;
        totals.cumulative_twr = chain([totals.cumulative_twr, period_twr], scale)?;
        let annualized_twr = annualize(
            AnnualizationOption::AnnualizeIfOverOneYear,
            totals.cumulative_twr,
            request.effective_start_date_incl(),
            end,
        );

        let mut row = PerfAnalysis {
            period_start_date_incl: start,
            period_end_date_incl: end,
            period_caption: request.result_period_unit().caption(start),
            period_start_asset_value_excl: self.money(request, start_value),
            period_end_asset_value_incl: self.money(request, end_value),
            period_flow: self.money(request, flow),
            period_twr: self.percent(request, period_twr)?,
            cumulative_twr: self.percent(request, totals.cumulative_twr)?,
            annualized_twr: self.percent(request, annualized_twr)?,
            period_mwr: None,
            cumulative_mwr: None,
            annualized_mwr: None,
            total_contribution: Decimal::ZERO,
            period_profit: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            period_income: None,
            trailing_avg_profit_1y: None,
            trailing_avg_flow_1y: None,
            trailing_avg_income_1y: None,
            trailing_twr_1y: None,
            trailing_twr_2y: None,
            trailing_twr_3y: None,
            trailing_twr_5y: None,
            trailing_twr_10y: None,
        };

        if metrics.calculate_mwr {
            let cumulative_request = request.period_request(
                request.effective_start_date_incl(),
                end,
                totals.first_start_value,
                end_value,
                request.mwr_flow_timing(),
            )?;
            let cumulative_mwr = mwr.raw_return(&cumulative_request)?;
            let annualized_mwr = annualize(
                AnnualizationOption::AnnualizeIfOverOneYear,
                cumulative_mwr,
                request.effective_start_date_incl(),
                end,
            );
            row.cumulative_mwr = Some(self.percent(request, cumulative_mwr)?);
            row.annualized_mwr = Some(self.percent(request, annualized_mwr)?);
        }
        if metrics.calculate_period_mwr {
            let mwr_request =
                request.period_request(start, end, start_value, end_value, request.mwr_flow_timing())?;
            row.period_mwr = Some(self.percent(request, mwr.raw_return(&mwr_request)?)?);
        }

        let profit = checked(
            end_value
                .checked_sub(start_value)
                .and_then(|change| change.checked_sub(flow)),
            "period profit",
        )?;
        totals.contribution = checked(totals.contribution.checked_add(flow), "total contribution")?;
        totals.profit = checked(totals.profit.checked_add(profit), "total profit")?;
        row.total_contribution = self.money(request, totals.contribution);
        row.period_profit = self.money(request, profit);
        row.total_profit = self.money(request, totals.profit);

        let income = request.income_between(start, end);
        if metrics.calculate_period_income {
            row.period_income = Some(self.money(request, income));
        }

        totals.previous_end_value = end_value;
        totals.rows.push(RowFigures {
            start,
            period_twr,
            profit,
            flow,
            income,
        });
        self.calculate_trailing(request, end, &totals.rows, &mut row)?;

        Ok(row)
    }

    /// Fills the trailing-window metrics of `row`, the last entry of `rows`.
    fn calculate_trailing(
        &self,
        request: &PerfAnalysisRequest,
        end: NaiveDate,
        rows: &[RowFigures],
        row: &mut PerfAnalysis,
    ) -> Result<(), AnalyticsError> {
        let scale = request.calc_scale();
        let metrics = request.metrics();

        if metrics.calculate_trailing_avg_profit_1y
            || metrics.calculate_trailing_avg_flow_1y
            || metrics.calculate_trailing_avg_income_1y
        {
            let window = trailing_window(rows, end, 1)?;
            let average = |pick: fn(&RowFigures) -> Decimal| -> Result<Decimal, AnalyticsError> {
                let values: Vec<Decimal> = window.iter().map(pick).collect();
                Ok(self.money(request, mean(&values, scale)?))
            };
            if metrics.calculate_trailing_avg_profit_1y {
                row.trailing_avg_profit_1y = Some(average(|r| r.profit)?);
            }
            if metrics.calculate_trailing_avg_flow_1y {
                row.trailing_avg_flow_1y = Some(average(|r| r.flow)?);
            }
            if metrics.calculate_trailing_avg_income_1y {
                row.trailing_avg_income_1y = Some(average(|r| r.income)?);
            }
        }

        for years in metrics.trailing_twr_years() {
            let window = trailing_window(rows, end, years)?;
            let Some(first) = window.first() else {
                continue;
            };
            let cumulative = chain(window.iter().map(|r| r.period_twr), scale)?;
            let annualized = annualize(AnnualizationOption::AnnualizeIfOverOneYear, cumulative, first.start, end);
            row.set_trailing_twr(years, self.percent(request, annualized)?);
        }
        Ok(())
    }

    fn percent(&self, request: &PerfAnalysisRequest, value: Decimal) -> Result<Decimal, AnalyticsError> {
        let scaled = if request.result_in_percent() {
            checked(value.checked_mul(HUNDRED), "percent scaling")?
        } else {
            value
        };
        Ok(round_to_scale(scaled, request.result_scale(), request.rounding_mode()))
    }

    fn money(&self, request: &PerfAnalysisRequest, value: Decimal) -> Decimal {
        round_to_scale(value, request.result_scale(), request.rounding_mode())
    }
}

/// The row end value when no sample falls on `end`: the last sample inside the row,
/// or the start value, moved only by the flows dated after it.
fn carried_end_value(
    request: &PerfAnalysisRequest,
    start: NaiveDate,
    end: NaiveDate,
    start_value: Decimal,
) -> Result<Decimal, AnalyticsError> {
    let values = request.asset_values();
    let (anchor, anchor_value) = match values.sample_dates(start, end).last() {
        Some(&sample) => (sample, values.value(sample).unwrap_or(start_value)),
        None => (day_before(start)?, start_value),
    };
    let later_flow = request.flow_between(anchor + Days::new(1), end);
    checked(anchor_value.checked_add(later_flow), "carried end value")
}

/// The result periods: each calendar unit intersected with the effective window.
fn period_grid(request: &PerfAnalysisRequest) -> Vec<(NaiveDate, NaiveDate)> {
    let unit = request.result_period_unit();
    let last = request.effective_end_date_incl();
    let mut periods = Vec::new();
    let mut start = request.effective_start_date_incl();
    loop {
        let end = unit.ceil(start).min(last);
        periods.push((start, end));
        if end >= last {
            break;
        }
        start = end + Days::new(1);
    }
    periods
}

/// The rows starting on or after `end + 1 day - years`.
fn trailing_window(rows: &[RowFigures], end: NaiveDate, years: u32) -> Result<&[RowFigures], AnalyticsError> {
    let window_start = (end + Days::new(1))
        .checked_sub_months(Months::new(12 * years))
        .ok_or_else(|| AnalyticsError::Calculation(format!("trailing window of {years}y before {end}")))?;
    let first = rows.partition_point(|r| r.start < window_start);
    Ok(&rows[first..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::PeriodUnit;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grid_clips_the_first_and_last_unit() {
        let request = PerfAnalysisRequest::builder()
            .result_period_unit(PeriodUnit::Quarter)
            .analysis_start_date_incl(date(2021, 2, 15))
            .analysis_end_date_incl(date(2021, 8, 10))
            .build()
            .unwrap();
        assert_eq!(
            period_grid(&request),
            vec![
                (date(2021, 2, 15), date(2021, 3, 31)),
                (date(2021, 4, 1), date(2021, 6, 30)),
                (date(2021, 7, 1), date(2021, 8, 10)),
            ]
        );
    }

    #[test]
    fn single_day_window_is_one_period() {
        let request = PerfAnalysisRequest::builder()
            .analysis_start_date_incl(date(2021, 5, 31))
            .analysis_end_date_incl(date(2021, 5, 31))
            .build()
            .unwrap();
        assert_eq!(period_grid(&request), vec![(date(2021, 5, 31), date(2021, 5, 31))]);
    }

    #[test]
    fn trailing_window_spans_whole_rows() {
        let rows: Vec<RowFigures> = (1..=14)
            .map(|i| RowFigures {
                start: date(2020 + (i - 1) / 12, ((i - 1) % 12 + 1) as u32, 1),
                period_twr: Decimal::ZERO,
                profit: dec!(1),
                flow: Decimal::ZERO,
                income: Decimal::ZERO,
            })
            .collect();
        // Rows of 2020-03 through 2021-02.
        let window = trailing_window(&rows, date(2021, 2, 28), 1).unwrap();
        assert_eq!(window.len(), 12);
        assert_eq!(window[0].start, date(2020, 3, 1));
        // Only 14 rows are available for a 2 year window.
        assert_eq!(trailing_window(&rows, date(2021, 2, 28), 2).unwrap().len(), 14);
    }
}
