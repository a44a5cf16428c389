use analytics::{PerfAnalysis, PerfAnalysisRequest, PerformanceAnalyzer, create_calculator};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use configuration::{AnalysisSettings, load_config_or_default};
use core_types::{AnnualizationOption, CalculatorType, DateAmount, PeriodUnit};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the perfcalc command line application.
fn main() -> Result<()> {
    // A .env file is optional; RUST_LOG may be set there.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Analyze(args) => handle_analyze(args, &config.analysis),
        Commands::Return(args) => handle_return(args, &config.analysis),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Investment performance calculations over flow and valuation series.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path of the TOML configuration file. Built-in defaults apply when it is missing.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Break the analysis window into calendar periods and report per-period metrics.
    Analyze(AnalyzeArgs),
    /// Compute a single return over one period.
    Return(ReturnArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Input documents; several are analyzed in parallel.
    #[arg(long, required = true)]
    input: Vec<PathBuf>,

    /// Result period unit (MONTH, QUARTER or YEAR), overriding the configuration.
    #[arg(long)]
    unit: Option<PeriodUnit>,

    /// Print the rows as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ReturnArgs {
    /// Input document.
    #[arg(long)]
    input: PathBuf,

    /// Calculator to use, e.g. TRUE_TWR or MODIFIED_DIETZ_MWR.
    #[arg(long, default_value = "TRUE_TWR")]
    calculator: CalculatorType,

    /// First day of the period (format: YYYY-MM-DD). Defaults to the analysis start.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the period (format: YYYY-MM-DD). Defaults to the analysis end.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Value before the period. Defaults to the valuation on the day before `from`, or zero.
    #[arg(long)]
    start_value: Option<Decimal>,

    /// Value at the end of the period. Defaults to the valuation on `to`.
    #[arg(long)]
    end_value: Option<Decimal>,

    /// Annualize the result when the period is longer than a year.
    #[arg(long)]
    annualize: bool,
}

/// A reconciled flow and valuation series as produced upstream.
#[derive(Debug, Deserialize)]
struct InputDocument {
    analysis_start: NaiveDate,
    analysis_end: NaiveDate,
    #[serde(default)]
    investment_start: Option<NaiveDate>,
    #[serde(default)]
    investment_end: Option<NaiveDate>,
    #[serde(default)]
    asset_values: Vec<DateAmount>,
    #[serde(default)]
    flows: Vec<DateAmount>,
    #[serde(default)]
    incomes: Option<Vec<DateAmount>>,
}

impl InputDocument {
    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse input {}", path.display()))
    }

    fn asset_value(&self, date: NaiveDate) -> Option<Decimal> {
        self.asset_values.iter().find(|v| v.date == date).map(|v| v.amount)
    }
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_analyze(args: AnalyzeArgs, settings: &AnalysisSettings) -> Result<()> {
    let mut requests = Vec::with_capacity(args.input.len());
    for path in &args.input {
        let document = InputDocument::read(path)?;
        let mut builder = settings
            .request_builder()?
            .analysis_start_date_incl(document.analysis_start)
            .analysis_end_date_incl(document.analysis_end)
            .asset_values(document.asset_values)
            .flows(document.flows);
        if let Some(start) = document.investment_start {
            builder = builder.investment_start_date_incl(start);
        }
        if let Some(end) = document.investment_end {
            builder = builder.investment_end_date_incl(end);
        }
        if let Some(incomes) = document.incomes {
            builder = builder.incomes(incomes);
        }
        if let Some(unit) = args.unit {
            builder = builder.result_period_unit(unit);
        }
        let request = builder
            .build()
            .with_context(|| format!("Invalid input {}", path.display()))?;
        requests.push(request);
    }

    let analyzer = PerformanceAnalyzer::new();
    let results = analyzer.analyze_all(&requests);

    let mut reports = Vec::with_capacity(results.len());
    for ((path, request), result) in args.input.iter().zip(&requests).zip(results) {
        let rows = result.with_context(|| format!("Analysis of {} failed", path.display()))?;
        reports.push((path, request, rows));
    }

    if args.json {
        let documents: Vec<serde_json::Value> = reports
            .iter()
            .map(|(path, _, rows)| serde_json::json!({ "input": path.display().to_string(), "rows": rows }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&documents)?);
    } else {
        for (path, request, rows) in &reports {
            println!("{}", path.display());
            println!("{}", render_table(request, rows));
        }
    }
    Ok(())
}

fn handle_return(args: ReturnArgs, settings: &AnalysisSettings) -> Result<()> {
    let document = InputDocument::read(&args.input)?;
    let from = args.from.unwrap_or(document.analysis_start);
    let to = args.to.unwrap_or(document.analysis_end);

    let start_value = match args.start_value {
        Some(value) => value,
        None => from
            .pred_opt()
            .and_then(|day_before| document.asset_value(day_before))
            .unwrap_or(Decimal::ZERO),
    };
    let Some(end_value) = args.end_value.or_else(|| document.asset_value(to)) else {
        bail!("No valuation on {to}; pass --end-value");
    };

    let flow_timing = match args.calculator {
        CalculatorType::ModifiedDietzMwr => settings.mwr_flow_timing,
        _ => settings.twr_flow_timing,
    };
    let annualization = if args.annualize {
        AnnualizationOption::AnnualizeIfOverOneYear
    } else {
        AnnualizationOption::DoNotAnnualize
    };
    let request = settings
        .calc_request_builder(flow_timing, annualization)
        .start_date_incl(from)
        .end_date_incl(to)
        .start_asset_value_excl(start_value)
        .end_asset_value_incl(end_value)
        .asset_values(document.asset_values)
        .flows(document.flows)
        .build()?;

    let result = create_calculator(args.calculator).calculate_return(&request)?;
    tracing::info!(calculator = %args.calculator, %from, %to, "Return calculated.");
    println!("{result}");
    Ok(())
}

// ==============================================================================
// Output
// ==============================================================================

fn render_table(request: &PerfAnalysisRequest, rows: &[PerfAnalysis]) -> Table {
    let metrics = request.metrics();
    let mut header = vec![
        "Period", "Start value", "End value", "Flow", "TWR", "Cum. TWR", "Ann. TWR",
    ];
    if metrics.calculate_mwr {
        header.extend(["Cum. MWR", "Ann. MWR"]);
    }
    header.extend(["Profit", "Total profit"]);
    if metrics.calculate_period_income {
        header.push("Income");
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);

    for row in rows {
        let mut cells = vec![
            row.period_caption.clone(),
            row.period_start_asset_value_excl.to_string(),
            row.period_end_asset_value_incl.to_string(),
            row.period_flow.to_string(),
            row.period_twr.to_string(),
            row.cumulative_twr.to_string(),
            row.annualized_twr.to_string(),
        ];
        if metrics.calculate_mwr {
            cells.push(optional(row.cumulative_mwr));
            cells.push(optional(row.annualized_mwr));
        }
        cells.push(row.period_profit.to_string());
        cells.push(row.total_profit.to_string());
        if metrics.calculate_period_income {
            cells.push(optional(row.period_income));
        }
        table.add_row(cells);
    }
    table
}

fn optional(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
