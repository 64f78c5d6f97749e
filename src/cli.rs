//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CryptoCsvAdapter;
use crate::adapters::csv_report_adapter::{LabeledSeriesCsvReport, OutcomeCsvReport};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart_adapter::SvgChartReport;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestEngine, BacktestResult};
use crate::domain::condition::Condition;
use crate::domain::config_validation::{
    parse_asset, parse_date, parse_entry_rule, parse_factors, parse_period_days, parse_start_from,
    validate_backtest_config,
};
use crate::domain::entry::{AlwaysEnter, EntrySignal};
use crate::domain::error::SpreadtesterError;
use crate::domain::price_bar::{ensure_ordered, Asset};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "spreadtester",
    about = "Backtest condor and vertical spread conditions on crypto price history"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [backtest] asset
        #[arg(long)]
        asset: Option<String>,
        /// Overrides [backtest] start_from (YYYY-MM-DD)
        #[arg(long)]
        start_from: Option<String>,
        /// Directory the [output] files are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range per asset
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            asset,
            start_from,
            output_dir,
        } => run_backtest(
            &config,
            asset.as_deref(),
            start_from.as_deref(),
            output_dir.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, asset } => run_info(&config, asset.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// Prints `err` and maps it to its exit code. Rule errors are shown with a
/// caret under the offending position of the configured rule.
fn report_error(err: &SpreadtesterError, config: &dyn ConfigPort) -> ExitCode {
    match (err, config.get_non_empty("backtest", "entry_rule")) {
        (SpreadtesterError::RuleParse(parse_err), Some(text)) => {
            eprintln!(
                "error: failed to parse entry_rule:\n{}",
                parse_err.display_with_context(&text)
            );
        }
        _ => eprintln!("error: {err}"),
    }
    err.into()
}

/// Directory relative data paths are resolved against.
fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Condition template for the configured period and factors around `open_price`.
pub fn build_condition(config: &dyn ConfigPort, open_price: f64) -> Result<Condition, SpreadtesterError> {
    let period_days = parse_period_days(config)?;
    let factors = parse_factors(config)?;
    Ok(Condition::new(open_price, period_days, factors)?)
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SpreadtesterError> {
    let asset = parse_asset(config)?;
    let name = config
        .get_non_empty("backtest", "name")
        .unwrap_or_else(|| format!("{asset} backtest"));
    Ok(BacktestConfig {
        name,
        asset,
        start_from: parse_start_from(config)?,
        parallel: config.get_bool("backtest", "parallel", false),
    })
}

/// Applies `--asset` and `--start-from` on top of the file configuration.
pub fn apply_overrides(
    mut bt_config: BacktestConfig,
    asset: Option<&str>,
    start_from: Option<&str>,
) -> Result<BacktestConfig, SpreadtesterError> {
    if let Some(asset) = asset {
        bt_config.asset = asset.parse().map_err(|reason| SpreadtesterError::ConfigInvalid {
            section: "backtest".into(),
            key: "asset".into(),
            reason,
        })?;
    }
    if let Some(date) = start_from {
        let date = parse_date(date).map_err(|_| SpreadtesterError::ConfigInvalid {
            section: "backtest".into(),
            key: "start_from".into(),
            reason: "invalid date format (expected YYYY-MM-DD)".into(),
        })?;
        bt_config.start_from = Some(date);
    }
    Ok(bt_config)
}

/// The configured entry rule, or [`AlwaysEnter`] when none is set.
pub fn build_entry_signal(
    config: &dyn ConfigPort,
) -> Result<Box<dyn EntrySignal + Sync>, SpreadtesterError> {
    Ok(match parse_entry_rule(config)? {
        Some(rule) => Box::new(rule),
        None => Box::new(AlwaysEnter),
    })
}

/// Loads the asset's series and runs the engine over it. A start date past
/// the end of the data yields an empty result, not an error.
pub fn run_backtest_pipeline(
    data_port: &dyn MarketDataPort,
    template: Condition,
    bt_config: &BacktestConfig,
    entry: &(dyn EntrySignal + Sync),
) -> Result<BacktestResult, SpreadtesterError> {
    let series = data_port.load_series(bt_config.asset)?;
    if series.is_empty() {
        return Err(SpreadtesterError::NoData {
            asset: bt_config.asset.to_string(),
        });
    }
    ensure_ordered(&series, bt_config.asset.code())?;

    let mut engine = BacktestEngine::new(template);
    if let Some(date) = bt_config.start_from {
        engine = engine.starting_from(date);
    }

    Ok(backtest_engine::run_backtest(&engine, &series, entry, bt_config))
}

/// Writes every output configured under `[output]`, returning the paths written.
pub fn write_outputs(
    result: &BacktestResult,
    config: &dyn ConfigPort,
    output_dir: Option<&Path>,
) -> Result<Vec<PathBuf>, SpreadtesterError> {
    let reports: [(&str, &dyn ReportPort); 3] = [
        ("outcomes", &OutcomeCsvReport),
        ("labeled_series", &LabeledSeriesCsvReport),
        ("chart", &SvgChartReport),
    ];

    let mut written = Vec::new();
    for (key, report) in reports {
        let Some(file) = config.get_non_empty("output", key) else {
            continue;
        };
        let path = match output_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        };
        report.write(result, &path)?;
        written.push(path);
    }
    Ok(written)
}

pub fn print_summary(result: &BacktestResult, template: &Condition) {
    let summary = result.summary();
    println!("=== {} ===", result.name);
    println!("Strategy:         {}", template.strategy());
    println!("Period:           {} days", template.period_days());
    println!("Windows:          {}", result.records.len());
    println!("Positions:        {}", summary.total_positions);
    println!("Profitable:       {:.2}%", summary.percent_profitable);
    println!("Unprofitable:     {:.2}%", summary.percent_unprofitable);
    println!("Liquidated:       {:.2}%", summary.percent_liquidated);
}

type PreparedBacktest = (
    BacktestConfig,
    Condition,
    Box<dyn EntrySignal + Sync>,
    CryptoCsvAdapter,
);

fn prepare_backtest(
    adapter: &FileConfigAdapter,
    config_path: &Path,
    asset_override: Option<&str>,
    start_override: Option<&str>,
) -> Result<PreparedBacktest, SpreadtesterError> {
    validate_backtest_config(adapter)?;
    let bt_config = apply_overrides(build_backtest_config(adapter)?, asset_override, start_override)?;
    let template = build_condition(adapter, 0.0)?;
    let entry = build_entry_signal(adapter)?;
    let data_port = CryptoCsvAdapter::from_config(adapter, &config_dir(config_path))?;
    Ok((bt_config, template, entry, data_port))
}

fn run_backtest(
    config_path: &Path,
    asset_override: Option<&str>,
    start_override: Option<&str>,
    output_dir: Option<&Path>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let (bt_config, template, entry, data_port) =
        match prepare_backtest(&adapter, config_path, asset_override, start_override) {
            Ok(p) => p,
            Err(e) => return report_error(&e, &adapter),
        };

    eprintln!(
        "Running {} on {} ({}, {} day windows)",
        bt_config.name,
        bt_config.asset,
        template.strategy(),
        template.period_days()
    );
    let result = match run_backtest_pipeline(&data_port, template.clone(), &bt_config, entry.as_ref()) {
        Ok(r) => r,
        Err(e) => return report_error(&e, &adapter),
    };

    if result.records.is_empty() {
        eprintln!("warning: no bars on or after the start date");
    }
    print_summary(&result, &template);

    match write_outputs(&result, &adapter, output_dir) {
        Ok(paths) => {
            for path in paths {
                eprintln!("Wrote {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e, &adapter),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let checked = validate_backtest_config(&adapter).and_then(|()| {
        Ok((
            build_backtest_config(&adapter)?,
            build_condition(&adapter, 1.0)?,
            parse_entry_rule(&adapter)?,
        ))
    });
    let (bt_config, condition, rule) = match checked {
        Ok(c) => c,
        Err(e) => return report_error(&e, &adapter),
    };

    eprintln!("\nBacktest: {} on {}", bt_config.name, bt_config.asset);
    if let Some(date) = bt_config.start_from {
        eprintln!("Start from: {date}");
    }
    match rule {
        Some(rule) => eprintln!("Entry rule: {rule}"),
        None => eprintln!("Entry rule: (none, enter on every window)"),
    }
    eprintln!("\nCondition at open price 1:\n{condition}");
    eprintln!("Configuration is valid");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, asset: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let assets: Vec<Asset> = match asset {
        Some(a) => match a.parse() {
            Ok(asset) => vec![asset],
            Err(reason) => {
                eprintln!("error: {reason}");
                return ExitCode::from(2);
            }
        },
        None => Asset::ALL.to_vec(),
    };

    let data_port = match CryptoCsvAdapter::from_config(&adapter, &config_dir(config_path)) {
        Ok(p) => p,
        Err(e) => return report_error(&e, &adapter),
    };

    for asset in assets {
        match data_port.data_range(asset) {
            Ok(Some((first, last, count))) => {
                println!("{asset}: {first} to {last} ({count} bars)");
            }
            Ok(None) => println!("{asset}: no data"),
            Err(SpreadtesterError::ConfigMissing { key, .. }) => {
                eprintln!("{asset}: not configured ([data] {key} missing)");
            }
            Err(e) => return report_error(&e, &adapter),
        }
    }
    ExitCode::SUCCESS
}
