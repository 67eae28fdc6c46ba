//! CLI definition and dispatch.

use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, load_price_history, run_backtest};
use crate::domain::calendar::lookback_date;
use crate::domain::config_validation::{
    DEFAULT_INITIAL_CAPITAL, DEFAULT_LOOKBACK_MONTHS, DEFAULT_TRADE_DAY, parse_date,
    validate_backtest_config, validate_data_config, validate_sweep_config,
    validate_universe_config,
};
use crate::domain::diagnostic::Diagnostics;
use crate::domain::error::DualmomError;
use crate::domain::metrics::Metrics;
use crate::domain::momentum::{RebalanceDecision, momentum, rebalance_weights};
use crate::domain::price::group_by_symbol;
use crate::domain::sweep::{SweepOutcome, run_sweep, sweep_grid};
use crate::domain::universe::Universe;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "dualmom", about = "Dual-momentum portfolio rebalancing backtester")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the configured date range
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the allocation the rule picks on one trade date
    Weights {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        date: NaiveDate,
    },
    /// Show one symbol's trailing momentum
    Momentum {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        date: NaiveDate,
    },
    /// Run the lookback and cost-rate grid in parallel
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Load a date,ticker,price sheet into the SQLite store
    #[cfg(feature = "sqlite")]
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        sheet: PathBuf,
    },
    /// Show the stored data range for each universe symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(tracing_subscriber::filter::Targets::new().with_default(level));
    // A second call (repeated `run` in one process) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Backtest { config, dry_run } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest_command(&config)
            }
        }
        Command::Weights { config, date } => run_weights(&config, date),
        Command::Momentum {
            config,
            symbol,
            date,
        } => run_momentum(&config, &symbol, date),
        Command::Sweep { config } => run_sweep_command(&config),
        #[cfg(feature = "sqlite")]
        Command::Import { config, sheet } => run_import(&config, &sheet),
        Command::Info { config } => run_info(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, DualmomError> {
    FileConfigAdapter::from_file(path).map_err(|e| DualmomError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, DualmomError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    Ok(BacktestConfig {
        start_date,
        end_date,
        trade_day_of_month: u32::try_from(config.get_int(
            "backtest",
            "trade_day",
            DEFAULT_TRADE_DAY,
        ))
        .unwrap_or(0),
        lookback_months: u32::try_from(config.get_int(
            "backtest",
            "lookback_months",
            DEFAULT_LOOKBACK_MONTHS,
        ))
        .unwrap_or(0),
        initial_capital: config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        cost_rate: config.get_double("backtest", "cost_rate", 0.0),
    })
}

pub fn risk_free_rate(config: &dyn ConfigPort) -> f64 {
    config.get_double("backtest", "risk_free_rate", 0.0)
}

/// Build the configured price source.
pub fn open_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, DualmomError> {
    validate_data_config(config)?;
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .trim()
        .to_lowercase();

    if source == "sqlite" {
        #[cfg(feature = "sqlite")]
        {
            use crate::adapters::sqlite_adapter::SqliteAdapter;
            return Ok(Box::new(SqliteAdapter::from_config(config)?));
        }

        #[cfg(not(feature = "sqlite"))]
        {
            return Err(DualmomError::ConfigInvalid {
                section: "data".into(),
                key: "source".into(),
                reason: "sqlite feature is required for source = sqlite".into(),
            });
        }
    }

    let csv_dir = config
        .get_string("data", "csv_dir")
        .ok_or_else(|| DualmomError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })?;
    Ok(Box::new(CsvAdapter::new(PathBuf::from(csv_dir.trim()))))
}

/// Validate config, build the universe and run config in one step.
pub fn prepare(config: &dyn ConfigPort) -> Result<(Universe, BacktestConfig), DualmomError> {
    validate_backtest_config(config)?;
    let universe = validate_universe_config(config)?;
    let bt_config = build_backtest_config(config)?;
    bt_config.validate()?;
    Ok((universe, bt_config))
}

/// Load prices, run the backtest and compute its metrics.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    universe: &Universe,
    bt_config: &BacktestConfig,
    risk_free_rate: f64,
) -> Result<(BacktestResult, Metrics), DualmomError> {
    let (history, load_diagnostics) = load_price_history(
        data_port,
        universe,
        bt_config.start_date,
        bt_config.end_date,
        bt_config.lookback_months,
    );

    if history.values().all(|prices| prices.is_empty()) {
        return Err(DualmomError::NoData {
            symbol: universe.all_symbols().join(", "),
        });
    }

    let mut result = run_backtest(&history, universe, bt_config)?;
    let mut diagnostics = load_diagnostics;
    diagnostics.extend(result.diagnostics);
    result.diagnostics = diagnostics;

    let metrics = Metrics::compute(&result, bt_config.initial_capital, risk_free_rate);
    Ok((result, metrics))
}

/// Allocation on one trade date, with any fetch failures folded into its diagnostics.
pub fn weights_on(
    data_port: &dyn DataPort,
    universe: &Universe,
    date: NaiveDate,
    lookback_months: u32,
) -> RebalanceDecision {
    let (history, mut diagnostics) =
        load_price_history(data_port, universe, date, date, lookback_months);
    let mut decision = rebalance_weights(&history, universe, date, lookback_months);
    diagnostics.extend(decision.diagnostics);
    decision.diagnostics = diagnostics;
    decision
}

/// Loads history once for the longest lookback and runs every grid point on it.
/// The returned diagnostics are the fetch failures shared by all runs.
pub fn run_sweep_pipeline(
    data_port: &dyn DataPort,
    universe: &Universe,
    base: &BacktestConfig,
    lookbacks: &[u32],
    cost_rates: &[f64],
    risk_free_rate: f64,
) -> Result<(Vec<SweepOutcome>, Diagnostics), DualmomError> {
    let longest = lookbacks.iter().copied().max().unwrap_or(base.lookback_months);
    let (history, diagnostics) = load_price_history(
        data_port,
        universe,
        base.start_date,
        base.end_date,
        longest,
    );

    if history.values().all(|prices| prices.is_empty()) {
        return Err(DualmomError::NoData {
            symbol: universe.all_symbols().join(", "),
        });
    }

    let grid = sweep_grid(lookbacks, cost_rates);
    let outcomes = run_sweep(&history, universe, base, &grid, risk_free_rate);
    Ok((outcomes, diagnostics))
}

fn run_backtest_command(config_path: &PathBuf) -> Result<(), DualmomError> {
    tracing::info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let (universe, bt_config) = prepare(&config)?;
    let data_port = open_data_port(&config)?;

    let (result, metrics) = run_backtest_pipeline(
        data_port.as_ref(),
        &universe,
        &bt_config,
        risk_free_rate(&config),
    )?;

    println!("date,nav,cost,risk_off,weights");
    for period in &result.periods {
        let weights: Vec<String> = period
            .weights
            .iter()
            .map(|(symbol, weight)| format!("{symbol}={weight:.2}"))
            .collect();
        println!(
            "{},{:.2},{:.4},{},{}",
            period.date,
            period.nav,
            period.cost,
            period.risk_off,
            weights.join(" ")
        );
    }

    print_summary(&metrics, result.diagnostics.len());
    Ok(())
}

fn print_summary(metrics: &Metrics, diagnostics: usize) {
    eprintln!("\n=== Results ===");
    eprintln!("Final NAV:        {:.2}", metrics.final_nav);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Annualized:       {:.2}%",
        metrics.annualized_return * 100.0
    );
    eprintln!(
        "Volatility:       {:.2}%",
        metrics.annualized_volatility * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", metrics.max_drawdown * 100.0);
    eprintln!("Total Cost:       {:.2}", metrics.total_cost);
    eprintln!(
        "Periods:          {} ({} risk-off)",
        metrics.periods, metrics.risk_off_periods
    );
    eprintln!("Diagnostics:      {}", diagnostics);
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    eprintln!("Diagnostics:      {}", diagnostics.len());
}

pub fn run_dry_run(config_path: &PathBuf) -> Result<(), DualmomError> {
    tracing::info!(path = %config_path.display(), "loading config");
    let config = load_config(config_path)?;
    let (universe, bt_config) = prepare(&config)?;
    validate_data_config(&config)?;

    eprintln!("Config validated successfully");
    eprintln!("\nUniverse:");
    eprintln!("  risk assets: {}", universe.risk_assets().join(", "));
    eprintln!("  gauge:       {}", universe.gauge());
    eprintln!("  cash:        {}", universe.cash());
    eprintln!("\nBacktest:");
    eprintln!(
        "  range:       {} to {}",
        bt_config.start_date, bt_config.end_date
    );
    eprintln!("  trade day:   {}", bt_config.trade_day_of_month);
    eprintln!("  lookback:    {} months", bt_config.lookback_months);
    eprintln!("  capital:     {:.2}", bt_config.initial_capital);
    eprintln!("  cost rate:   {}", bt_config.cost_rate);

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_weights(config_path: &PathBuf, date: NaiveDate) -> Result<(), DualmomError> {
    let config = load_config(config_path)?;
    let universe = validate_universe_config(&config)?;
    let lookback_months = lookback_from(&config)?;
    let data_port = open_data_port(&config)?;

    let decision = weights_on(data_port.as_ref(), &universe, date, lookback_months);

    match decision.gauge_momentum {
        Some(m) => eprintln!("gauge {}: {:+.4}", universe.gauge(), m),
        None => eprintln!("gauge {}: unavailable", universe.gauge()),
    }
    for (symbol, value) in &decision.momenta {
        match value {
            Some(m) => eprintln!("  {symbol}: {m:+.4}"),
            None => eprintln!("  {symbol}: unavailable"),
        }
    }
    if decision.risk_off {
        eprintln!("risk-off: holding {}", universe.cash());
    }

    for (symbol, weight) in universe.trading_weights(&decision.weights).iter() {
        println!("{symbol},{weight}");
    }
    print_diagnostics(&decision.diagnostics);
    Ok(())
}

fn run_momentum(config_path: &PathBuf, symbol: &str, date: NaiveDate) -> Result<(), DualmomError> {
    let config = load_config(config_path)?;
    let lookback_months = lookback_from(&config)?;
    let data_port = open_data_port(&config)?;

    let symbol = symbol.trim().to_uppercase();
    let past = lookback_date(date, lookback_months).unwrap_or(date);
    let prices = data_port.fetch_prices(&symbol, past - Duration::days(7), date)?;
    let history = group_by_symbol(prices);

    match momentum(&symbol, &history, date, lookback_months) {
        Some(m) => println!("{symbol},{date},{m}"),
        None => {
            eprintln!(
                "{symbol}: momentum unavailable on {date} ({lookback_months}-month lookback)"
            );
            println!("{symbol},{date},");
        }
    }
    Ok(())
}

fn lookback_from(config: &dyn ConfigPort) -> Result<u32, DualmomError> {
    let value = config.get_int("backtest", "lookback_months", DEFAULT_LOOKBACK_MONTHS);
    match u32::try_from(value) {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(DualmomError::ConfigInvalid {
            section: "backtest".into(),
            key: "lookback_months".into(),
            reason: "lookback_months must be at least 1".into(),
        }),
    }
}

fn run_sweep_command(config_path: &PathBuf) -> Result<(), DualmomError> {
    let config = load_config(config_path)?;
    let (universe, base) = prepare(&config)?;
    let (lookbacks, cost_rates) = validate_sweep_config(&config)?;
    let data_port = open_data_port(&config)?;

    let (outcomes, diagnostics) = run_sweep_pipeline(
        data_port.as_ref(),
        &universe,
        &base,
        &lookbacks,
        &cost_rates,
        risk_free_rate(&config),
    )?;

    println!("lookback_months,cost_rate,final_nav,total_return,sharpe_ratio,max_drawdown");
    for outcome in &outcomes {
        match &outcome.result {
            Ok(m) => println!(
                "{},{},{:.2},{:.4},{:.4},{:.4}",
                outcome.params.lookback_months,
                outcome.params.cost_rate,
                m.final_nav,
                m.total_return,
                m.sharpe_ratio,
                m.max_drawdown
            ),
            Err(e) => eprintln!(
                "lookback {} cost {}: {}",
                outcome.params.lookback_months, outcome.params.cost_rate, e
            ),
        }
    }
    print_diagnostics(&diagnostics);
    Ok(())
}

#[cfg(feature = "sqlite")]
fn run_import(config_path: &PathBuf, sheet: &PathBuf) -> Result<(), DualmomError> {
    use crate::adapters::csv_adapter::read_price_sheet;
    use crate::adapters::sqlite_adapter::SqliteAdapter;

    let config = load_config(config_path)?;
    let prices = read_price_sheet(sheet)?;
    let store = SqliteAdapter::from_config(&config)?;
    let written = store.upsert_prices(&prices)?;
    eprintln!("Imported {} rows from {}", written, sheet.display());
    Ok(())
}

fn run_info(config_path: &PathBuf) -> Result<(), DualmomError> {
    let config = load_config(config_path)?;
    let universe = validate_universe_config(&config)?;
    let data_port = open_data_port(&config)?;

    for symbol in universe.all_symbols() {
        match data_port.get_data_range(&symbol) {
            Ok(Some((first, last, count))) => {
                println!("{symbol}: {count} prices, {first} to {last}");
            }
            Ok(None) => eprintln!("{symbol}: no data found"),
            Err(e) => eprintln!("error querying {symbol}: {e}"),
        }
    }
    Ok(())
}
