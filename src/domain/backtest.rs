//! Backtest driver: one rebalance per scheduled trade date.
//!
//! BacktestConfig defines the run parameters. The driver threads NAV and
//! holdings from each period into the next and collects every diagnostic.

use crate::domain::allocation::AllocationWeights;
use crate::domain::calendar::{lookback_date, trade_schedule};
use crate::domain::diagnostic::{Diagnostic, Diagnostics};
use crate::domain::error::DualmomError;
use crate::domain::momentum::rebalance_weights;
use crate::domain::price::PriceHistory;
use crate::domain::simulator::{Holdings, simulate_period, validate_cost_rate};
use crate::domain::universe::Universe;
use crate::ports::data_port::DataPort;
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trade_day_of_month: u32,
    pub lookback_months: u32,
    pub initial_capital: f64,
    pub cost_rate: f64,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), DualmomError> {
        if self.start_date >= self.end_date {
            return Err(invalid("start_date", "start_date must be before end_date"));
        }
        if !(1..=31).contains(&self.trade_day_of_month) {
            return Err(invalid("trade_day", "trade_day must be between 1 and 31"));
        }
        if self.lookback_months < 1 {
            return Err(invalid(
                "lookback_months",
                "lookback_months must be at least 1",
            ));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(invalid(
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
        validate_cost_rate(self.cost_rate)
    }
}

fn invalid(key: &str, reason: &str) -> DualmomError {
    DualmomError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRecord {
    pub date: NaiveDate,
    /// Trading-universe weights held after the rebalance.
    pub weights: AllocationWeights,
    pub nav: f64,
    pub cost: f64,
    pub risk_off: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub periods: Vec<PeriodRecord>,
    pub final_nav: f64,
    pub total_cost: f64,
    pub diagnostics: Diagnostics,
}

pub fn run_backtest(
    history: &PriceHistory,
    universe: &Universe,
    config: &BacktestConfig,
) -> Result<BacktestResult, DualmomError> {
    config.validate()?;

    let schedule = trade_schedule(
        config.start_date,
        config.end_date,
        config.trade_day_of_month,
    );
    tracing::info!(
        periods = schedule.len(),
        start = %config.start_date,
        end = %config.end_date,
        lookback_months = config.lookback_months,
        "running backtest"
    );

    let mut nav = config.initial_capital;
    let mut holdings = Holdings::default();
    let mut periods = Vec::with_capacity(schedule.len());
    let mut total_cost = 0.0;
    let mut diagnostics = Diagnostics::new();

    for trade_date in schedule {
        let decision = rebalance_weights(history, universe, trade_date, config.lookback_months);
        diagnostics.extend(decision.diagnostics);

        let weights = universe.trading_weights(&decision.weights);
        let outcome = simulate_period(
            history,
            universe,
            &weights,
            trade_date,
            nav,
            config.cost_rate,
            &holdings,
        )?;
        diagnostics.extend(outcome.diagnostics);

        nav = outcome.nav;
        total_cost += outcome.cost;
        holdings = outcome.holdings;
        periods.push(PeriodRecord {
            date: trade_date,
            weights,
            nav,
            cost: outcome.cost,
            risk_off: decision.risk_off,
        });
    }

    tracing::info!(final_nav = nav, total_cost, "backtest complete");

    Ok(BacktestResult {
        periods,
        final_nav: nav,
        total_cost,
        diagnostics,
    })
}

/// Days of slack before the first lookback date, covering weekend shifts.
const LOOKBACK_SLACK_DAYS: i64 = 7;

/// Fetch every universe symbol far enough back for the first lookback.
///
/// A port failure for one symbol is recorded and leaves that symbol empty.
pub fn load_price_history(
    data_port: &dyn DataPort,
    universe: &Universe,
    start_date: NaiveDate,
    end_date: NaiveDate,
    lookback_months: u32,
) -> (PriceHistory, Diagnostics) {
    let fetch_start = lookback_date(start_date, lookback_months)
        .unwrap_or(start_date)
        - Duration::days(LOOKBACK_SLACK_DAYS);
    let fetch_end = end_date + Duration::days(LOOKBACK_SLACK_DAYS);

    let mut history = PriceHistory::new();
    let mut diagnostics = Diagnostics::new();

    for symbol in universe.all_symbols() {
        match data_port.fetch_prices(&symbol, fetch_start, fetch_end) {
            Ok(prices) => {
                tracing::debug!(%symbol, rows = prices.len(), "loaded prices");
                history.insert(symbol, prices);
            }
            Err(e) => {
                diagnostics.record(Diagnostic::DataUnavailable {
                    symbol: symbol.clone(),
                    reason: e.to_string(),
                });
                history.insert(symbol, Vec::new());
            }
        }
    }

    (history, diagnostics)
}
