//! Parallel parameter sweeps over lookback and cost rate.
//!
//! Runs share the price history read-only. A failed run is reported in its
//! own outcome and never stops the others.

use crate::domain::backtest::{BacktestConfig, run_backtest};
use crate::domain::error::DualmomError;
use crate::domain::metrics::Metrics;
use crate::domain::price::PriceHistory;
use crate::domain::universe::Universe;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepParams {
    pub lookback_months: u32,
    pub cost_rate: f64,
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub params: SweepParams,
    pub result: Result<Metrics, DualmomError>,
}

/// Cartesian grid, lookback-major, in the order given.
pub fn sweep_grid(lookback_months: &[u32], cost_rates: &[f64]) -> Vec<SweepParams> {
    lookback_months
        .iter()
        .flat_map(|&lookback_months| {
            cost_rates.iter().map(move |&cost_rate| SweepParams {
                lookback_months,
                cost_rate,
            })
        })
        .collect()
}

pub fn run_sweep(
    history: &PriceHistory,
    universe: &Universe,
    base: &BacktestConfig,
    grid: &[SweepParams],
    risk_free_rate: f64,
) -> Vec<SweepOutcome> {
    tracing::info!(runs = grid.len(), "starting parameter sweep");

    grid.par_iter()
        .map(|&params| {
            let config = BacktestConfig {
                lookback_months: params.lookback_months,
                cost_rate: params.cost_rate,
                ..base.clone()
            };
            let result = run_backtest(history, universe, &config)
                .map(|r| Metrics::compute(&r, config.initial_capital, risk_free_rate));
            if let Err(e) = &result {
                tracing::error!(
                    lookback_months = params.lookback_months,
                    cost_rate = params.cost_rate,
                    error = %e,
                    "sweep run failed"
                );
            }
            SweepOutcome { params, result }
        })
        .collect()
}
