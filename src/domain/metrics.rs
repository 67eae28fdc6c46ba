//! Run summary statistics over the per-period NAV series.

use super::backtest::{BacktestResult, PeriodRecord};

/// Rebalances happen monthly.
const PERIODS_PER_YEAR: f64 = 12.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_nav: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub total_cost: f64,
    pub periods: usize,
    pub risk_off_periods: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, initial_capital: f64, risk_free_rate: f64) -> Self {
        let periods = &result.periods;
        let final_nav = periods.last().map(|p| p.nav).unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_nav - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = match (periods.first(), periods.last()) {
            (Some(first), Some(last)) => (last.date - first.date).num_days() as f64 / DAYS_PER_YEAR,
            _ => 0.0,
        };
        let annualized_return = if years > 0.0 && total_return > -1.0 {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (annualized_volatility, sharpe_ratio) = compute_risk_adjusted(periods, risk_free_rate);
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(periods);

        Metrics {
            final_nav,
            total_return,
            annualized_return,
            annualized_volatility,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_cost: result.total_cost,
            periods: periods.len(),
            risk_off_periods: periods.iter().filter(|p| p.risk_off).count(),
        }
    }
}

fn compute_drawdown(periods: &[PeriodRecord]) -> (f64, usize) {
    let Some(first) = periods.first() else {
        return (0.0, 0);
    };

    let mut peak = first.nav;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for period in periods {
        if period.nav >= peak {
            peak = period.nav;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - period.nav) / peak);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(periods: &[PeriodRecord], risk_free_rate: f64) -> (f64, f64) {
    if periods.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = periods
        .windows(2)
        .map(|w| {
            if w[0].nav > 0.0 {
                (w[1].nav - w[0].nav) / w[0].nav
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let volatility = stddev * PERIODS_PER_YEAR.sqrt();
    let sharpe = if stddev > 0.0 {
        (mean - risk_free_rate / PERIODS_PER_YEAR) / stddev * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (volatility, sharpe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::allocation::AllocationWeights;
    use crate::domain::diagnostic::Diagnostics;
    use chrono::{Months, NaiveDate};

    fn make_result(navs: &[f64], risk_off: &[bool]) -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let periods: Vec<PeriodRecord> = navs
            .iter()
            .enumerate()
            .map(|(i, &nav)| PeriodRecord {
                date: start + Months::new(i as u32),
                weights: AllocationWeights::default(),
                nav,
                cost: 0.5,
                risk_off: risk_off.get(i).copied().unwrap_or(false),
            })
            .collect();
        BacktestResult {
            final_nav: navs.last().copied().unwrap_or(0.0),
            total_cost: 0.5 * navs.len() as f64,
            periods,
            diagnostics: Diagnostics::new(),
        }
    }

    #[test]
    fn empty_run() {
        let metrics = Metrics::compute(&make_result(&[], &[]), 1000.0, 0.0);
        assert_eq!(metrics.final_nav, 1000.0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.annualized_return, 0.0);
        assert_eq!(metrics.periods, 0);
    }

    #[test]
    fn total_return_and_cost() {
        let metrics = Metrics::compute(&make_result(&[1000.0, 1050.0, 1100.0], &[]), 1000.0, 0.0);
        assert!((metrics.total_return - 0.10).abs() < 1e-9);
        assert!((metrics.total_cost - 1.5).abs() < 1e-9);
        assert_eq!(metrics.periods, 3);
    }

    #[test]
    fn annualized_return_over_one_year() {
        let mut navs = vec![1000.0; 12];
        navs.push(1100.0);
        let metrics = Metrics::compute(&make_result(&navs, &[]), 1000.0, 0.0);
        // 2024-01-15 to 2025-01-15 is 366 days
        let years = 366.0 / 365.25;
        let expected = 1.1_f64.powf(1.0 / years) - 1.0;
        assert!((metrics.annualized_return - expected).abs() < 1e-9);
    }

    #[test]
    fn flat_series_has_no_volatility() {
        let metrics = Metrics::compute(&make_result(&[1000.0; 6], &[]), 1000.0, 0.02);
        assert_eq!(metrics.annualized_volatility, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
    }

    #[test]
    fn rising_series_has_positive_sharpe() {
        let navs: Vec<f64> = (0..12).map(|i| 1000.0 * (1.0 + 0.01 * i as f64 + 0.002 * (i % 2) as f64)).collect();
        let metrics = Metrics::compute(&make_result(&navs, &[]), 1000.0, 0.0);
        assert!(metrics.sharpe_ratio > 0.0);
        assert!(metrics.annualized_volatility > 0.0);
    }

    #[test]
    fn max_drawdown() {
        let navs = [100.0, 110.0, 90.0, 95.0, 80.0, 100.0];
        let metrics = Metrics::compute(&make_result(&navs, &[]), 100.0, 0.0);
        assert!((metrics.max_drawdown - (110.0 - 80.0) / 110.0).abs() < 1e-9);
        assert_eq!(metrics.max_drawdown_duration, 4);
    }

    #[test]
    fn drawdown_resets_at_new_peak() {
        let navs = [100.0, 90.0, 120.0, 110.0];
        let metrics = Metrics::compute(&make_result(&navs, &[]), 100.0, 0.0);
        assert!((metrics.max_drawdown - 0.10).abs() < 1e-9);
        assert_eq!(metrics.max_drawdown_duration, 1);
    }

    #[test]
    fn counts_risk_off_periods() {
        let metrics = Metrics::compute(
            &make_result(&[1000.0, 1000.0, 1000.0], &[true, false, true]),
            1000.0,
            0.0,
        );
        assert_eq!(metrics.risk_off_periods, 2);
    }
}
