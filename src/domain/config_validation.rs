//! Configuration validation.
//!
//! Every check runs before the first period is simulated.

use crate::domain::error::DualmomError;
use crate::domain::universe::{
    DEFAULT_CASH, DEFAULT_GAUGE, DEFAULT_RISK_ASSETS, Universe, parse_symbols,
};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 1000.0;
pub const DEFAULT_LOOKBACK_MONTHS: i64 = 3;
pub const DEFAULT_TRADE_DAY: i64 = 1;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    validate_initial_capital(config)?;
    validate_cost_rate(config)?;
    validate_risk_free_rate(config)?;
    validate_lookback(config)?;
    validate_trade_day(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_universe_config(config: &dyn ConfigPort) -> Result<Universe, DualmomError> {
    let risk_assets = match config.get_string("universe", "risk_assets") {
        Some(s) => parse_symbols(&s)?,
        None => DEFAULT_RISK_ASSETS.iter().map(|s| s.to_string()).collect(),
    };
    let gauge = config
        .get_string("universe", "gauge")
        .unwrap_or_else(|| DEFAULT_GAUGE.to_string());
    let cash = config
        .get_string("universe", "cash")
        .unwrap_or_else(|| DEFAULT_CASH.to_string());
    Ok(Universe::new(risk_assets, gauge, cash)?)
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => require(config, "data", "csv_dir"),
        "sqlite" => require(config, "sqlite", "path"),
        other => Err(invalid(
            "data",
            "source",
            &format!("unknown source {other:?}, expected csv or sqlite"),
        )),
    }
}

pub fn validate_sweep_config(config: &dyn ConfigPort) -> Result<(Vec<u32>, Vec<f64>), DualmomError> {
    let lookbacks = config
        .get_list("sweep", "lookback_months")
        .iter()
        .map(|s| match s.parse::<u32>() {
            Ok(v) if v >= 1 => Ok(v),
            _ => Err(invalid(
                "sweep",
                "lookback_months",
                &format!("{s:?} is not a positive integer"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let cost_rates = config
        .get_list("sweep", "cost_rates")
        .iter()
        .map(|s| match s.parse::<f64>() {
            Ok(v) if (0.0..1.0).contains(&v) => Ok(v),
            _ => Err(invalid(
                "sweep",
                "cost_rates",
                &format!("{s:?} is not a rate in [0, 1)"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if lookbacks.is_empty() {
        return Err(DualmomError::ConfigMissing {
            section: "sweep".into(),
            key: "lookback_months".into(),
        });
    }
    if cost_rates.is_empty() {
        return Err(DualmomError::ConfigMissing {
            section: "sweep".into(),
            key: "cost_rates".into(),
        });
    }
    Ok((lookbacks, cost_rates))
}

fn invalid(section: &str, key: &str, reason: &str) -> DualmomError {
    DualmomError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), DualmomError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(DualmomError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = config.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL);
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_cost_rate(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = config.get_double("backtest", "cost_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "cost_rate",
            "cost_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_lookback(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = config.get_int("backtest", "lookback_months", DEFAULT_LOOKBACK_MONTHS);
    if !(1..=120).contains(&value) {
        return Err(invalid(
            "backtest",
            "lookback_months",
            "lookback_months must be between 1 and 120",
        ));
    }
    Ok(())
}

fn validate_trade_day(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let value = config.get_int("backtest", "trade_day", DEFAULT_TRADE_DAY);
    if !(1..=31).contains(&value) {
        return Err(invalid(
            "backtest",
            "trade_day",
            "trade_day must be between 1 and 31",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), DualmomError> {
    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

/// Read a required `[backtest]` date in `YYYY-MM-DD` form.
pub fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<NaiveDate, DualmomError> {
    match config.get_string("backtest", field) {
        None => Err(DualmomError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "backtest",
                field,
                &format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}
