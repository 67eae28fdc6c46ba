#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use dualmom::domain::backtest::BacktestConfig;
use dualmom::domain::error::DualmomError;
pub use dualmom::domain::price::{PriceHistory, PriceObservation};
use dualmom::domain::universe::Universe;
use dualmom::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceObservation>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, prices: Vec<PriceObservation>) -> Self {
        self.data.insert(symbol.to_string(), prices);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceObservation>, DualmomError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(DualmomError::Database {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|prices| {
                prices
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, DualmomError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, DualmomError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(DualmomError::Database {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(prices) if !prices.is_empty() => {
                let min = prices.iter().map(|p| p.date).min().unwrap();
                let max = prices.iter().map(|p| p.date).max().unwrap();
                Ok(Some((min, max, prices.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

pub fn obs(symbol: &str, date: NaiveDate, price: f64) -> PriceObservation {
    PriceObservation::new(symbol, date, price)
}

/// One observation per calendar day, compounding `daily_growth`.
pub fn daily_series(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    start_price: f64,
    daily_growth: f64,
) -> Vec<PriceObservation> {
    let mut prices = Vec::new();
    let mut date = start;
    let mut price = start_price;
    while date <= end {
        prices.push(obs(symbol, date, price));
        price *= 1.0 + daily_growth;
        date += Duration::days(1);
    }
    prices
}

pub fn history_from(series: Vec<Vec<PriceObservation>>) -> PriceHistory {
    series
        .into_iter()
        .filter_map(|prices| {
            let symbol = prices.first()?.symbol.clone();
            Some((symbol, prices))
        })
        .collect()
}

/// Risk assets A, B, C; gauge G; cash proxy CASH.
pub fn abc_universe() -> Universe {
    Universe::new(
        vec!["A".to_string(), "B".to_string(), "C".to_string()],
        "G",
        "CASH",
    )
    .unwrap()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        start_date: d(2023, 1, 1),
        end_date: d(2023, 12, 31),
        trade_day_of_month: 15,
        lookback_months: 3,
        initial_capital: 1000.0,
        cost_rate: 0.001,
    }
}

/// Daily prices for the ABC universe over 2022-2023.
///
/// A and B trend up, C trends down, the gauge rises gently and cash is flat.
pub fn trending_history() -> PriceHistory {
    let (start, end) = (d(2022, 1, 1), d(2023, 12, 31));
    history_from(vec![
        daily_series("A", start, end, 100.0, 0.0010),
        daily_series("B", start, end, 50.0, 0.0005),
        daily_series("C", start, end, 80.0, -0.0004),
        daily_series("G", start, end, 110.0, 0.0001),
        daily_series("CASH", start, end, 90.0, 0.0),
    ])
}
