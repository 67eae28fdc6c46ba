//! Closing price observations and exact-date lookup.

use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
}

impl PriceObservation {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            price,
        }
    }
}

/// Symbol to its observations. Owned by the ingestion side and only read here.
pub type PriceHistory = HashMap<String, Vec<PriceObservation>>;

/// Per-symbol snapshot of the observations resolved on one trade date.
pub type PriceSnapshot = HashMap<String, PriceObservation>;

/// Exact-date match; `None` when the symbol is unknown or has no row for `date`.
pub fn price_on<'a>(
    symbol: &str,
    history: &'a PriceHistory,
    date: NaiveDate,
) -> Option<&'a PriceObservation> {
    history
        .get(symbol)
        .and_then(|prices| prices.iter().find(|p| p.date == date))
}

/// Group flat observations by symbol, sorted by date, one row per date.
///
/// A later observation for the same (symbol, date) replaces the earlier one.
pub fn group_by_symbol(observations: Vec<PriceObservation>) -> PriceHistory {
    let mut by_key: HashMap<(String, NaiveDate), PriceObservation> = HashMap::new();
    for obs in observations {
        by_key.insert((obs.symbol.clone(), obs.date), obs);
    }

    let mut history = PriceHistory::new();
    for obs in by_key.into_values() {
        history.entry(obs.symbol.clone()).or_default().push(obs);
    }
    for prices in history.values_mut() {
        prices.sort_by_key(|p| p.date);
    }
    history
}
