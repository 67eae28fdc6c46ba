//! The declared asset universe shared by ranking and simulation.
//!
//! Risk assets compete for allocation, the gauge drives the risk-off gate, and
//! the cash proxy completes the trading universe.

use crate::domain::allocation::AllocationWeights;
use std::collections::HashSet;

/// Number of risk assets held while risk-on; each gets `1 / TOP_N`.
pub const TOP_N: usize = 2;

pub const DEFAULT_RISK_ASSETS: [&str; 3] = ["SPY", "QQQ", "GLD"];
pub const DEFAULT_GAUGE: &str = "TIP";
pub const DEFAULT_CASH: &str = "BIL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    risk_assets: Vec<String>,
    gauge: String,
    cash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("need at least {required} risk assets, got {actual}")]
    TooFewRiskAssets { required: usize, actual: usize },
}

impl Universe {
    /// Symbols are upper-cased. Duplicates across any role are rejected.
    pub fn new(
        risk_assets: Vec<String>,
        gauge: impl Into<String>,
        cash: impl Into<String>,
    ) -> Result<Self, UniverseError> {
        let risk_assets: Vec<String> = risk_assets
            .into_iter()
            .map(|s| s.trim().to_uppercase())
            .collect();
        let gauge = gauge.into().trim().to_uppercase();
        let cash = cash.into().trim().to_uppercase();

        if risk_assets.len() < TOP_N {
            return Err(UniverseError::TooFewRiskAssets {
                required: TOP_N,
                actual: risk_assets.len(),
            });
        }

        let mut seen = HashSet::new();
        for symbol in risk_assets.iter().chain([&gauge, &cash]) {
            if symbol.is_empty() {
                return Err(UniverseError::EmptyToken);
            }
            if !seen.insert(symbol.clone()) {
                return Err(UniverseError::DuplicateSymbol(symbol.clone()));
            }
        }

        Ok(Self {
            risk_assets,
            gauge,
            cash,
        })
    }

    pub fn risk_assets(&self) -> &[String] {
        &self.risk_assets
    }

    pub fn gauge(&self) -> &str {
        &self.gauge
    }

    pub fn cash(&self) -> &str {
        &self.cash
    }

    /// Risk assets in declared order, then the cash proxy.
    pub fn trading_symbols(&self) -> Vec<String> {
        let mut symbols = self.risk_assets.clone();
        symbols.push(self.cash.clone());
        symbols
    }

    /// Every symbol that needs price history: risk assets, gauge, cash.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut symbols = self.risk_assets.clone();
        symbols.push(self.gauge.clone());
        symbols.push(self.cash.clone());
        symbols
    }

    /// Extend a risk-asset allocation to the trading universe.
    ///
    /// The cash proxy takes whatever the risk assets leave unallocated.
    pub fn trading_weights(&self, allocation: &AllocationWeights) -> AllocationWeights {
        let mut entries: Vec<(String, f64)> = self
            .risk_assets
            .iter()
            .map(|s| (s.clone(), allocation.weight_of(s).unwrap_or(0.0)))
            .collect();
        let invested: f64 = entries.iter().map(|(_, w)| w).sum();
        entries.push((self.cash.clone(), (1.0 - invested).max(0.0)));
        AllocationWeights::new(entries)
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self {
            risk_assets: DEFAULT_RISK_ASSETS.iter().map(|s| s.to_string()).collect(),
            gauge: DEFAULT_GAUGE.to_string(),
            cash: DEFAULT_CASH.to_string(),
        }
    }
}

/// Parse a comma-separated symbol list, upper-casing and rejecting duplicates.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}
