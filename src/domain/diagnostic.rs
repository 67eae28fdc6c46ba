//! Non-fatal data problems reported alongside computation results.
//!
//! Every diagnostic is also emitted as a `tracing` warning when recorded, so a
//! caller can either aggregate the returned list or rely on the log stream.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Symbol absent from the price history altogether.
    MissingSymbol { symbol: String },
    /// Symbol known, but no observation on the requested date.
    MissingPrice { symbol: String, date: NaiveDate },
    /// Momentum could not be computed for a trade date.
    MissingMomentum { symbol: String, date: NaiveDate },
    /// Previous price was zero; the return factor was set to 0.
    ZeroPreviousPrice { symbol: String, date: NaiveDate },
    /// Too few symbols had momentum to fill the selection; treated as risk-off.
    InsufficientRanking {
        date: NaiveDate,
        ranked: usize,
        required: usize,
    },
    /// The data port failed for a symbol; its history is treated as empty.
    DataUnavailable { symbol: String, reason: String },
    /// Weights were held but no previous prices were resolved, so the period
    /// funds from NAV again and returns since the last priced date are lost.
    HoldingsReset { date: NaiveDate },
}

impl Diagnostic {
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Diagnostic::MissingSymbol { symbol }
            | Diagnostic::MissingPrice { symbol, .. }
            | Diagnostic::MissingMomentum { symbol, .. }
            | Diagnostic::ZeroPreviousPrice { symbol, .. }
            | Diagnostic::DataUnavailable { symbol, .. } => Some(symbol),
            Diagnostic::InsufficientRanking { .. } | Diagnostic::HoldingsReset { .. } => None,
        }
    }

    fn emit(&self) {
        match self {
            Diagnostic::MissingSymbol { symbol } => {
                tracing::warn!(%symbol, "no price history for symbol");
            }
            Diagnostic::MissingPrice { symbol, date } => {
                tracing::warn!(%symbol, %date, "no price on date");
            }
            Diagnostic::MissingMomentum { symbol, date } => {
                tracing::warn!(%symbol, %date, "momentum unavailable");
            }
            Diagnostic::ZeroPreviousPrice { symbol, date } => {
                tracing::warn!(%symbol, %date, "previous price is zero, return set to 0");
            }
            Diagnostic::InsufficientRanking {
                date,
                ranked,
                required,
            } => {
                tracing::warn!(%date, ranked, required, "too few ranked assets, going risk-off");
            }
            Diagnostic::DataUnavailable { symbol, reason } => {
                tracing::warn!(%symbol, %reason, "price data unavailable");
            }
            Diagnostic::HoldingsReset { date } => {
                tracing::warn!(%date, "no previous prices for held weights, refunding from nav");
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingSymbol { symbol } => {
                write!(f, "no price data found for {symbol}")
            }
            Diagnostic::MissingPrice { symbol, date } => {
                write!(f, "no price data found for {symbol} on {date}")
            }
            Diagnostic::MissingMomentum { symbol, date } => {
                write!(f, "momentum unavailable for {symbol} on {date}")
            }
            Diagnostic::ZeroPreviousPrice { symbol, date } => {
                write!(f, "previous price of {symbol} is zero on {date}")
            }
            Diagnostic::InsufficientRanking {
                date,
                ranked,
                required,
            } => write!(
                f,
                "only {ranked} of {required} required assets ranked on {date}"
            ),
            Diagnostic::DataUnavailable { symbol, reason } => {
                write!(f, "price data unavailable for {symbol}: {reason}")
            }
            Diagnostic::HoldingsReset { date } => {
                write!(f, "held weights had no previous prices on {date}, refunded from nav")
            }
        }
    }
}

/// Collects diagnostics, logging each one as it arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.items.push(diagnostic);
    }

    /// Append already-emitted diagnostics without logging them again.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
