//! Ordered per-symbol target weights.

use crate::domain::error::DualmomError;
use std::collections::HashSet;

const SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationWeights {
    entries: Vec<(String, f64)>,
}

impl AllocationWeights {
    pub fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    /// Every symbol at weight 0.
    pub fn zero(symbols: &[String]) -> Self {
        Self {
            entries: symbols.iter().map(|s| (s.clone(), 0.0)).collect(),
        }
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(s, w)| (s.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn weight_of(&self, symbol: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, w)| *w)
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    pub fn is_risk_off(&self) -> bool {
        self.entries.iter().all(|(_, w)| *w == 0.0)
    }

    /// Rejects duplicate symbols, weights outside [0, 1], and totals other than 0 or 1.
    pub fn validate(&self) -> Result<(), DualmomError> {
        let mut seen = HashSet::new();
        for (symbol, weight) in &self.entries {
            if !seen.insert(symbol.as_str()) {
                return Err(DualmomError::InvalidWeights {
                    reason: format!("duplicate symbol {symbol}"),
                });
            }
            if !(0.0..=1.0).contains(weight) {
                return Err(DualmomError::InvalidWeights {
                    reason: format!("weight {weight} for {symbol} is outside [0, 1]"),
                });
            }
        }

        let total = self.sum();
        if total.abs() > SUM_TOLERANCE && (total - 1.0).abs() > SUM_TOLERANCE {
            return Err(DualmomError::InvalidWeights {
                reason: format!("weights sum to {total}, expected 0 or 1"),
            });
        }
        Ok(())
    }
}
