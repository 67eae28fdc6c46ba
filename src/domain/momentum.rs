//! Trailing momentum and the dual-momentum allocation rule.
//!
//! The gauge's absolute momentum gates risk exposure; when the gate is open
//! the risk assets are ranked by relative momentum and the top [`TOP_N`] are
//! held in equal weight.

use crate::domain::allocation::AllocationWeights;
use crate::domain::calendar::lookback_date;
use crate::domain::diagnostic::{Diagnostic, Diagnostics};
use crate::domain::price::{PriceHistory, price_on};
use crate::domain::universe::{TOP_N, Universe};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// `(price on trade_date / price on lookback date) - 1`.
///
/// `None` when either endpoint is missing or the past price is zero.
pub fn momentum(
    symbol: &str,
    history: &PriceHistory,
    trade_date: NaiveDate,
    lookback_months: u32,
) -> Option<f64> {
    let past_date = lookback_date(trade_date, lookback_months)?;
    let trade_price = price_on(symbol, history, trade_date)?;
    let past_price = price_on(symbol, history, past_date)?;
    if past_price.price == 0.0 {
        return None;
    }
    Some(trade_price.price / past_price.price - 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceDecision {
    /// One entry per risk asset, in the universe's declared order.
    pub weights: AllocationWeights,
    pub gauge_momentum: Option<f64>,
    /// Risk-asset momenta in declared order.
    pub momenta: Vec<(String, Option<f64>)>,
    pub risk_off: bool,
    pub diagnostics: Diagnostics,
}

/// Present momenta first, highest first; ties and absent values by symbol.
fn rank_order(a: &(String, Option<f64>), b: &(String, Option<f64>)) -> Ordering {
    match (a.1, b.1) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.0.cmp(&b.0)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    }
}

/// Risk-asset symbols ordered best first.
pub fn rank_by_momentum(momenta: &[(String, Option<f64>)]) -> Vec<String> {
    let mut ranked = momenta.to_vec();
    ranked.sort_by(rank_order);
    ranked.into_iter().map(|(s, _)| s).collect()
}

pub fn rebalance_weights(
    history: &PriceHistory,
    universe: &Universe,
    trade_date: NaiveDate,
    lookback_months: u32,
) -> RebalanceDecision {
    let mut diagnostics = Diagnostics::new();
    let risk_assets = universe.risk_assets();

    let gauge_momentum = momentum(universe.gauge(), history, trade_date, lookback_months);
    if gauge_momentum.is_none() {
        diagnostics.record(Diagnostic::MissingMomentum {
            symbol: universe.gauge().to_string(),
            date: trade_date,
        });
    }

    let gate_open = matches!(gauge_momentum, Some(m) if m >= 0.0);
    if !gate_open {
        tracing::debug!(%trade_date, ?gauge_momentum, "gauge momentum gate closed");
        return RebalanceDecision {
            weights: AllocationWeights::zero(risk_assets),
            gauge_momentum,
            momenta: Vec::new(),
            risk_off: true,
            diagnostics,
        };
    }

    let momenta: Vec<(String, Option<f64>)> = risk_assets
        .iter()
        .map(|s| (s.clone(), momentum(s, history, trade_date, lookback_months)))
        .collect();
    for (symbol, value) in &momenta {
        if value.is_none() {
            diagnostics.record(Diagnostic::MissingMomentum {
                symbol: symbol.clone(),
                date: trade_date,
            });
        }
    }

    let ranked_count = momenta.iter().filter(|(_, m)| m.is_some()).count();
    if ranked_count < TOP_N {
        diagnostics.record(Diagnostic::InsufficientRanking {
            date: trade_date,
            ranked: ranked_count,
            required: TOP_N,
        });
        return RebalanceDecision {
            weights: AllocationWeights::zero(risk_assets),
            gauge_momentum,
            momenta,
            risk_off: true,
            diagnostics,
        };
    }

    let ranked = rank_by_momentum(&momenta);
    let selected = &ranked[..TOP_N];
    let share = 1.0 / TOP_N as f64;
    tracing::debug!(%trade_date, ?selected, "selected top assets");

    let weights = AllocationWeights::new(
        risk_assets
            .iter()
            .map(|s| {
                let weight = if selected.contains(s) { share } else { 0.0 };
                (s.clone(), weight)
            })
            .collect(),
    );

    RebalanceDecision {
        weights,
        gauge_momentum,
        momenta,
        risk_off: false,
        diagnostics,
    }
}
