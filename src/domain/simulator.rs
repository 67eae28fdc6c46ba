//! One-period NAV evolution with proportional trading costs.
//!
//! The simulator keeps no state. The caller threads the returned
//! [`Holdings`] into the next call as `previous`.
//!
//! Pipeline per period:
//! 1. resolve each trading symbol's price on the trade date
//! 2. return factor since the previous period (`current / previous`)
//! 3. pre-trade value = nav x held weight x return factor
//! 4. target value = pre-trade total x new weight
//! 5. cost = |target - pre-trade| x cost rate; post-trade = (total - costs) x new weight

use crate::domain::allocation::AllocationWeights;
use crate::domain::diagnostic::{Diagnostic, Diagnostics};
use crate::domain::error::DualmomError;
use crate::domain::price::{PriceHistory, PriceSnapshot, price_on};
use crate::domain::universe::Universe;
use chrono::NaiveDate;

/// What the portfolio carries from one period into the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Holdings {
    pub prices: PriceSnapshot,
    pub weights: AllocationWeights,
}

impl Holdings {
    /// No previous prices: the next period is the initial funding.
    pub fn is_initial(&self) -> bool {
        self.prices.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetTrade {
    pub symbol: String,
    pub held_weight: f64,
    pub target_weight: f64,
    pub return_factor: f64,
    pub pre_trade_value: f64,
    pub target_value: f64,
    pub cost: f64,
    pub post_trade_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodOutcome {
    pub nav: f64,
    pub cost: f64,
    pub holdings: Holdings,
    pub assets: Vec<AssetTrade>,
    pub diagnostics: Diagnostics,
}

pub fn validate_cost_rate(cost_rate: f64) -> Result<(), DualmomError> {
    if !cost_rate.is_finite() || !(0.0..1.0).contains(&cost_rate) {
        return Err(DualmomError::ConfigInvalid {
            section: "backtest".into(),
            key: "cost_rate".into(),
            reason: format!("cost_rate must be in [0, 1), got {cost_rate}"),
        });
    }
    Ok(())
}

fn check_weights(universe: &Universe, weights: &AllocationWeights) -> Result<(), DualmomError> {
    weights.validate()?;
    let trading = universe.trading_symbols();
    if let Some((symbol, _)) = weights.iter().find(|(s, _)| !trading.iter().any(|t| t == s)) {
        return Err(DualmomError::InvalidWeights {
            reason: format!("{symbol} is not in the trading universe"),
        });
    }
    Ok(())
}

fn resolve_prices(
    history: &PriceHistory,
    symbols: &[String],
    trade_date: NaiveDate,
    diagnostics: &mut Diagnostics,
) -> PriceSnapshot {
    let mut current = PriceSnapshot::new();
    for symbol in symbols {
        if !history.contains_key(symbol) {
            diagnostics.record(Diagnostic::MissingSymbol {
                symbol: symbol.clone(),
            });
            continue;
        }
        match price_on(symbol, history, trade_date) {
            Some(obs) => {
                current.insert(symbol.clone(), obs.clone());
            }
            None => diagnostics.record(Diagnostic::MissingPrice {
                symbol: symbol.clone(),
                date: trade_date,
            }),
        }
    }
    current
}

/// Ratio of current to previous price.
///
/// A zero previous price gives 0; a missing price on either side gives 1 (flat).
fn return_factor(
    symbol: &str,
    current: &PriceSnapshot,
    previous: &PriceSnapshot,
    trade_date: NaiveDate,
    diagnostics: &mut Diagnostics,
) -> f64 {
    match (current.get(symbol), previous.get(symbol)) {
        (Some(cur), Some(prev)) => {
            if prev.price == 0.0 {
                diagnostics.record(Diagnostic::ZeroPreviousPrice {
                    symbol: symbol.to_string(),
                    date: trade_date,
                });
                0.0
            } else {
                cur.price / prev.price
            }
        }
        _ => 1.0,
    }
}

pub fn simulate_period(
    history: &PriceHistory,
    universe: &Universe,
    weights: &AllocationWeights,
    trade_date: NaiveDate,
    nav: f64,
    cost_rate: f64,
    previous: &Holdings,
) -> Result<PeriodOutcome, DualmomError> {
    check_weights(universe, weights)?;
    validate_cost_rate(cost_rate)?;

    let mut diagnostics = Diagnostics::new();
    let symbols = universe.trading_symbols();
    let current = resolve_prices(history, &symbols, trade_date, &mut diagnostics);

    if previous.is_initial() {
        if !previous.weights.is_empty() {
            diagnostics.record(Diagnostic::HoldingsReset { date: trade_date });
        }
        let assets = symbols
            .iter()
            .map(|symbol| {
                let target_weight = weights.weight_of(symbol).unwrap_or(0.0);
                AssetTrade {
                    symbol: symbol.clone(),
                    held_weight: 0.0,
                    target_weight,
                    return_factor: 1.0,
                    pre_trade_value: 0.0,
                    target_value: nav * target_weight,
                    cost: 0.0,
                    post_trade_value: nav * target_weight,
                }
            })
            .collect();
        tracing::debug!(%trade_date, nav, "initial funding");
        return Ok(PeriodOutcome {
            nav,
            cost: 0.0,
            holdings: Holdings {
                prices: current,
                weights: weights.clone(),
            },
            assets,
            diagnostics,
        });
    }

    let mut assets: Vec<AssetTrade> = symbols
        .iter()
        .map(|symbol| {
            let held_weight = previous.weights.weight_of(symbol).unwrap_or(0.0);
            let factor = return_factor(
                symbol,
                &current,
                &previous.prices,
                trade_date,
                &mut diagnostics,
            );
            AssetTrade {
                symbol: symbol.clone(),
                held_weight,
                target_weight: weights.weight_of(symbol).unwrap_or(0.0),
                return_factor: factor,
                pre_trade_value: nav * held_weight * factor,
                target_value: 0.0,
                cost: 0.0,
                post_trade_value: 0.0,
            }
        })
        .collect();

    let pre_trade_total: f64 = assets.iter().map(|a| a.pre_trade_value).sum();

    for asset in &mut assets {
        asset.target_value = pre_trade_total * asset.target_weight;
        asset.cost = (asset.target_value - asset.pre_trade_value).abs() * cost_rate;
    }
    let total_cost: f64 = assets.iter().map(|a| a.cost).sum();
    let post_cost_nav = pre_trade_total - total_cost;

    for asset in &mut assets {
        asset.post_trade_value = post_cost_nav * asset.target_weight;
    }
    let new_nav: f64 = assets.iter().map(|a| a.post_trade_value).sum();

    tracing::debug!(
        %trade_date,
        pre_trade_total,
        cost = total_cost,
        nav = new_nav,
        "period simulated"
    );

    Ok(PeriodOutcome {
        nav: new_nav,
        cost: total_cost,
        holdings: Holdings {
            prices: current,
            weights: weights.clone(),
        },
        assets,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PriceObservation;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t0() -> NaiveDate {
        d(2024, 5, 15)
    }

    fn t1() -> NaiveDate {
        d(2024, 6, 14)
    }

    fn weights(items: &[(&str, f64)]) -> AllocationWeights {
        let universe = Universe::default();
        AllocationWeights::new(
            universe
                .trading_symbols()
                .into_iter()
                .map(|s| {
                    let w = items
                        .iter()
                        .find(|(sym, _)| *sym == s)
                        .map(|(_, w)| *w)
                        .unwrap_or(0.0);
                    (s, w)
                })
                .collect(),
        )
    }

    /// Every trading symbol priced on both dates.
    fn history(moves: &[(&str, f64, f64)]) -> PriceHistory {
        let mut history = PriceHistory::new();
        for (symbol, p0, p1) in moves {
            history.insert(
                symbol.to_string(),
                vec![
                    PriceObservation::new(*symbol, t0(), *p0),
                    PriceObservation::new(*symbol, t1(), *p1),
                ],
            );
        }
        history
    }

    fn flat_history() -> PriceHistory {
        history(&[
            ("SPY", 100.0, 110.0),
            ("QQQ", 200.0, 180.0),
            ("GLD", 50.0, 50.0),
            ("BIL", 90.0, 90.0),
        ])
    }

    fn funded(hist: &PriceHistory, w: &AllocationWeights) -> PeriodOutcome {
        simulate_period(
            hist,
            &Universe::default(),
            w,
            t0(),
            1000.0,
            0.001,
            &Holdings::default(),
        )
        .unwrap()
    }

    #[test]
    fn first_period_funds_without_cost() {
        let hist = flat_history();
        let w = weights(&[("SPY", 0.5), ("QQQ", 0.5)]);
        let outcome = funded(&hist, &w);

        assert_eq!(outcome.nav, 1000.0);
        assert_eq!(outcome.cost, 0.0);
        assert!(outcome.assets.iter().all(|a| a.pre_trade_value == 0.0));
        assert_eq!(outcome.holdings.prices.len(), 4);
        assert_eq!(outcome.holdings.weights, w);
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn return_factor_is_plain_ratio() {
        let hist = flat_history();
        let w = weights(&[("SPY", 0.5), ("GLD", 0.5)]);
        let first = funded(&hist, &w);

        let second = simulate_period(
            &hist,
            &Universe::default(),
            &w,
            t1(),
            first.nav,
            0.0,
            &first.holdings,
        )
        .unwrap();

        // SPY 100 -> 110 on half the book, GLD flat: 550 + 500
        assert_relative_eq!(second.nav, 1050.0, epsilon = 1e-9);
        let spy = second.assets.iter().find(|a| a.symbol == "SPY").unwrap();
        assert_relative_eq!(spy.return_factor, 1.1, epsilon = 1e-12);
        assert_relative_eq!(spy.pre_trade_value, 550.0, epsilon = 1e-9);
    }

    #[test]
    fn unpriced_previous_period_is_reported_as_reset() {
        // The middle trade date has no prices at all, e.g. a market holiday.
        let gap = d(2024, 5, 31);
        let hist = history(&[
            ("SPY", 100.0, 200.0),
            ("QQQ", 100.0, 200.0),
            ("GLD", 50.0, 50.0),
            ("BIL", 90.0, 90.0),
        ]);
        let w = weights(&[("SPY", 0.5), ("QQQ", 0.5)]);
        let universe = Universe::default();

        let first = funded(&hist, &w);
        let skipped =
            simulate_period(&hist, &universe, &w, gap, first.nav, 0.001, &first.holdings).unwrap();
        assert!(skipped.holdings.prices.is_empty());
        assert!(!skipped
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::HoldingsReset { .. })));

        let after = simulate_period(
            &hist,
            &universe,
            &w,
            t1(),
            skipped.nav,
            0.001,
            &skipped.holdings,
        )
        .unwrap();
        assert_eq!(after.nav, 1000.0);
        assert_eq!(after.cost, 0.0);
        assert!(after
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::HoldingsReset { date } if *date == t1())));
    }

    #[test]
    fn fresh_holdings_are_not_a_reset() {
        let outcome = funded(&flat_history(), &weights(&[("SPY", 0.5), ("QQQ", 0.5)]));
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn zero_cost_rate_has_no_cost() {
        let hist = flat_history();
        let first = funded(&hist, &weights(&[("SPY", 0.5), ("QQQ", 0.5)]));
        let second = simulate_period(
            &hist,
            &Universe::default(),
            &weights(&[("GLD", 1.0)]),
            t1(),
            first.nav,
            0.0,
            &first.holdings,
        )
        .unwrap();
        assert_eq!(second.cost, 0.0);
    }

    #[test]
    fn switching_assets_charges_both_legs() {
        let hist = flat_history();
        let first = funded(&hist, &weights(&[("SPY", 1.0)]));
        let second = simulate_period(
            &hist,
            &Universe::default(),
            &weights(&[("GLD", 1.0)]),
            t1(),
            first.nav,
            0.001,
            &first.holdings,
        )
        .unwrap();

        // pre-trade SPY = 1100; sell 1100 and buy 1100 at 0.1%
        assert_relative_eq!(second.cost, 2.2, epsilon = 1e-9);
        assert_relative_eq!(second.nav, 1097.8, epsilon = 1e-9);
        let gld = second.assets.iter().find(|a| a.symbol == "GLD").unwrap();
        assert_relative_eq!(gld.post_trade_value, 1097.8, epsilon = 1e-9);
    }

    #[test]
    fn unchanged_weights_trade_only_the_drift() {
        let hist = flat_history();
        let w = weights(&[("SPY", 0.5), ("QQQ", 0.5)]);
        let first = funded(&hist, &w);
        let second = simulate_period(
            &hist,
            &Universe::default(),
            &w,
            t1(),
            first.nav,
            0.01,
            &first.holdings,
        )
        .unwrap();

        // SPY 550, QQQ 450, total 1000; each target 500 -> drift of 50 per leg
        assert_relative_eq!(second.cost, 1.0, epsilon = 1e-9);
        assert_relative_eq!(second.nav, 999.0, epsilon = 1e-9);
    }

    #[test]
    fn nav_equals_post_cost_total() {
        let hist = flat_history();
        let first = funded(&hist, &weights(&[("SPY", 0.5), ("QQQ", 0.5)]));
        let second = simulate_period(
            &hist,
            &Universe::default(),
            &weights(&[("QQQ", 0.5), ("GLD", 0.5)]),
            t1(),
            first.nav,
            0.002,
            &first.holdings,
        )
        .unwrap();
        let pre_total: f64 = second.assets.iter().map(|a| a.pre_trade_value).sum();
        assert_relative_eq!(second.nav, pre_total - second.cost, epsilon = 1e-9);
    }

    #[test]
    fn zero_previous_price_gives_zero_return() {
        let hist = history(&[
            ("SPY", 0.0, 10.0),
            ("QQQ", 200.0, 200.0),
            ("GLD", 50.0, 50.0),
            ("BIL", 90.0, 90.0),
        ]);
        let w = weights(&[("SPY", 0.5), ("BIL", 0.5)]);
        let first = funded(&hist, &w);
        let second = simulate_period(
            &hist,
            &Universe::default(),
            &w,
            t1(),
            first.nav,
            0.0,
            &first.holdings,
        )
        .unwrap();

        let spy = second.assets.iter().find(|a| a.symbol == "SPY").unwrap();
        assert_eq!(spy.return_factor, 0.0);
        assert_relative_eq!(second.nav, 500.0, epsilon = 1e-9);
        assert!(second.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::ZeroPreviousPrice { symbol, .. } if symbol == "SPY"
        )));
    }

    #[test]
    fn missing_symbol_is_valued_flat() {
        let hist = history(&[
            ("SPY", 100.0, 110.0),
            ("QQQ", 200.0, 200.0),
            ("BIL", 90.0, 90.0),
        ]);
        let w = weights(&[("SPY", 0.5), ("GLD", 0.5)]);
        let first = funded(&hist, &w);
        assert!(first.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::MissingSymbol { symbol } if symbol == "GLD"
        )));
        assert!(!first.holdings.prices.contains_key("GLD"));

        let second = simulate_period(
            &hist,
            &Universe::default(),
            &w,
            t1(),
            first.nav,
            0.0,
            &first.holdings,
        )
        .unwrap();
        let gld = second.assets.iter().find(|a| a.symbol == "GLD").unwrap();
        assert_eq!(gld.return_factor, 1.0);
        assert_relative_eq!(second.nav, 1050.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_price_on_date_is_reported() {
        let mut hist = flat_history();
        hist.insert(
            "QQQ".into(),
            vec![PriceObservation::new("QQQ", t0(), 200.0)],
        );
        let w = weights(&[("SPY", 0.5), ("QQQ", 0.5)]);
        let first = funded(&hist, &w);
        let second = simulate_period(
            &hist,
            &Universe::default(),
            &w,
            t1(),
            first.nav,
            0.0,
            &first.holdings,
        )
        .unwrap();

        assert!(second.diagnostics.iter().any(|d| matches!(
            d,
            Diagnostic::MissingPrice { symbol, .. } if symbol == "QQQ"
        )));
        assert!(!second.holdings.prices.contains_key("QQQ"));
        // QQQ held flat at 500, SPY 550
        assert_relative_eq!(second.nav, 1050.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_weights_not_summing_to_zero_or_one() {
        let hist = flat_history();
        let result = simulate_period(
            &hist,
            &Universe::default(),
            &weights(&[("SPY", 0.5)]),
            t0(),
            1000.0,
            0.001,
            &Holdings::default(),
        );
        assert!(matches!(result, Err(DualmomError::InvalidWeights { .. })));
    }

    #[test]
    fn rejects_symbol_outside_trading_universe() {
        let hist = flat_history();
        let w = AllocationWeights::new(vec![("TIP".into(), 1.0)]);
        let result = simulate_period(
            &hist,
            &Universe::default(),
            &w,
            t0(),
            1000.0,
            0.001,
            &Holdings::default(),
        );
        assert!(matches!(result, Err(DualmomError::InvalidWeights { reason }) if reason.contains("TIP")));
    }

    #[test]
    fn rejects_negative_cost_rate() {
        let hist = flat_history();
        let result = simulate_period(
            &hist,
            &Universe::default(),
            &weights(&[("BIL", 1.0)]),
            t0(),
            1000.0,
            -0.1,
            &Holdings::default(),
        );
        assert!(matches!(
            result,
            Err(DualmomError::ConfigInvalid { key, .. }) if key == "cost_rate"
        ));
    }
}
