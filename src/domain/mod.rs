//! Core domain types and logic.

pub mod price;
pub mod calendar;
pub mod universe;
pub mod allocation;
pub mod diagnostic;
pub mod momentum;
pub mod simulator;
pub mod backtest;
pub mod metrics;
pub mod sweep;
pub mod config_validation;
pub mod error;
