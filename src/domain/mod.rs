//! Core domain types and logic.

pub mod price;
pub mod position;
pub mod execution;
pub mod indicator;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod returns;
pub mod optimizer;
pub mod config_validation;
pub mod error;
