//! marketsense: backtesting and portfolio optimization for Korean equities.
//!
//! Hexagonal architecture: simulation and optimization logic in [`domain`],
//! port traits in [`ports`], concrete implementations in [`adapters`], and
//! the command-line surface in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
