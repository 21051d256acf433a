//! Concrete adapter implementations for ports.

pub mod computed_indicators;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_report;
