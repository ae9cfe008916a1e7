//! Port traits: the boundary between the backtest core and the outside.

pub mod config_port;
pub mod data_port;
pub mod event_port;
pub mod persistence_port;
pub mod report_port;
