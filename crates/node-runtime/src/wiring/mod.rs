//! # Event Wiring
//!
//! Background listeners that are not periodic: the bus-to-Prometheus
//! recorder and the operator console draining alerts.

pub mod event_metrics;
pub mod operator_console;

pub use event_metrics::{record_event, spawn_event_metrics};
pub use operator_console::spawn_operator_console;
