//! Command and query handlers exposed to outer surfaces.

pub mod api;

pub use api::{NodeApi, NodeError, NodeResult, NodeStatus, ValidatorRoster};
