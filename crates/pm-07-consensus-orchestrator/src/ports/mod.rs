//! Ports for the orchestrator.

pub mod inbound;

pub use inbound::OrchestratorApi;
