//! Ports for the blockchain ledger.
//!
//! The outbound side is the shared `LedgerStore`, `EventPublisher` and
//! `OperatorChannel`; only the driving API lives here.

pub mod inbound;

pub use inbound::LedgerApi;
