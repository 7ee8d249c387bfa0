//! Ports for the record chain.
//!
//! Storage goes straight through `pm_01_ledger_store::LedgerStore`, whose
//! `append_record` already enforces sequence and link.

pub mod inbound;

pub use inbound::RecordChainApi;
