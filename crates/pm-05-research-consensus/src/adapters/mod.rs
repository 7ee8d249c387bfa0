//! Adapters for research consensus.

pub mod repository;

pub use repository::LedgerResearchRepository;
