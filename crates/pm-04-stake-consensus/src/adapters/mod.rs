//! Adapters for stake consensus.

pub mod repository;

pub use repository::LedgerStakeRepository;
