//! Ledger domain logic: block assembly, PoW, chain verification.

pub mod assembly;
pub mod pow;
pub mod verification;

pub use assembly::{assemble_block, BlockTemplate};
pub use pow::PowOutcome;
pub use verification::{check_block, verify_chain, ChainFault, ChainVerification, FaultKind};
