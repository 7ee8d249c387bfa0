//! Stake consensus domain.

pub mod aggregation;
pub mod policy;
pub mod session;

pub use aggregation::aggregate;
pub use policy::{DeterministicStakePolicy, Malformed, StakeDecisionPolicy};
pub use session::StakeRound;
