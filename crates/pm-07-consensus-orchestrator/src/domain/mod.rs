//! Orchestrator domain.

pub mod finality;

pub use finality::{
    combine_stake, proof_of_work_fault, BlockFinality, FinalityTracker, RejectedBlock,
    StakeVerdict,
};
