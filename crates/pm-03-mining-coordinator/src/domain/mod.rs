//! Mining domain: operation state machine, synthesis and value scoring.

pub mod operation;
pub mod synthesis;
pub mod valuation;

pub use operation::{MiningOperation, OperationSnapshot, OperationState};
pub use synthesis::{DeterministicSynthesizer, SynthesisError, SynthesizedWork, WorkSynthesizer};
pub use valuation::{ValueScorer, WeightedValueScorer};
