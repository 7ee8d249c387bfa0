//! Research consensus domain.

pub mod round;
pub mod scoring;
pub mod tally;

pub use round::ResearchRound;
pub use scoring::{
    select_reviewer, DeterministicQualityScorer, PeerReviewer, QualityScorer, ReviewVerdict,
    ScoreDistanceReviewer,
};
pub use tally::{round3, tally, TallyRule};
