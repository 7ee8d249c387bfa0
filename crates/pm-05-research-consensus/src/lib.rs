//! # pm-05-research-consensus
//!
//! Quality-weighted, peer-reviewed agreement (PoR) on blocks.
//!
//! ## Round State Machine
//!
//! ```text
//! [PENDING_SUBMISSION] ──first validation──→ [COLLECTING_VALIDATIONS]
//!                                                   │
//!                                   completed >= required_validations
//!                                                   ↓
//!                                 [CONSENSUS_REACHED {accepted | rejected}]
//! ```
//!
//! Terminal rounds accept nothing further.
//!
//! ## Decision Rule
//!
//! Each researcher scores the block in `[0, 100]`; a score of at least
//! `approval_score` starts as `Approved`, otherwise `RequiresRevision`. An
//! independently selected reviewer re-scores the block, and a disagreement
//! flips the decision. The round is accepted iff
//! `approval_rate >= consensus_threshold` (0.667, three decimals) and
//! `average_quality >= quality_threshold` (70).

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::LedgerResearchRepository;
pub use config::ResearchConfig;
pub use domain::{
    select_reviewer, tally, DeterministicQualityScorer, PeerReviewer, QualityScorer,
    ReviewVerdict, ScoreDistanceReviewer, TallyRule,
};
pub use error::{ResearchError, ResearchResult};
pub use ports::{ResearchConsensusApi, ResearchRepository, ResearchSubmission};
pub use service::ResearchConsensus;
