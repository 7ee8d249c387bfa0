//! Quality scoring and peer review.

use shared_crypto::{select_index, unit_interval};
use shared_types::{Block, Validator};
use std::sync::Arc;

const SCORE_DOMAIN: &str = "productive-mining por quality v1";
const REVIEWER_DOMAIN: &str = "productive-mining por reviewer v1";

/// Produces a researcher's quality score in `[0, 100]` for a block.
pub trait QualityScorer: Send + Sync {
    fn score(&self, block: &Block, researcher: &Validator) -> f64;
}

/// Outcome of a peer review.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewVerdict {
    pub agreed: bool,
    pub reviewer_score: f64,
}

/// Cross-checks another researcher's score.
pub trait PeerReviewer: Send + Sync {
    fn review(
        &self,
        block: &Block,
        submitter_score: f64,
        reviewer: &Validator,
    ) -> ReviewVerdict;
}

/// Default scorer: a BLAKE3-derived base in `[40, 95)` keyed by block and
/// researcher, plus 5 when the block met its PoW target.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicQualityScorer;

impl QualityScorer for DeterministicQualityScorer {
    fn score(&self, block: &Block, researcher: &Validator) -> f64 {
        let base = 40.0
            + 55.0
                * unit_interval(
                    SCORE_DOMAIN,
                    &[&block.block_hash, researcher.id.as_str().as_bytes()],
                );
        let bonus = if block.meets_target() { 5.0 } else { 0.0 };
        (base + bonus).clamp(0.0, 100.0)
    }
}

/// Default reviewer: scores the block independently and agrees when the
/// two scores are within `tolerance`.
pub struct ScoreDistanceReviewer {
    scorer: Arc<dyn QualityScorer>,
    tolerance: f64,
}

impl ScoreDistanceReviewer {
    pub fn new(scorer: Arc<dyn QualityScorer>, tolerance: f64) -> Self {
        Self { scorer, tolerance }
    }
}

impl PeerReviewer for ScoreDistanceReviewer {
    fn review(&self, block: &Block, submitter_score: f64, reviewer: &Validator) -> ReviewVerdict {
        let reviewer_score = self.scorer.score(block, reviewer);
        ReviewVerdict {
            agreed: (reviewer_score - submitter_score).abs() <= self.tolerance,
            reviewer_score,
        }
    }
}

/// Pick a reviewer deterministically from `candidates`.
///
/// Candidates are active researchers other than the submitter, in id
/// order; the choice is keyed by the block and the submitter so a replay
/// picks the same reviewer.
#[must_use]
pub fn select_reviewer<'a>(
    candidates: &'a [Validator],
    submitter: &Validator,
    block: &Block,
) -> Option<&'a Validator> {
    let mut eligible: Vec<&Validator> = candidates
        .iter()
        .filter(|v| v.active && v.id != submitter.id)
        .collect();
    eligible.sort_by(|a, b| a.id.cmp(&b.id));
    let index = select_index(
        REVIEWER_DOMAIN,
        &[&block.block_hash, submitter.id.as_str().as_bytes()],
        eligible.len(),
    )?;
    eligible.get(index).copied()
}
