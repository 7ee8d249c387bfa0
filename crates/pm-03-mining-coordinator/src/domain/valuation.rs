//! Value scoring.
//!
//! The value attached to a work item is an opaque weight. Nothing in the
//! ledger or consensus layers treats it as a correctness signal.

use shared_types::WorkType;

use super::synthesis::SynthesizedWork;

/// Injectable value function.
pub trait ValueScorer: Send + Sync {
    fn score(&self, work_type: WorkType, difficulty: u32, work: &SynthesizedWork) -> f64;
}

/// Per-type base weight plus a difficulty-scaled impact term.
#[derive(Debug, Clone)]
pub struct WeightedValueScorer {
    pub max_difficulty_multiplier: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl Default for WeightedValueScorer {
    fn default() -> Self {
        Self {
            max_difficulty_multiplier: 1.5,
            min_value: 1.0,
            max_value: 100.0,
        }
    }
}

impl WeightedValueScorer {
    /// `(base, impact)` per work type.
    fn weights(work_type: WorkType) -> (f64, f64) {
        match work_type {
            WorkType::RiemannZero => (20.0, 10.0),
            WorkType::PrimePattern => (15.0, 8.0),
            WorkType::YangMills => (30.0, 15.0),
            WorkType::NavierStokes => (22.0, 9.0),
            WorkType::GoldbachVerification => (12.0, 5.0),
            WorkType::BirchSwinnertonDyer => (18.0, 8.0),
            WorkType::EllipticCurveCrypto => (20.0, 8.5),
            WorkType::LatticeCrypto => (19.0, 7.0),
            WorkType::PoincareConjecture => (25.0, 12.5),
        }
    }

    #[must_use]
    pub fn difficulty_multiplier(&self, difficulty: u32) -> f64 {
        (1.0 + f64::from(difficulty) / 1000.0 * 0.5).min(self.max_difficulty_multiplier)
    }
}

impl ValueScorer for WeightedValueScorer {
    fn score(&self, work_type: WorkType, difficulty: u32, work: &SynthesizedWork) -> f64 {
        let (base, impact) = Self::weights(work_type);
        let effort = (work.energy_consumed * 10.0).min(10.0);
        let raw = base + impact * self.difficulty_multiplier(difficulty) + effort;
        raw.clamp(self.min_value, self.max_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_work(energy: f64) -> SynthesizedWork {
        SynthesizedWork {
            result_digest: [0u8; 32],
            computational_cost: 1.0,
            energy_consumed: energy,
            knowledge_created: 1.0,
            summary: String::new(),
        }
    }

    #[test]
    fn test_multiplier_capped() {
        let scorer = WeightedValueScorer::default();
        assert_eq!(scorer.difficulty_multiplier(0), 1.0);
        assert_eq!(scorer.difficulty_multiplier(1000), 1.5);
        assert_eq!(scorer.difficulty_multiplier(u32::MAX), 1.5);
    }

    #[test]
    fn test_score_clamped() {
        let scorer = WeightedValueScorer {
            max_value: 25.0,
            ..WeightedValueScorer::default()
        };
        let value = scorer.score(WorkType::YangMills, 1000, &create_test_work(100.0));
        assert_eq!(value, 25.0);
    }

    #[test]
    fn test_higher_difficulty_scores_higher() {
        let scorer = WeightedValueScorer::default();
        let work = create_test_work(0.0);
        assert!(
            scorer.score(WorkType::RiemannZero, 900, &work)
                > scorer.score(WorkType::RiemannZero, 10, &work)
        );
    }
}
