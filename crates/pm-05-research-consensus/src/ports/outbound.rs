//! Driven Ports (SPI - Outbound)

use shared_types::{TargetRef, ValidationRecord, Validator, ValidatorId};

use crate::error::ResearchResult;

pub trait ResearchRepository: Send + Sync {
    fn validator(&self, id: &ValidatorId) -> ResearchResult<Option<Validator>>;

    /// Researchers sorted by id.
    fn researchers(&self) -> ResearchResult<Vec<Validator>>;

    fn save_validator(&self, validator: Validator) -> ResearchResult<()>;

    /// Insert-once per `(target, validator)`.
    fn insert_record(&self, record: ValidationRecord) -> ResearchResult<()>;

    fn records(&self, target: &TargetRef) -> ResearchResult<Vec<ValidationRecord>>;
}
