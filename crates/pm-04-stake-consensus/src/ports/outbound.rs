//! Driven Ports (SPI - Outbound)
//!
//! The narrow slice of storage stake consensus needs.

use shared_types::{TargetRef, ValidationRecord, Validator, ValidatorId, WorkItem, WorkItemId};

use crate::error::StakeResult;

pub trait StakeRepository: Send + Sync {
    fn validator(&self, id: &ValidatorId) -> StakeResult<Option<Validator>>;

    /// Stake-holder validators sorted by id.
    fn stake_holders(&self) -> StakeResult<Vec<Validator>>;

    fn save_validator(&self, validator: Validator) -> StakeResult<()>;

    fn work_item(&self, id: &WorkItemId) -> StakeResult<Option<WorkItem>>;

    /// Insert-once per `(target, validator)`.
    fn insert_record(&self, record: ValidationRecord) -> StakeResult<()>;

    fn records(&self, target: &TargetRef) -> StakeResult<Vec<ValidationRecord>>;
}
