//! `StakeRepository` over the shared ledger store.

use pm_01_ledger_store::{LedgerStore, StoreError};
use shared_types::{
    ConsensusLayer, TargetRef, ValidationRecord, Validator, ValidatorId, ValidatorRole, WorkItem,
    WorkItemId,
};
use std::sync::Arc;

use crate::error::{StakeError, StakeResult};
use crate::ports::outbound::StakeRepository;

pub struct LedgerStakeRepository {
    store: Arc<dyn LedgerStore>,
}

impl LedgerStakeRepository {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }
}

impl StakeRepository for LedgerStakeRepository {
    fn validator(&self, id: &ValidatorId) -> StakeResult<Option<Validator>> {
        Ok(self.store.validator(id)?)
    }

    fn stake_holders(&self) -> StakeResult<Vec<Validator>> {
        Ok(self.store.validators(Some(ValidatorRole::StakeHolder))?)
    }

    fn save_validator(&self, validator: Validator) -> StakeResult<()> {
        Ok(self.store.upsert_validator(validator)?)
    }

    fn work_item(&self, id: &WorkItemId) -> StakeResult<Option<WorkItem>> {
        Ok(self.store.work_item(id)?)
    }

    fn insert_record(&self, record: ValidationRecord) -> StakeResult<()> {
        let (validator, target) = (record.validator_id.clone(), record.target);
        match self.store.insert_validation_record(record) {
            Err(StoreError::DuplicateValidation { .. }) => {
                Err(StakeError::DuplicateValidation { validator, target })
            }
            other => Ok(other?),
        }
    }

    fn records(&self, target: &TargetRef) -> StakeResult<Vec<ValidationRecord>> {
        Ok(self.store.validation_records(ConsensusLayer::Stake, target)?)
    }
}
