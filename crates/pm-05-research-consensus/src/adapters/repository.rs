//! `ResearchRepository` over the shared ledger store.

use pm_01_ledger_store::{LedgerStore, StoreError};
use shared_types::{ConsensusLayer, TargetRef, ValidationRecord, Validator, ValidatorId, ValidatorRole};
use std::sync::Arc;

use crate::error::{ResearchError, ResearchResult};
use crate::ports::outbound::ResearchRepository;

pub struct LedgerResearchRepository {
    store: Arc<dyn LedgerStore>,
}

impl LedgerResearchRepository {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }
}

impl ResearchRepository for LedgerResearchRepository {
    fn validator(&self, id: &ValidatorId) -> ResearchResult<Option<Validator>> {
        Ok(self.store.validator(id)?)
    }

    fn researchers(&self) -> ResearchResult<Vec<Validator>> {
        Ok(self.store.validators(Some(ValidatorRole::Researcher))?)
    }

    fn save_validator(&self, validator: Validator) -> ResearchResult<()> {
        Ok(self.store.upsert_validator(validator)?)
    }

    fn insert_record(&self, record: ValidationRecord) -> ResearchResult<()> {
        let validator = record.validator_id.clone();
        let target = record.target;
        self.store
            .insert_validation_record(record)
            .map_err(|e| match e {
                StoreError::DuplicateValidation { .. } => {
                    ResearchError::DuplicateValidation { validator, target }
                }
                other => other.into(),
            })
    }

    fn records(&self, target: &TargetRef) -> ResearchResult<Vec<ValidationRecord>> {
        Ok(self.store.validation_records(ConsensusLayer::Research, target)?)
    }
}
