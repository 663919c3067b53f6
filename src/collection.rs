use chrono::NaiveDate;
use tracing::info;

use crate::due::local_today;
use crate::error::ValidationError;
use crate::persistence::Persistence;
use crate::record::{JobId, JobPatch, JobRecord, NewJob};
use crate::storage::KeyValueStore;

/// The authoritative list of applications, newest first.
///
/// Loaded once on open; every change is written back through the
/// persistence adapter before the call returns.
pub struct CollectionStore<S> {
    records: Vec<JobRecord>,
    persistence: Persistence<S>,
}

impl<S: KeyValueStore> CollectionStore<S> {
    pub fn open(persistence: Persistence<S>) -> Self {
        let records = persistence.load();
        CollectionStore {
            records,
            persistence,
        }
    }

    pub fn records(&self) -> &[JobRecord] {
        self.records.as_slice()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &JobId) -> Option<&JobRecord> {
        self.records.iter().find(|record| &record.id == id)
    }

    pub fn persistence(&self) -> &Persistence<S> {
        &self.persistence
    }

    pub fn add(&mut self, input: NewJob) -> Result<&JobRecord, ValidationError> {
        self.add_on(input, local_today())
    }

    /// `add` with an explicit creation date.
    pub fn add_on(&mut self, input: NewJob, today: NaiveDate) -> Result<&JobRecord, ValidationError> {
        let record = JobRecord::create(input, today)?;
        info!(id = %record.id, company = %record.company, "added application");
        self.records.insert(0, record);
        self.persistence.save(&self.records);
        Ok(&self.records[0])
    }

    /// Returns false (and writes nothing) when no record has `id`.
    pub fn update(&mut self, id: &JobId, patch: JobPatch) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| &record.id == id) else {
            return false;
        };
        record.apply(patch);
        info!(id = %id, status = %record.status, "updated application");
        self.persistence.save(&self.records);
        true
    }

    /// Returns false (and writes nothing) when no record has `id`.
    pub fn delete(&mut self, id: &JobId) -> bool {
        let Some(index) = self.records.iter().position(|record| &record.id == id) else {
            return false;
        };
        self.records.remove(index);
        info!(id = %id, "deleted application");
        self.persistence.save(&self.records);
        true
    }
}
