use std::fmt;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::record::JobRecord;
use crate::storage::KeyValueStore;

pub const STORAGE_KEY: &str = "jobnote_applications";

/// A storage problem the adapter recovered from without telling the caller.
#[derive(Debug)]
pub enum PersistenceFailure {
    Read(StorageError),
    Parse(String),
    SkippedRecord { index: usize, reason: String },
    Write(StorageError),
}

impl fmt::Display for PersistenceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceFailure::Read(err) => write!(f, "load failed: {err}"),
            PersistenceFailure::Parse(reason) => write!(f, "stored applications unreadable: {reason}"),
            PersistenceFailure::SkippedRecord { index, reason } => {
                write!(f, "skipped stored application #{index}: {reason}")
            }
            PersistenceFailure::Write(err) => write!(f, "save failed: {err}"),
        }
    }
}

pub type FailureHook = Box<dyn Fn(&PersistenceFailure)>;

/// Loads and saves the whole collection as one JSON array under one key.
///
/// Neither direction ever fails the caller: unreadable data loads as an
/// empty collection and a failed write is dropped. Installed hooks see every
/// such failure.
pub struct Persistence<S> {
    store: S,
    key: String,
    on_failure: Option<FailureHook>,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Persistence {
            store,
            key: key.into(),
            on_failure: None,
        }
    }

    pub fn on_failure(mut self, hook: impl Fn(&PersistenceFailure) + 'static) -> Self {
        self.on_failure = Some(Box::new(hook));
        self
    }

    pub fn key(&self) -> &str {
        self.key.as_str()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load(&self) -> Vec<JobRecord> {
        let raw = match self.store.get(self.key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %self.key, "no stored applications");
                return Vec::new();
            }
            Err(err) => {
                self.report(PersistenceFailure::Read(err));
                return Vec::new();
            }
        };
        let items = match serde_json::from_str::<Value>(raw.as_str()) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                self.report(PersistenceFailure::Parse("expected a JSON array".to_string()));
                return Vec::new();
            }
            Err(err) => {
                self.report(PersistenceFailure::Parse(err.to_string()));
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<JobRecord>(item) {
                Ok(record) => records.push(record),
                Err(err) => self.report(PersistenceFailure::SkippedRecord {
                    index,
                    reason: err.to_string(),
                }),
            }
        }
        debug!(key = %self.key, count = records.len(), "loaded applications");
        records
    }

    pub fn save(&mut self, records: &[JobRecord]) {
        let content = match serde_json::to_string(records) {
            Ok(content) => content,
            Err(err) => {
                self.report(PersistenceFailure::Write(err.into()));
                return;
            }
        };
        match self.store.set(self.key.as_str(), content.as_str()) {
            Ok(()) => debug!(key = %self.key, count = records.len(), "saved applications"),
            Err(err) => self.report(PersistenceFailure::Write(err)),
        }
    }

    fn report(&self, failure: PersistenceFailure) {
        warn!(key = %self.key, "{failure}");
        if let Some(hook) = self.on_failure.as_ref() {
            hook(&failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::NaiveDate;

    use super::*;
    use crate::record::{JobStatus, NewJob};
    use crate::storage::MemoryStore;

    fn sample() -> JobRecord {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        JobRecord::create(
            NewJob::new("Acme", "Frontend Engineer")
                .due_date("2024-06-12")
                .status(JobStatus::Applied)
                .note("remote"),
            today,
        )
        .unwrap()
    }

    fn recorded(
        store: MemoryStore,
    ) -> (Persistence<MemoryStore>, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let persistence = Persistence::new(store)
            .on_failure(move |failure| sink.borrow_mut().push(failure.to_string()));
        (persistence, seen)
    }

    #[test]
    fn saved_records_load_back_equal() {
        let mut persistence = Persistence::new(MemoryStore::new());
        let records = vec![sample(), sample()];
        persistence.save(&records);
        assert_eq!(persistence.load(), records);
    }

    #[test]
    fn missing_key_loads_empty_without_reporting() {
        let (persistence, seen) = recorded(MemoryStore::new());
        assert!(persistence.load().is_empty());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn corrupt_blob_loads_empty() {
        let (persistence, seen) = recorded(MemoryStore::with_value(STORAGE_KEY, "{not json"));
        assert!(persistence.load().is_empty());
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn non_array_blob_loads_empty() {
        let (persistence, seen) = recorded(MemoryStore::with_value(STORAGE_KEY, r#"{"id":"x"}"#));
        assert!(persistence.load().is_empty());
        assert!(seen.borrow()[0].contains("expected a JSON array"));
    }

    #[test]
    fn read_failure_loads_empty() {
        let store = MemoryStore::with_value(STORAGE_KEY, "[]");
        store.fail_reads(true);
        let (persistence, seen) = recorded(store);
        assert!(persistence.load().is_empty());
        assert!(seen.borrow()[0].starts_with("load failed"));
    }

    #[test]
    fn partial_records_pass_through_and_unmappable_ones_are_skipped() {
        let raw = r#"[
            {"id":"a","company":"Acme"},
            42,
            {"id":"b","company":"Globex","position":"Dev","status":"Hired"},
            {"id":"c","company":"Initech","position":"QA","status":"Offer"}
        ]"#;
        let (persistence, seen) = recorded(MemoryStore::with_value(STORAGE_KEY, raw));
        let records = persistence.load();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(records[0].position, "");
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn records_with_null_fields_survive_load_and_next_save() {
        let raw = r#"[{"id":"a","company":"Acme","position":"Dev","appliedDate":"2024-01-01","status":"Applied","note":null},
                      {"id":9,"company":"Globex","position":"QA","appliedDate":null,"status":"Offer"}]"#;
        let store = MemoryStore::with_value(STORAGE_KEY, raw);
        let (mut persistence, seen) = recorded(store.clone());
        let records = persistence.load();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "9"]);
        assert_eq!(records[0].note, "");
        assert!(seen.borrow().is_empty());

        persistence.save(&records);
        let reloaded = persistence.load();
        assert_eq!(reloaded, records);
        assert!(store.value(STORAGE_KEY).unwrap().contains("\"Acme\""));
    }

    #[test]
    fn write_failure_is_swallowed_and_reported() {
        let store = MemoryStore::new();
        store.fail_writes(true);
        let (mut persistence, seen) = recorded(store.clone());
        persistence.save(&[sample()]);
        assert_eq!(store.value(STORAGE_KEY), None);
        assert!(seen.borrow()[0].starts_with("save failed"));
    }

    #[test]
    fn save_overwrites_previous_blob() {
        let store = MemoryStore::new();
        let mut persistence = Persistence::with_key(store.clone(), "custom");
        persistence.save(&[sample()]);
        persistence.save(&[]);
        assert_eq!(store.value("custom").as_deref(), Some("[]"));
        assert_eq!(store.writes(), 2);
    }
}
