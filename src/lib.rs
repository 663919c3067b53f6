//! JobNote: personal job-application tracking.
//!
//! The crate holds everything below the rendering layer: the record model,
//! the persisted collection, the filtered/sorted view of it, due-date
//! urgency and the per-session controller that ties them together. Storage
//! is any [`KeyValueStore`]; plain and passphrase-encrypted file stores are
//! included.

pub mod collection;
pub mod config;
pub mod crypto;
pub mod due;
pub mod error;
pub mod persistence;
pub mod projection;
pub mod record;
pub mod storage;
pub mod tracker;

pub use collection::CollectionStore;
pub use config::TrackerConfig;
pub use due::{classify, classify_now, Urgency};
pub use error::{Field, FieldError, StorageError, ValidationError};
pub use persistence::{Persistence, PersistenceFailure, STORAGE_KEY};
pub use projection::{project, StatusFilter};
pub use record::{JobId, JobPatch, JobRecord, JobStatus, NewJob};
pub use storage::{EncryptedFileStore, FileStore, KeyValueStore, MemoryStore};
pub use tracker::{AddForm, CardDraft, JobCardView, Tracker};
