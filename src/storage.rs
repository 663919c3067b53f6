use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use crate::crypto::{self, CryptoEnvelope};
use crate::error::StorageError;

/// String key-value store the tracker persists into.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    values: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

/// In-process store. Clones share the same map, so a test can keep a handle
/// and inspect what the tracker wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .state
            .borrow_mut()
            .values
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.state.borrow().values.get(key).cloned()
    }

    /// Successful writes so far.
    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.borrow_mut().fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let state = self.state.borrow();
        if state.fail_reads {
            return Err(StorageError::Unavailable("reads disabled".to_string()));
        }
        Ok(state.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        state.values.insert(key.to_string(), value.to_string());
        state.writes += 1;
        Ok(())
    }
}

/// One plain JSON file per key under `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        key_path(self.root.as_path(), key, "json")
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        write_text_file(path.as_path(), value)
    }
}

/// Like [`FileStore`], but every value is sealed with a passphrase-derived
/// AES-256-GCM key.
///
/// PBKDF2 is slow on purpose and the tracker saves on every mutation, so the
/// derived key is kept for the salt it was derived from, once that key has
/// opened the file. A store whose last read failed to decrypt refuses writes,
/// so a wrong passphrase can never re-seal the existing data.
pub struct EncryptedFileStore {
    root: PathBuf,
    passphrase: String,
    iterations: u32,
    cached_key: RefCell<Option<(Vec<u8>, u32, [u8; 32])>>,
    locked: Cell<bool>,
}

impl EncryptedFileStore {
    pub fn new(root: impl Into<PathBuf>, passphrase: impl Into<String>, iterations: u32) -> Self {
        EncryptedFileStore {
            root: root.into(),
            passphrase: passphrase.into(),
            iterations: iterations.max(1),
            cached_key: RefCell::new(None),
            locked: Cell::new(false),
        }
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        key_path(self.root.as_path(), key, "enc")
    }

    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    fn key_for(&self, salt: &[u8], iterations: u32) -> [u8; 32] {
        if let Some((cached_salt, cached_iterations, key)) = self.cached_key.borrow().as_ref() {
            if cached_salt.as_slice() == salt && *cached_iterations == iterations {
                return *key;
            }
        }
        crypto::derive_key(self.passphrase.as_str(), salt, iterations)
    }

    fn remember(&self, salt: &[u8], iterations: u32, key: [u8; 32]) {
        *self.cached_key.borrow_mut() = Some((salt.to_vec(), iterations, key));
    }

    fn write_salt(&self) -> (Vec<u8>, u32) {
        match self.cached_key.borrow().as_ref() {
            Some((salt, iterations, _)) => (salt.clone(), *iterations),
            None => (crypto::fresh_salt(), self.iterations),
        }
    }

    fn open_envelope(&self, envelope: &CryptoEnvelope) -> Result<String, StorageError> {
        let salt = crypto::envelope_salt(envelope)?;
        let derived = self.key_for(salt.as_slice(), envelope.iterations);
        let text = crypto::open(envelope, &derived)?;
        self.remember(salt.as_slice(), envelope.iterations, derived);
        Ok(text)
    }
}

impl KeyValueStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        let envelope: CryptoEnvelope = serde_json::from_str(raw.as_str())?;
        match self.open_envelope(&envelope) {
            Ok(text) => {
                self.locked.set(false);
                Ok(Some(text))
            }
            Err(err) => {
                if matches!(err, StorageError::Decrypt) {
                    self.locked.set(true);
                }
                Err(err)
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.locked.get() {
            return Err(StorageError::Locked);
        }
        let path = self.path_for(key)?;
        let (salt, iterations) = self.write_salt();
        let derived = self.key_for(salt.as_slice(), iterations);
        let envelope = crypto::seal(value, salt.as_slice(), &derived, iterations)?;
        let content = serde_json::to_string(&envelope)?;
        write_text_file(path.as_path(), content.as_str())?;
        self.remember(salt.as_slice(), iterations, derived);
        Ok(())
    }
}

fn key_path(root: &Path, key: &str, extension: &str) -> Result<PathBuf, StorageError> {
    let rel = sanitize_relative_path(key)?;
    let mut path = root.join(rel);
    path.set_extension(extension);
    Ok(path)
}

fn sanitize_relative_path(value: &str) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();
    for component in Path::new(value).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(StorageError::InvalidKey(value.to_string())),
        }
    }
    if out.as_os_str().is_empty() {
        return Err(StorageError::InvalidKey(value.to_string()));
    }
    Ok(out)
}

fn write_text_file(path: &Path, content: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
