//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Session storage collaborators and the session gate."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use meterlink_net::Credential;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::NoSessionError;

/// External owner of the bearer credential.
///
/// The emission core only reads from storage; `set` and `clear` belong to the
/// login and logout paths.
pub trait SessionStorage: Send + Sync + 'static {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: Credential) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Process-local storage, used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: RwLock<Option<Credential>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: RwLock::new(Some(credential)),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self) -> Option<Credential> {
        self.slot.read().clone()
    }

    fn set(&self, credential: Credential) -> Result<()> {
        *self.slot.write() = Some(credential);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.write().take();
        Ok(())
    }
}

/// Token persisted to a single file between daemon invocations.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn get(&self) -> Option<Credential> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Credential::new(contents),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unable to read session token");
                None
            }
        }
    }

    fn set(&self, credential: Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("unable to create session directory {}", parent.display())
            })?;
        }
        fs::write(&self.path, credential.expose())
            .with_context(|| format!("unable to write session token {}", self.path.display()))?;
        debug!(path = %self.path.display(), "session token stored");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("unable to remove session token {}", self.path.display())),
        }
    }
}

/// Answers whether emission may proceed, reading through to storage on every
/// call so a logout elsewhere is seen by the next tick.
#[derive(Clone)]
pub struct SessionGate {
    storage: Arc<dyn SessionStorage>,
}

impl SessionGate {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn current_credential(&self) -> Option<Credential> {
        self.storage.get()
    }

    /// The held credential, or [`NoSessionError`] when absent. No retries.
    pub fn require(&self) -> Result<Credential, NoSessionError> {
        self.current_credential().ok_or(NoSessionError)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_credential().is_some()
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn credential(token: &str) -> Credential {
        Credential::new(token).unwrap()
    }

    #[test]
    fn gate_requires_a_credential() {
        let storage = Arc::new(MemorySessionStorage::new());
        let gate = SessionGate::new(storage.clone());
        assert_eq!(gate.require(), Err(NoSessionError));
        assert!(!gate.is_authenticated());

        storage.set(credential("abc")).unwrap();
        assert_eq!(gate.require().unwrap().expose(), "abc");

        storage.clear().unwrap();
        assert!(gate.current_credential().is_none());
    }

    #[test]
    fn credential_is_replaced_wholesale() {
        let storage = MemorySessionStorage::with_credential(credential("first"));
        storage.set(credential("second")).unwrap();
        assert_eq!(storage.get().unwrap().expose(), "second");
    }

    #[test]
    fn file_storage_round_trips_and_clears() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("nested/token"));
        assert!(storage.get().is_none());

        storage.set(credential("file-token")).unwrap();
        assert_eq!(storage.get().unwrap().expose(), "file-token");

        storage.clear().unwrap();
        assert!(storage.get().is_none());
        storage.clear().unwrap();
    }

    #[test]
    fn blank_token_file_counts_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();
        let gate = SessionGate::new(Arc::new(FileSessionStorage::new(path)));
        assert_eq!(gate.require(), Err(NoSessionError));
    }
}
