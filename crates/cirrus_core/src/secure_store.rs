//! Credential storage used by the user layer.

use crate::error::CoreResult;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Key holding the logged-in username.
pub const USERNAME_KEY: &str = "Username";
/// Key holding the logged-in user's record identifier.
pub const USER_ID_KEY: &str = "UserObjectID";
/// Key holding the session identifier.
pub const SESSION_ID_KEY: &str = "SessionID";

/// Small key/value store for session data.
pub trait SecureStore: Send + Sync {
    /// Returns the value for a key.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores a value.
    fn set(&self, key: &str, value: &str) -> CoreResult<()>;

    /// Removes every value.
    fn clear(&self) -> CoreResult<()>;
}

/// Secure store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySecureStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemorySecureStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemorySecureStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        self.values.write().clear();
        Ok(())
    }
}

/// Secure store persisted as a JSON object in a file.
///
/// Used by command-line tools to keep a session across invocations. The
/// file holds a session token in plain text. On Unix it is readable and
/// writable by its owner only (mode `0600`), including when a file with
/// wider permissions already existed.
#[derive(Debug)]
pub struct FileSecureStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileSecureStore {
    /// Opens a store, loading existing values from `path` if present.
    ///
    /// An unreadable or malformed file starts an empty store.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring malformed session file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            values: RwLock::new(values),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let mut file = owner_only(OpenOptions::new().write(true).create(true).truncate(true))
            .open(&self.path)?;
        restrict(&file)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}

#[cfg(unix)]
fn owner_only(options: &mut OpenOptions) -> &mut OpenOptions {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o600)
}

#[cfg(not(unix))]
fn owner_only(options: &mut OpenOptions) -> &mut OpenOptions {
    options
}

/// Narrows a file that existed before with looser permissions.
#[cfg(unix)]
fn restrict(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

impl SecureStore for FileSecureStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn clear(&self) -> CoreResult<()> {
        let mut values = self.values.write();
        values.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store() {
        let store = MemorySecureStore::new();
        assert_eq!(store.get(SESSION_ID_KEY), None);
        store.set(SESSION_ID_KEY, "s1").unwrap();
        assert_eq!(store.get(SESSION_ID_KEY).as_deref(), Some("s1"));
        store.clear().unwrap();
        assert_eq!(store.get(SESSION_ID_KEY), None);
    }

    #[test]
    fn file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileSecureStore::open(&path);
        store.set(USERNAME_KEY, "alice").unwrap();
        store.set(SESSION_ID_KEY, "s1").unwrap();
        drop(store);

        let store = FileSecureStore::open(&path);
        assert_eq!(store.get(USERNAME_KEY).as_deref(), Some("alice"));
        assert_eq!(store.get(SESSION_ID_KEY).as_deref(), Some("s1"));

        store.clear().unwrap();
        assert!(!path.exists());
        assert_eq!(FileSecureStore::open(&path).get(USERNAME_KEY), None);
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;

        FileSecureStore::open(&path).set(SESSION_ID_KEY, "s1").unwrap();
        assert_eq!(mode(&path), 0o600);

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        FileSecureStore::open(&path).set(SESSION_ID_KEY, "s2").unwrap();
        assert_eq!(mode(&path), 0o600);
        assert_eq!(
            FileSecureStore::open(&path).get(SESSION_ID_KEY).as_deref(),
            Some("s2")
        );
    }

    #[test]
    fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();
        let store = FileSecureStore::open(&path);
        assert_eq!(store.get(USERNAME_KEY), None);
    }
}
