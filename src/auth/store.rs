use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StoreError;
use crate::utils::constants::{CONFIG_DIR, TOKEN_FILE};

/// Where the client keeps its bearer token between invocations.
pub trait TokenStore: Send + Sync {
    /// Current token, empty when none is stored.
    fn load(&self) -> String;
    fn save(&self, token: &str) -> Result<(), StoreError>;
}

/// `~/.deployaja/token`, written atomically with owner-only permissions.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::NoHomeDir)?;
        Ok(Self::new(home.join(CONFIG_DIR).join(TOKEN_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> String {
        match fs::read_to_string(&self.path) {
            Ok(content) => content.trim().to_owned(),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "no stored token");
                String::new()
            }
        }
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        // tmp -> rename so a concurrent reader never sees a half-written token
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, token).map_err(|e| self.io_error(e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
                .map_err(|e| self.io_error(e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "token saved");
        Ok(())
    }
}

/// Process-local store, for embedding the client and for tests.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<String>,
}

impl MemoryTokenStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: Mutex::new(token.into()) }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> String {
        self.token.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Ok(mut current) = self.token.lock() {
            *current = token.to_owned();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nope").join("token"));
        assert_eq!(store.load(), "");
    }

    #[test]
    fn save_creates_parent_and_trims_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join(".deployaja").join("token"));

        store.save("abc.def.ghi\n").unwrap();
        assert_eq!(store.load(), "abc.def.ghi");
        assert!(!store.path().with_extension("tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600, "permissions mismatch (expected 0600)");
        }
    }

    #[test]
    fn save_overwrites_previous_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));

        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load(), "second");
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryTokenStore::new("one");
        assert_eq!(store.load(), "one");
        store.save("two").unwrap();
        assert_eq!(store.load(), "two");
    }
}
