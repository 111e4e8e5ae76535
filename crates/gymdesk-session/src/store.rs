//! Credential persistence
//!
//! A single named slot holding the opaque bearer token. Absence means
//! anonymous; presence is rehydrated at process start by the session manager,
//! which is the only writer.

use gymdesk_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// JSON field holding the token in the credential file
pub const TOKEN_FIELD: &str = "access_token";

/// Storage slot for the current bearer credential
pub trait CredentialStore: Send + Sync {
    /// Read the stored credential, `None` when nothing is stored
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored credential
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the stored credential (no-op when already empty)
    fn clear(&self) -> Result<()>;
}

/// In-process credential slot
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a credential
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct CredentialFile<'a> {
    access_token: &'a str,
}

/// Credential slot backed by a JSON file (`{"access_token": "..."}`)
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a store at `path` (supports `~` for the home directory)
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            path: expand_tilde(path.as_ref())?,
        })
    }

    /// Store at the default location, `~/.gymdesk/credentials.json`
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            Error::CredentialStore("Could not determine home directory".to_string())
        })?;
        Ok(Self {
            path: home.join(".gymdesk").join("credentials.json"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.as_os_str().to_owned();
        temp.push(".tmp");
        PathBuf::from(temp)
    }

    fn open_temp(&self) -> Result<(PathBuf, File)> {
        let temp_path = self.temp_path();
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&temp_path)?;
        Ok((temp_path, file))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            debug!("Credential file does not exist: {}", self.path.display());
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| {
            Error::CredentialStore(format!(
                "Failed to read credential file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let json: Value = serde_json::from_str(&contents).map_err(|e| {
            Error::CredentialStore(format!(
                "Failed to parse credential file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        match json.get(TOKEN_FIELD) {
            Some(Value::String(token)) if !token.is_empty() => {
                debug!(
                    "Loaded credential from {} (length: {} chars)",
                    self.path.display(),
                    token.len()
                );
                Ok(Some(token.clone()))
            }
            Some(Value::String(_)) => {
                warn!("Credential is empty in {}", self.path.display());
                Ok(None)
            }
            Some(_) => {
                warn!(
                    "Credential field '{}' is not a string in {}",
                    TOKEN_FIELD,
                    self.path.display()
                );
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let body = serde_json::to_vec(&CredentialFile {
            access_token: token,
        })?;

        let (temp_path, mut file) = self.open_temp()?;
        let written = file
            .write_all(&body)
            .and_then(|_| file.sync_all())
            .and_then(|_| fs::rename(&temp_path, &self.path));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::CredentialStore(format!(
                "Failed to write credential file {}: {}",
                self.path.display(),
                e
            )));
        }

        debug!("Stored credential at {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed credential file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::CredentialStore(format!(
                "Failed to remove credential file {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// Expand tilde (~) in path to home directory
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::Config("Invalid UTF-8 in path".to_string()))?;

    let home = || {
        dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
    };

    if let Some(stripped) = path_str.strip_prefix("~/") {
        Ok(home()?.join(stripped))
    } else if path_str == "~" {
        home()
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save("token-1").unwrap();
        assert_eq!(store.load().unwrap(), Some("token-1".to_string()));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_save_creates_parent_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/credentials.json");
        let store = FileCredentialStore::new(&path).unwrap();

        store.save("abc.def.ghi").unwrap();

        assert!(path.exists());
        assert!(!store.temp_path().exists());
        assert_eq!(store.load().unwrap(), Some("abc.def.ghi".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path().join("credentials.json")).unwrap();
        store.save("secret").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path().join("nope.json")).unwrap();

        assert_eq!(store.load().unwrap(), None);
        // Clearing a missing file is a no-op
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_empty_and_non_string_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        let store = FileCredentialStore::new(&path).unwrap();

        fs::write(&path, br#"{"access_token": ""}"#).unwrap();
        assert_eq!(store.load().unwrap(), None);

        fs::write(&path, br#"{"access_token": 42}"#).unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("credentials.json");
        fs::write(&path, b"not valid json").unwrap();

        let store = FileCredentialStore::new(&path).unwrap();
        assert!(matches!(store.load(), Err(Error::CredentialStore(_))));
    }

    #[test]
    fn test_file_store_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::new(temp_dir.path().join("credentials.json")).unwrap();

        store.save("token").unwrap();
        store.clear().unwrap();

        assert!(!store.path().exists());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_expand_tilde() {
        let expanded = expand_tilde(Path::new("~/x/credentials.json")).unwrap();
        assert!(!expanded.to_string_lossy().contains('~'));

        let expanded = expand_tilde(Path::new("/absolute/path")).unwrap();
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }
}
