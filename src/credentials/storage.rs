//! File-backed credential storage.
//!
//! The credential is written as JSON to a sibling `.tmp` file, fsynced, and
//! renamed over the target so readers see either the old or the new value.

use super::{Credential, TokenStore};
use crate::error::EtlError;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Stores one credential in a single file.
///
/// Files holding only a bare token (one line of text) are still accepted on
/// read; `obtained_at` then comes from the file's modification time.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn no_credential(&self) -> EtlError {
        EtlError::NoCredential(self.path.display().to_string())
    }

    fn parse_legacy(&self, contents: &str) -> Result<Credential, EtlError> {
        let value = contents.trim();
        if value.is_empty() {
            return Err(self.no_credential());
        }

        let obtained_at = fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        Ok(Credential {
            value: value.to_string(),
            obtained_at,
            expires_at: None,
        })
    }
}

impl TokenStore for FileTokenStore {
    fn put(&self, credential: &Credential) -> Result<(), EtlError> {
        if credential.value.trim().is_empty() {
            return Err(EtlError::MalformedResponse(
                "refusing to store an empty credential".to_string(),
            ));
        }

        let json = serde_json::to_string_pretty(credential)
            .map_err(EtlError::storage("Failed to serialize credential"))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(EtlError::storage("Failed to create credential directory"))?;
        }

        let tmp_path = self.tmp_path();
        {
            let mut tmp_file = File::create(&tmp_path)
                .map_err(EtlError::storage("Failed to create temporary credential file"))?;
            tmp_file
                .write_all(json.as_bytes())
                .map_err(EtlError::storage("Failed to write credential"))?;
            tmp_file
                .sync_all()
                .map_err(EtlError::storage("Failed to sync credential file to disk"))?;
        }

        fs::rename(&tmp_path, &self.path)
            .map_err(EtlError::storage("Failed to rename temporary credential file"))?;

        tracing::debug!(path = %self.path.display(), "Credential stored");
        Ok(())
    }

    fn get(&self) -> Result<Credential, EtlError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(self.no_credential()),
            Err(e) => return Err(EtlError::storage("Failed to read credential file")(e)),
        };

        if !contents.trim_start().starts_with('{') {
            return self.parse_legacy(&contents);
        }

        let credential: Credential = serde_json::from_str(&contents)
            .map_err(EtlError::storage("Failed to parse credential file"))?;
        if credential.value.trim().is_empty() {
            return Err(self.no_credential());
        }
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store(dir: &TempDir) -> FileTokenStore {
        FileTokenStore::new(dir.path().join("access_token.txt"))
    }

    #[test]
    fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        let credential = Credential {
            value: "BQC-access-token".to_string(),
            obtained_at: Utc::now(),
            expires_at: Some(Utc::now() + Duration::hours(1)),
        };

        store.put(&credential).expect("Failed to store");
        let retrieved = store.get().expect("Failed to get");

        assert_eq!(retrieved, credential);
    }

    #[test]
    fn test_get_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        let err = store.get().unwrap_err();
        assert!(matches!(err, EtlError::NoCredential(_)));
    }

    #[test]
    fn test_put_overwrites_previous_credential() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        store.put(&Credential::new("first".to_string())).unwrap();
        store.put(&Credential::new("second".to_string())).unwrap();

        assert_eq!(store.get().unwrap().value, "second");
    }

    #[test]
    fn test_put_leaves_no_temporary_file() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        store.put(&Credential::new("token".to_string())).unwrap();

        assert!(store.path().exists());
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn test_stale_temporary_file_is_not_read() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        // a crash mid-write leaves only the temporary file behind
        fs::write(store.tmp_path(), "{\"value\": \"half").unwrap();

        assert!(matches!(store.get(), Err(EtlError::NoCredential(_))));
    }

    #[test]
    fn test_legacy_plain_text_file() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        fs::write(store.path(), "plain-token\n").unwrap();

        let credential = store.get().unwrap();
        assert_eq!(credential.value, "plain-token");
        assert!(credential.expires_at.is_none());
    }

    #[test]
    fn test_empty_file_is_no_credential() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);
        fs::write(store.path(), "   \n").unwrap();

        assert!(matches!(store.get(), Err(EtlError::NoCredential(_))));
    }

    #[test]
    fn test_put_rejects_empty_value() {
        let dir = TempDir::new().unwrap();
        let store = create_test_store(&dir);

        assert!(store.put(&Credential::new(String::new())).is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_put_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested/state/token.json"));

        store.put(&Credential::new("token".to_string())).unwrap();
        assert_eq!(store.get().unwrap().value, "token");
    }

    #[test]
    fn test_expiry_check() {
        let now = Utc::now();
        let mut credential = Credential::new("token".to_string());
        assert!(!credential.is_expired_at(now));

        credential.expires_at = Some(now - Duration::seconds(1));
        assert!(credential.is_expired_at(now));
    }
}
