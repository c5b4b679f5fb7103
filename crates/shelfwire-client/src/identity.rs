//! Identity providers backed by the filesystem.
//!
//! The web client keeps the logged-in user as a JSON record; the CLI reads
//! the same shape from a file so logging in and out is a file write away.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use shelfwire_core::{IdentityProvider, UserId};

use crate::ConfigError;

/// Stored user record. Only `id` matters; other fields are ignored.
#[derive(Debug, Deserialize)]
struct UserRecord {
    id: RecordId,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Number(u64),
    Text(String),
}

/// Reads the logged-in user from a JSON file (`{"id": 42, ...}`).
///
/// A missing file means nobody is logged in. The file is re-read on every
/// lookup.
#[derive(Debug, Clone)]
pub struct JsonFileIdentity {
    path: PathBuf,
}

impl JsonFileIdentity {
    /// Provider reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file.
    ///
    /// Returns `Ok(None)` if the file does not exist or holds a blank id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Identity`] if the file exists but cannot be
    /// read or parsed.
    pub fn load(&self) -> Result<Option<UserId>, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(e.to_string())),
        };

        let record: UserRecord =
            serde_json::from_str(&contents).map_err(|e| self.error(e.to_string()))?;

        Ok(match record.id {
            RecordId::Number(id) => Some(UserId::from(id)),
            RecordId::Text(id) => UserId::new(id),
        })
    }

    fn error(&self, reason: String) -> ConfigError {
        ConfigError::Identity { path: self.path.clone(), reason }
    }
}

impl IdentityProvider for JsonFileIdentity {
    fn current_user(&self) -> Option<UserId> {
        match self.load() {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "unreadable identity file, treating as logged out");
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn identity_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn numeric_id() {
        let file = identity_file(r#"{"id": 42, "username": "an"}"#);
        let identity = JsonFileIdentity::new(file.path());

        assert_eq!(identity.current_user(), Some(UserId::from(42)));
    }

    #[test]
    fn string_id() {
        let file = identity_file(r#"{"id": " 42 "}"#);
        let identity = JsonFileIdentity::new(file.path());

        assert_eq!(identity.current_user(), UserId::new("42"));
    }

    #[test]
    fn missing_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let identity = JsonFileIdentity::new(dir.path().join("user.json"));

        assert!(identity.load().unwrap().is_none());
        assert_eq!(identity.current_user(), None);
    }

    #[test]
    fn blank_id_is_logged_out() {
        let file = identity_file(r#"{"id": "  "}"#);
        assert_eq!(JsonFileIdentity::new(file.path()).load().unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error_but_logged_out() {
        let file = identity_file("not json");
        let identity = JsonFileIdentity::new(file.path());

        assert!(matches!(identity.load(), Err(ConfigError::Identity { .. })));
        assert_eq!(identity.current_user(), None);
    }

    #[test]
    fn rereads_after_logout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user.json");
        let identity = JsonFileIdentity::new(&path);

        std::fs::write(&path, r#"{"id": 7}"#).unwrap();
        assert_eq!(identity.current_user(), Some(UserId::from(7)));

        std::fs::remove_file(&path).unwrap();
        assert_eq!(identity.current_user(), None);
    }
}
