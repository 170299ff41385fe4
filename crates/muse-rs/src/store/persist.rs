//! Versioned on-disk layout of a session.
//!
//! ```json
//! { "version": 1, "state": { "messages": [], "genre": "fantasy", ... } }
//! ```
//!
//! Writes go to a hidden temp file next to the target and are renamed into
//! place, so a crash mid-write leaves the previous blob intact.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::model::Session;

/// Storage key; the default blob file is `<key>.json`.
pub const STORAGE_KEY: &str = "creative-mentor-storage";

/// Layout version written by this build.
pub const BLOB_VERSION: u32 = 1;

#[derive(Serialize)]
struct BlobOut<'a> {
    version: u32,
    state: &'a Session,
}

#[derive(Deserialize)]
struct BlobIn {
    #[serde(default)]
    version: u32,
    state: Session,
}

/// Default blob file name.
pub fn default_file_name() -> String {
    format!("{STORAGE_KEY}.json")
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(default_file_name);
    path.with_file_name(format!(".{name}.tmp"))
}

/// Atomic write: serialize to a temp file, then rename into place.
pub fn save(path: &Path, session: &Session) -> Result<(), String> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create storage dir {}: {e}", dir.display()))?;
    }

    let json = serde_json::to_string_pretty(&BlobOut {
        version: BLOB_VERSION,
        state: session,
    })
    .map_err(|e| format!("Failed to serialize session: {e}"))?;

    let tmp = temp_path(path);
    std::fs::write(&tmp, json).map_err(|e| format!("Failed to write temp session: {e}"))?;
    std::fs::rename(&tmp, path).map_err(|e| format!("Failed to rename session: {e}"))?;

    debug!(
        path = %path.display(),
        messages = session.messages.len(),
        "Saved session"
    );
    Ok(())
}

/// Load a blob. Returns `None` when no blob exists yet.
pub fn load(path: &Path) -> Result<Option<Session>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read session {}: {e}", path.display()))?;
    let blob: BlobIn =
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse session: {e}"))?;
    if blob.version > BLOB_VERSION {
        return Err(format!(
            "Unsupported session version {} (this build reads up to {BLOB_VERSION})",
            blob.version
        ));
    }
    Ok(Some(blob.state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Genre;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(default_file_name());
        let session = Session {
            genre: Genre::Thriller,
            ..Session::default()
        };
        save(&path, &session).unwrap();
        assert_eq!(load(&path).unwrap(), Some(session));
    }

    #[test]
    fn blob_has_version_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        save(&path, &Session::default()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["state"]["genre"], "fantasy");
    }

    #[test]
    fn temp_file_does_not_linger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        save(&path, &Session::default()).unwrap();
        assert!(!dir.path().join(".s.json.tmp").exists());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/s.json");
        save(&path, &Session::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn missing_blob_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load(&dir.path().join("absent.json")).unwrap(), None);
    }

    #[test]
    fn corrupt_blob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load(&path).unwrap_err().contains("parse"));
    }

    #[test]
    fn newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, r#"{"version":2,"state":{}}"#).unwrap();
        assert!(load(&path).unwrap_err().contains("Unsupported"));
    }
}
