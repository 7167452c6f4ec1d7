//! Atomic JSON persistence for index state.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;

/// Write `value` as JSON via a temp file + rename so readers never observe
/// a half-written state file.
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load persisted JSON state. Missing files and corrupt content both
/// degrade to `None`; corruption leaves a warning so the forced re-scan has
/// a log trail.
pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "failed to read persisted state: {e}");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                "corrupt persisted state, treating as empty: {e}"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        let mut table = BTreeMap::new();
        table.insert("a.rs".to_string(), "hash1".to_string());

        save_json(&path, &table).unwrap();
        let loaded: BTreeMap<String, String> = load_json(&path).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<BTreeMap<String, String>> = load_json(&dir.path().join("absent.json"));
        assert!(loaded.is_none());
    }

    #[test]
    fn corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{not json at all").unwrap();
        let loaded: Option<BTreeMap<String, String>> = load_json(&path);
        assert!(loaded.is_none());
    }

    #[test]
    fn save_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        save_json(&path, &vec![1u32, 2]).unwrap();
        save_json(&path, &vec![3u32]).unwrap();
        let loaded: Vec<u32> = load_json(&path).unwrap();
        assert_eq!(loaded, vec![3]);
    }
}
