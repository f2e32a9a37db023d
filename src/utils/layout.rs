// dashboardtool/src/utils/layout.rs
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, Result};

pub const ASSET_DIR: &str = "assets";
pub const TEMPLATE_DIR: &str = "templates";
pub const DATA_SET_DIR: &str = "data-sets";
pub const DATA_SET_REFRESH_PROPS_SUFFIX: &str = "-data-set-refresh-properties";
pub const DATA_SET_REFRESH_SCHEDULES_SUFFIX: &str = "-data-set-refresh-schedules";

/// On-disk asset tree rooted at a caller-supplied directory:
///
/// ```text
/// <root>/assets/templates/<name>.json
/// <root>/assets/data-sets/<name>.json
/// <root>/assets/data-sets/<name>-data-set-refresh-properties.json
/// <root>/assets/data-sets/<name>-data-set-refresh-schedules.json
/// ```
#[derive(Debug, Clone)]
pub struct AssetLayout {
    root: PathBuf,
}

impl AssetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.root.join(ASSET_DIR).join(TEMPLATE_DIR)
    }

    pub fn data_sets_dir(&self) -> PathBuf {
        self.root.join(ASSET_DIR).join(DATA_SET_DIR)
    }

    pub fn template_file(&self, name: &str) -> PathBuf {
        self.templates_dir().join(format!("{}.json", name))
    }

    pub fn data_set_file(&self, name: &str) -> PathBuf {
        self.data_sets_dir().join(format!("{}.json", name))
    }

    pub fn refresh_properties_file(&self, name: &str) -> PathBuf {
        self.data_sets_dir()
            .join(format!("{}{}.json", name, DATA_SET_REFRESH_PROPS_SUFFIX))
    }

    pub fn refresh_schedules_file(&self, name: &str) -> PathBuf {
        self.data_sets_dir()
            .join(format!("{}{}.json", name, DATA_SET_REFRESH_SCHEDULES_SUFFIX))
    }

    /// Creates both asset subdirectories. Safe to call repeatedly.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.templates_dir(), self.data_sets_dir()] {
            fs::create_dir_all(&dir).map_err(|e| AppError::io(&dir, e))?;
        }
        Ok(())
    }
}

pub fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| AppError::MalformedDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reads `path` if it exists; `None` otherwise.
pub fn read_optional_json(path: &Path) -> Result<Option<Value>> {
    if path.exists() {
        read_json(path).map(Some)
    } else {
        Ok(None)
    }
}

/// Writes `value` as indented JSON. The write is not atomic.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).map_err(|e| AppError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_follow_asset_convention() {
        let layout = AssetLayout::new("/tmp/out");
        assert_eq!(
            layout.template_file("library"),
            PathBuf::from("/tmp/out/assets/templates/library.json")
        );
        assert_eq!(
            layout.data_set_file("patron_events"),
            PathBuf::from("/tmp/out/assets/data-sets/patron_events.json")
        );
        assert_eq!(
            layout.refresh_properties_file("patron_events"),
            PathBuf::from("/tmp/out/assets/data-sets/patron_events-data-set-refresh-properties.json")
        );
        assert_eq!(
            layout.refresh_schedules_file("patron_events"),
            PathBuf::from("/tmp/out/assets/data-sets/patron_events-data-set-refresh-schedules.json")
        );
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| AppError::io("tempdir", e))?;
        let layout = AssetLayout::new(dir.path());
        layout.ensure_dirs()?;
        layout.ensure_dirs()?;
        assert!(layout.templates_dir().is_dir());
        assert!(layout.data_sets_dir().is_dir());
        Ok(())
    }

    #[test]
    fn test_json_round_trip_and_missing_files() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| AppError::io("tempdir", e))?;
        let path = dir.path().join("doc.json");
        write_json(&path, &json!({ "Name": "library" }))?;
        assert_eq!(read_json(&path)?, json!({ "Name": "library" }));

        let missing = dir.path().join("missing.json");
        assert!(read_optional_json(&missing)?.is_none());
        assert!(matches!(read_json(&missing), Err(AppError::Io { .. })));

        fs::write(&path, "{ not json").map_err(|e| AppError::io(&path, e))?;
        assert!(matches!(read_json(&path), Err(AppError::MalformedDocument { .. })));
        Ok(())
    }
}
