//! Flag stores for UI state that survives the session.
//!
//! [`FileFlagStore`] keeps flags in a small JSON object on disk:
//!
//! ```json
//! { "menu-guide-dismissed": true }
//! ```

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::traits::FlagStore;

/// Flags held in memory only.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    flags: Mutex<BTreeMap<String, bool>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(key: &str, value: bool) -> Self {
        let store = Self::default();
        store
            .flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        store
    }
}

impl FlagStore for MemoryFlagStore {
    fn get_flag(&self, key: &str) -> bool {
        self.flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .copied()
            .unwrap_or(false)
    }

    fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.flags
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Flags persisted as a JSON file. Reads hit the disk every time so an
/// external reset is picked up without a restart.
#[derive(Debug)]
pub struct FileFlagStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, bool>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read flag file: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse flag file: {}", self.path.display()))
    }

    /// Remove every stored flag.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl FlagStore for FileFlagStore {
    fn get_flag(&self, key: &str) -> bool {
        match self.load() {
            Ok(flags) => flags.get(key).copied().unwrap_or(false),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable flag file");
                false
            }
        }
    }

    fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut flags = self.load().unwrap_or_default();
        flags.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&flags)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write flag file: {}", self.path.display()))?;
        Ok(())
    }
}
