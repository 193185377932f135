//! Durable key/value slots for page-wide preferences.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub trait PreferenceStore: Send {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// All slots live in one JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }
}

impl PreferenceStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        // A corrupt file is replaced rather than blocking every later write.
        let mut all = self.read_all().unwrap_or_default();
        all.insert(key.to_string(), value.to_string());
        let s = serde_json::to_string_pretty(&all)?;
        fs::write(&self.path, s).with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    slots: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn with(key: &str, value: &str) -> Self {
        let mut slots = BTreeMap::new();
        slots.insert(key.to_string(), value.to_string());
        Self { slots }
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
