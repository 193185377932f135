use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub preference_file: String,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout_secs: 15,
            preference_file: "preferences.json".to_string(),
            log_file: "log.txt".to_string(),
        }
    }
}

impl Config {
    pub fn dir() -> PathBuf {
        let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("."));
        exe.parent().unwrap_or(Path::new(".")).to_path_buf()
    }

    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// `config.json` next to the executable, then environment overrides.
    pub fn load() -> Self {
        let mut cfg = Self::load_from(&Self::path());
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    /// Missing or unparsable files fall back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str::<Config>(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| var(key).filter(|v| !v.is_empty());
        if let Some(v) = set("CHAPTERTRANS_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = set("CHAPTERTRANS_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = v;
        }
        if let Some(v) = set("CHAPTERTRANS_PREFERENCE_FILE") {
            self.preference_file = v;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Relative paths resolve against the executable's directory.
    pub fn resolve(&self, file: &str) -> PathBuf {
        let p = PathBuf::from(file);
        if p.is_absolute() {
            p
        } else {
            Self::dir().join(p)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path();
        let s = serde_json::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}
