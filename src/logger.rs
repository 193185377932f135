//! Append-only file sink behind the `log` facade.

use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

struct FileLogger {
    file: Mutex<Option<File>>,
    path: Mutex<Option<PathBuf>>,
}

static LOGGER: Lazy<FileLogger> = Lazy::new(|| FileLogger {
    file: Mutex::new(None),
    path: Mutex::new(None),
});

fn open(path: &Path) -> Option<File> {
    OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Installs the file logger once; later calls only adjust the level.
pub fn init(path: &Path, level: log::LevelFilter) {
    if let Some(mut f) = open(path) {
        let _ = writeln!(f, "===== chaptertrans start =====");
        if let Ok(mut guard) = LOGGER.file.lock() {
            *guard = Some(f);
        }
    }
    if let Ok(mut guard) = LOGGER.path.lock() {
        *guard = Some(path.to_path_buf());
    }
    let _ = log::set_logger(&*LOGGER);
    log::set_max_level(level);
}

fn ts() -> String {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    format!("{}.{:03}", now.as_secs(), now.subsec_millis())
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {:<5} {}: {}", ts(), record.level(), record.target(), record.args());
        if let Ok(mut guard) = self.file.lock() {
            if let Some(f) = guard.as_mut() {
                let _ = writeln!(f, "{}", line);
                let _ = f.flush();
                return;
            }
            // Fallback: the file could not be opened at init, retry lazily
            let path = self.path.lock().ok().and_then(|p| p.clone());
            if let Some(mut f) = path.as_deref().and_then(open) {
                let _ = writeln!(f, "{}", line);
                let _ = f.flush();
                *guard = Some(f);
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(f) = guard.as_mut() {
                let _ = f.flush();
            }
        }
    }
}
