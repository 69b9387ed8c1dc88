use crate::errors::HomecoverError;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 4096;

static RUN_LOGGER: OnceLock<JsonlLogger> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub ts_unix: u64,
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), HomecoverError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| HomecoverError::Io(e.to_string()))?;
        }
        let line = serde_json::to_string(&LogEvent {
            ts_unix: event.ts_unix,
            level: event.level,
            event_type: event.event_type,
            payload: truncate_json(event.payload.clone(), self.max_payload_bytes),
        })
        .map_err(|e| HomecoverError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HomecoverError::Io(e.to_string()))?;
        file.write_all(line.as_bytes())
            .map_err(|e| HomecoverError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| HomecoverError::Io(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            prune_log_dir(parent, &self.path, self.budget_bytes)?;
        }
        Ok(())
    }
}

/// Installs the process-wide run logger. Only the first call wins.
pub fn install_run_logger(logger: JsonlLogger) -> bool {
    RUN_LOGGER.set(logger).is_ok()
}

/// Best-effort structured event; dropped when no logger is installed or the
/// write fails.
pub fn append_run_log(level: &str, event_type: &str, payload: Value) {
    let Some(logger) = RUN_LOGGER.get() else {
        return;
    };
    let _ = logger.append(&LogEvent {
        ts_unix: unix_now(),
        level,
        event_type,
        payload,
    });
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

/// Deletes the oldest `*.jsonl` files in `dir` until they fit `budget_bytes`.
/// The active log file and files of any other kind are never removed.
pub fn prune_log_dir(
    dir: &Path,
    active: &Path,
    budget_bytes: u64,
) -> Result<Vec<PathBuf>, HomecoverError> {
    let mut files = fs::read_dir(dir)
        .map_err(|e| HomecoverError::Io(e.to_string()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == "jsonl"))
        .filter_map(|path| {
            let meta = fs::metadata(&path).ok()?;
            Some((meta.modified().ok(), meta.len(), path))
        })
        .collect::<Vec<_>>();
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut total = files.iter().map(|(_, len, _)| *len).sum::<u64>();
    let mut deleted = Vec::new();
    for (_, len, path) in files {
        if total <= budget_bytes {
            break;
        }
        if path == active {
            continue;
        }
        fs::remove_file(&path).map_err(|e| HomecoverError::Io(e.to_string()))?;
        total = total.saturating_sub(len);
        deleted.push(path);
    }
    Ok(deleted)
}
