use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::errors::HomecoverError;
use crate::logging::append_run_log;
use crate::runtime::FileSystem;
use crate::types::PolicyRecord;

type StoreResult<T> = Result<T, HomecoverError>;

/// JSON-file-backed policy collection. The whole file is read once by
/// [`RecordStore::load`] and rewritten in full by [`RecordStore::persist`].
pub struct RecordStore {
    path: PathBuf,
    records: Vec<PolicyRecord>,
    fs: Arc<dyn FileSystem>,
}

impl RecordStore {
    /// Reads the backing file. A missing file is a first run and yields an
    /// empty store.
    pub fn load(path: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let records = if fs.exists(&path) {
            let raw = fs.read_to_string(&path)?;
            serde_json::from_str::<Vec<PolicyRecord>>(&raw).map_err(|e| {
                HomecoverError::StoreDecode(format!("{}: {e}", path.display()))
            })?
        } else {
            Vec::new()
        };
        append_run_log(
            "info",
            "store.load.completed",
            json!({
                "path": path.display().to_string(),
                "record_count": records.len(),
            }),
        );
        Ok(Self { path, records, fs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[PolicyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn lookup_by_identifier(&self, policy_number: &str) -> Option<&PolicyRecord> {
        self.records
            .iter()
            .find(|record| record.policy_number == policy_number)
    }

    pub fn lookup_mut(&mut self, policy_number: &str) -> Option<&mut PolicyRecord> {
        self.records
            .iter_mut()
            .find(|record| record.policy_number == policy_number)
    }

    /// Overwrites the backing file with the full in-memory collection.
    ///
    /// On failure the in-memory records are left as they are, so memory and
    /// disk can diverge until the next successful persist.
    pub fn persist(&self) -> StoreResult<()> {
        let rendered = render_store(&self.records)?;
        let written = self.write_document(&rendered);
        match &written {
            Ok(()) => append_run_log(
                "info",
                "store.persist.completed",
                json!({
                    "path": self.path.display().to_string(),
                    "record_count": self.records.len(),
                    "bytes": rendered.len(),
                    "sha256": sha256_hex(rendered.as_bytes()),
                }),
            ),
            Err(error) => append_run_log(
                "error",
                "store.persist.failed",
                json!({
                    "path": self.path.display().to_string(),
                    "error": error.to_string(),
                }),
            ),
        }
        written
    }

    fn write_document(&self, rendered: &str) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                self.fs
                    .create_dir_all(parent)
                    .map_err(|e| HomecoverError::Persistence(e.to_string()))?;
            }
        }
        self.fs
            .write_string(&self.path, rendered)
            .map_err(|e| HomecoverError::Persistence(e.to_string()))
    }
}

fn render_store(records: &[PolicyRecord]) -> StoreResult<String> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    records
        .serialize(&mut serializer)
        .map_err(|e| HomecoverError::Persistence(e.to_string()))?;
    String::from_utf8(out).map_err(|e| HomecoverError::Persistence(e.to_string()))
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
