use crate::errors::HomecoverError;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, HomecoverError>;
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), HomecoverError>;
    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), HomecoverError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), HomecoverError>;
    fn exists(&self, path: &Path) -> bool;
}

pub trait Terminal: Send + Sync {
    /// Next input line without its trailing newline, `None` at end of input.
    fn read_line(&self) -> Result<Option<String>, HomecoverError>;
    fn write_line(&self, line: &str) -> Result<(), HomecoverError>;
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, HomecoverError> {
        std::fs::read_to_string(path).map_err(|e| HomecoverError::Io(e.to_string()))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), HomecoverError> {
        std::fs::write(path, contents).map_err(|e| HomecoverError::Io(e.to_string()))
    }

    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), HomecoverError> {
        std::fs::write(path, contents).map_err(|e| HomecoverError::Io(e.to_string()))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), HomecoverError> {
        std::fs::create_dir_all(path).map_err(|e| HomecoverError::Io(e.to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn read_line(&self) -> Result<Option<String>, HomecoverError> {
        let mut line = String::new();
        let read = std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| HomecoverError::Io(e.to_string()))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn write_line(&self, line: &str) -> Result<(), HomecoverError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| HomecoverError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<Mutex<Vec<PathBuf>>>,
    writes: Arc<Mutex<usize>>,
    fail_next: Arc<Mutex<Option<HomecoverError>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into().into_bytes());
        fs
    }

    pub fn set_fail_next(&self, error: HomecoverError) {
        *self.fail_next.lock().expect("fail lock") = Some(error);
    }

    /// Number of successful file writes since construction.
    pub fn write_count(&self) -> usize {
        *self.writes.lock().expect("writes lock")
    }

    pub fn file_contents(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).to_string())
    }

    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().expect("dirs lock").clone()
    }

    fn maybe_fail(&self) -> Result<(), HomecoverError> {
        if let Some(err) = self.fail_next.lock().expect("fail lock").take() {
            return Err(err);
        }
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, HomecoverError> {
        self.maybe_fail()?;
        self.file_contents(path)
            .ok_or_else(|| HomecoverError::Io(format!("missing file {}", path.display())))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), HomecoverError> {
        self.write_bytes(path, contents.as_bytes())
    }

    fn write_bytes(&self, path: &Path, contents: &[u8]) -> Result<(), HomecoverError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .insert(path.to_path_buf(), contents.to_vec());
        *self.writes.lock().expect("writes lock") += 1;
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), HomecoverError> {
        self.maybe_fail()?;
        self.dirs
            .lock()
            .expect("dirs lock")
            .push(path.to_path_buf());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    input: Arc<Mutex<VecDeque<String>>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: Arc::new(Mutex::new(lines.into_iter().map(Into::into).collect())),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn read_line(&self) -> Result<Option<String>, HomecoverError> {
        Ok(self.input.lock().expect("input lock").pop_front())
    }

    fn write_line(&self, line: &str) -> Result<(), HomecoverError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }
}
