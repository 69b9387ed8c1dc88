pub mod config;
pub mod errors;
pub mod logging;
pub mod matching;
pub mod record_store;
pub mod runtime;
pub mod session;
pub mod summary;
pub mod tools;
pub mod types;

use clap::{error::ErrorKind, Parser};
use config::{load_config, AppConfig, CliOverrides};
use errors::HomecoverError;
use logging::{append_run_log, install_run_logger, JsonlLogger};
use record_store::RecordStore;
use runtime::ProductionRuntime;
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use summary::SummaryArtifact;
use tools::{catalog, PolicyDesk};

#[derive(Debug, Clone, Parser)]
#[command(name = "homecover")]
#[command(about = "Home insurance policy desk driven by JSON tool calls on stdin")]
pub struct Cli {
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub data_file: Option<PathBuf>,
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub list_tools: bool,
}

/// One stdout line per dispatched call.
#[derive(Debug, Clone, Serialize)]
struct ReplyLine<'a> {
    tool: Option<&'a str>,
    reply: &'a str,
    artifact_path: Option<String>,
}

pub fn run() -> Result<i32, HomecoverError> {
    let args = std::env::args_os().collect::<Vec<_>>();
    let cwd = std::env::current_dir().map_err(|e| HomecoverError::Io(e.to_string()))?;
    let runtime = ProductionRuntime::new();
    run_with_runtime(&args, &cwd, &runtime)
}

pub fn run_with_runtime(
    args: &[std::ffi::OsString],
    cwd: &Path,
    runtime: &ProductionRuntime,
) -> Result<i32, HomecoverError> {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => match error.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{error}");
                return Ok(0);
            }
            _ => return Err(HomecoverError::Cli(error.to_string())),
        },
    };

    if cli.list_tools {
        let rendered = serde_json::to_string_pretty(&catalog())
            .map_err(|e| HomecoverError::Io(e.to_string()))?;
        runtime.terminal.write_line(&rendered)?;
        return Ok(0);
    }

    let overrides = CliOverrides {
        config_path: cli.config.clone(),
        data_file: cli.data_file.clone(),
        export_dir: cli.export_dir.clone(),
    };
    let cfg = load_config(&overrides, cwd, runtime.file_system.as_ref())?;
    install_logger(&cfg);

    let store = RecordStore::load(&cfg.store.data_file, runtime.file_system.clone())?;
    let mut desk = PolicyDesk::new(store);
    append_run_log(
        "info",
        "desk.started",
        json!({
            "data_file": desk.store().path().display().to_string(),
            "record_count": desk.store().len(),
        }),
    );

    let mut calls = 0usize;
    while let Some(line) = runtime.terminal.read_line()? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        calls += 1;
        let tool = serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|value| value.get("tool").and_then(|t| t.as_str()).map(str::to_string));
        let reply = desk.dispatch_json(line);
        let (text, artifact_path) = match &reply.artifact {
            Some(artifact) => match save_artifact(runtime, &cfg, artifact) {
                Ok(path) => (reply.text.clone(), Some(path.display().to_string())),
                Err(error) => (format!("ERROR: Could not save summary: {error}"), None),
            },
            None => (reply.text.clone(), None),
        };
        let rendered = serde_json::to_string(&ReplyLine {
            tool: tool.as_deref(),
            reply: &text,
            artifact_path,
        })
        .map_err(|e| HomecoverError::Io(e.to_string()))?;
        runtime.terminal.write_line(&rendered)?;
    }

    append_run_log("info", "desk.finished", json!({ "calls": calls }));
    Ok(0)
}

fn install_logger(cfg: &AppConfig) {
    if !cfg.logging.enabled {
        return;
    }
    let mut logger = JsonlLogger::new(&cfg.logging.path);
    logger.max_payload_bytes = cfg.logging.max_payload_bytes;
    logger.budget_bytes = cfg.logging.budget_bytes;
    install_run_logger(logger);
}

fn save_artifact(
    runtime: &ProductionRuntime,
    cfg: &AppConfig,
    artifact: &SummaryArtifact,
) -> Result<PathBuf, HomecoverError> {
    runtime.file_system.create_dir_all(&cfg.summary.export_dir)?;
    let path = cfg.summary.export_dir.join(&artifact.file_name);
    runtime.file_system.write_bytes(&path, &artifact.bytes)?;
    append_run_log(
        "info",
        "summary.exported",
        json!({
            "path": path.display().to_string(),
            "bytes": artifact.bytes.len(),
            "sha256": artifact.sha256,
        }),
    );
    Ok(path)
}
