use crate::errors::HomecoverError;
use crate::logging::{DEFAULT_DISK_BUDGET_BYTES, DEFAULT_MAX_PAYLOAD_BYTES};
use crate::runtime::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub summary: SummaryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryConfig {
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                data_file: PathBuf::from("data/home_insurance_data.json"),
            },
            summary: SummaryConfig {
                export_dir: PathBuf::from("exports"),
            },
            logging: LoggingConfig {
                enabled: true,
                path: PathBuf::from(".cache/homecover/run.jsonl"),
                max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
                budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialAppConfig {
    store: Option<PartialStoreConfig>,
    summary: Option<PartialSummaryConfig>,
    logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialStoreConfig {
    data_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSummaryConfig {
    export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialLoggingConfig {
    enabled: Option<bool>,
    path: Option<PathBuf>,
    max_payload_bytes: Option<usize>,
    budget_bytes: Option<u64>,
}

/// Defaults, then the TOML file, then CLI overrides. Relative paths are
/// resolved against `process_cwd`.
pub fn load_config(
    overrides: &CliOverrides,
    process_cwd: &Path,
    fs: &dyn FileSystem,
) -> Result<AppConfig, HomecoverError> {
    let mut cfg = AppConfig::default();

    if let Some(path) = &overrides.config_path {
        let file_contents = fs.read_to_string(path)?;
        let partial: PartialAppConfig = toml::from_str(&file_contents)
            .map_err(|e| HomecoverError::ConfigParse(e.to_string()))?;
        merge_partial_config(&mut cfg, partial);
    }

    apply_cli_overrides(&mut cfg, overrides);
    validate_config(&cfg)?;
    absolutize_paths(&mut cfg, process_cwd);
    Ok(cfg)
}

fn merge_partial_config(cfg: &mut AppConfig, partial: PartialAppConfig) {
    if let Some(store) = partial.store {
        if let Some(data_file) = store.data_file {
            cfg.store.data_file = data_file;
        }
    }

    if let Some(summary) = partial.summary {
        if let Some(export_dir) = summary.export_dir {
            cfg.summary.export_dir = export_dir;
        }
    }

    if let Some(logging) = partial.logging {
        if let Some(value) = logging.enabled {
            cfg.logging.enabled = value;
        }
        if let Some(value) = logging.path {
            cfg.logging.path = value;
        }
        if let Some(value) = logging.max_payload_bytes {
            cfg.logging.max_payload_bytes = value;
        }
        if let Some(value) = logging.budget_bytes {
            cfg.logging.budget_bytes = value;
        }
    }
}

fn apply_cli_overrides(cfg: &mut AppConfig, overrides: &CliOverrides) {
    if let Some(data_file) = &overrides.data_file {
        cfg.store.data_file = data_file.clone();
    }
    if let Some(export_dir) = &overrides.export_dir {
        cfg.summary.export_dir = export_dir.clone();
    }
}

fn absolutize_paths(cfg: &mut AppConfig, base: &Path) {
    cfg.store.data_file = absolutize_path(base, &cfg.store.data_file);
    cfg.summary.export_dir = absolutize_path(base, &cfg.summary.export_dir);
    cfg.logging.path = absolutize_path(base, &cfg.logging.path);
}

fn absolutize_path(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

fn validate_config(cfg: &AppConfig) -> Result<(), HomecoverError> {
    if cfg.store.data_file.as_os_str().is_empty() {
        return Err(HomecoverError::InvalidConfig(
            "store.data_file must not be empty".to_string(),
        ));
    }
    if cfg.logging.max_payload_bytes == 0 {
        return Err(HomecoverError::InvalidConfig(
            "logging.max_payload_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
