use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomecoverError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("store decode error: {0}")]
    StoreDecode(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("no policy is bound to this session")]
    NotAuthenticated,
    #[error("unknown cover type '{requested}' (known: {known:?})")]
    UnknownCoverType {
        requested: String,
        known: Vec<String>,
    },
    #[error("policy {0} not found")]
    RecordNotFound(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid tool arguments: {0}")]
    ToolArguments(String),
}
