use std::path::PathBuf;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MetaError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid file identifier: {0}")]
    InvalidFileId(String),

    #[error("path escapes the managed storage root: {0}")]
    PathEscape(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("failed to read metadata: {0}")]
    Read(String),

    #[error("exiftool failed: {0}")]
    Tool(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("exiftool did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("filesystem error: {0}")]
    Io(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Tool,
    Io,
    Timeout,
    Config,
}

impl MetaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetaError::Validation(_) | MetaError::InvalidFileId(_) | MetaError::PathEscape(_) => {
                ErrorKind::Validation
            }
            MetaError::NotFound(_) => ErrorKind::NotFound,
            MetaError::Read(_) | MetaError::Tool(_) | MetaError::MissingTool(_) => ErrorKind::Tool,
            MetaError::Timeout { .. } => ErrorKind::Timeout,
            MetaError::Io(_) => ErrorKind::Io,
            MetaError::ConfigRead(_) | MetaError::ConfigParse(_) => ErrorKind::Config,
        }
    }
}
