// Error types for loading flag definitions

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to load flag definitions: {0}")]
    LoadError(String),

    #[error("Failed to parse flag definitions: {0}")]
    ParseError(String),

    #[error("Invalid definition for flag '{flag}': {message}")]
    InvalidFlag { flag: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvError(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, SourceError>;
