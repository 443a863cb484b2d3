// Flag definition document loaders

use crate::flag::FlagDefinition;
use crate::{Result, SourceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Environment variable naming the flag definition file.
pub const FLAGS_FILE_ENV: &str = "FLAGLINE_FLAGS_FILE";

/// Supported flag document formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

/// A set of flag definitions keyed by flag key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagDocument {
    #[serde(default)]
    pub flags: HashMap<String, FlagDefinition>,
}

impl FlagDocument {
    /// Reject definitions that reference undefined variants.
    pub fn validate(&self) -> Result<()> {
        for (key, flag) in &self.flags {
            flag.validate().map_err(|message| SourceError::InvalidFlag {
                flag: key.clone(),
                message,
            })?;
        }
        Ok(())
    }
}

/// Flag definition file loader
pub struct FlagLoader {
    format: FileFormat,
}

impl FlagLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SourceError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| SourceError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    /// Load and validate definitions from a file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<FlagDocument> {
        let content = fs::read_to_string(path)?;
        self.parse(&content)
    }

    /// Parse and validate definitions from a string
    pub fn parse(&self, content: &str) -> Result<FlagDocument> {
        let document = match self.format {
            FileFormat::Json => Self::parse_json(content)?,
            FileFormat::Toml => Self::parse_toml(content)?,
        };

        document.validate()?;
        Ok(document)
    }

    fn parse_json(content: &str) -> Result<FlagDocument> {
        serde_json::from_str(content)
            .map_err(|e| SourceError::ParseError(format!("JSON parse error: {}", e)))
    }

    fn parse_toml(content: &str) -> Result<FlagDocument> {
        toml::from_str(content)
            .map_err(|e| SourceError::ParseError(format!("TOML parse error: {}", e)))
    }
}
