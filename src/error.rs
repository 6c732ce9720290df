use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::start_time::TimeEncodingError;

/// Everything that can go wrong while loading a configuration.
///
/// Loading fails on the first problem found; a partially valid
/// configuration is never handed out.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: section [{section}] already defined")]
    DuplicateSection { line: usize, section: String },
    #[error("line {line}: key {key} already defined in section [{section}]")]
    DuplicateKey {
        line: usize,
        section: String,
        key: String,
    },
    #[error("missing section [{section}]")]
    MissingSection { section: String },
    #[error("missing key {key} in section [{section}]")]
    MissingKey { section: String, key: String },
    #[error("[{section}] {key}: {value:?} is not a valid integer")]
    MalformedInteger {
        section: String,
        key: String,
        value: String,
    },
    #[error("[{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        reason: String,
    },
    #[error("daily_slots is {expected}, but only {found} complete slot definitions were found ({missing} is missing)")]
    SlotCountMismatch {
        expected: usize,
        found: usize,
        missing: String,
    },
    #[error("[{section}] {key}: invalid start time {value}")]
    InvalidTimeEncoding {
        section: String,
        key: String,
        value: u16,
        #[source]
        source: TimeEncodingError,
    },
}

impl ConfigError {
    pub(crate) fn missing_key(section: &str, key: &str) -> ConfigError {
        ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    pub(crate) fn malformed_integer(section: &str, key: &str, value: &str) -> ConfigError {
        ConfigError::MalformedInteger {
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn invalid_value(section: &str, key: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
