//! Error taxonomy for the artifact archiver.
//!
//! Missing roots, missing config files and missing source directories are not
//! errors; they degrade to defaults and never reach this type.

use std::path::PathBuf;

/// Errors that abort a delivery.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The per-type config file exists but could not be read.
    #[error("failed to read artifact config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The per-type config file exists but is not well-formed.
    #[error("malformed artifact config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A filesystem primitive failed.
    #[error("{op} failed for {path}: {source}")]
    Filesystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be read.
    #[error("failed to read settings {path}: {source}")]
    SettingsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML or misses required keys.
    #[error("invalid settings: {0}")]
    SettingsParse(#[from] toml::de::Error),
}

impl ArchiveError {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Filesystem {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Result type for archiver operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filesystem_error_names_operation_and_path() {
        let err = ArchiveError::fs(
            "move",
            "/builds/foo-master/coverage",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("move failed for /builds/foo-master/coverage"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn config_parse_error_names_file() {
        let source = serde_yaml::from_str::<serde_yaml::Value>("rcov: [unclosed").unwrap_err();
        let err = ArchiveError::ConfigParse {
            path: PathBuf::from("/w/config/artifacts.yml"),
            source,
        };
        assert!(err
            .to_string()
            .starts_with("malformed artifact config /w/config/artifacts.yml"));
    }
}
