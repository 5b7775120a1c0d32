//! Error types for configuration operations.

use std::path::PathBuf;

use cadena_core::ChainError;
use thiserror::Error;

/// Errors that can occur while loading, saving or building chain documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Chain document not found
    #[error("chain not found: {0}")]
    ChainNotFound(String),

    /// No module of this kind is registered
    #[error("unknown module kind: {0}")]
    UnknownModule(String),

    /// A link names a module index that does not exist
    #[error("link {link} refers to missing module {module}")]
    MissingModule {
        /// Position of the link in the document.
        link: usize,
        /// Module index it refers to.
        module: usize,
    },

    /// A link names a port the module does not have
    #[error("module {module} ('{kind}') has no port '{port}'")]
    UnknownPort {
        /// Module index in the document.
        module: usize,
        /// Module kind.
        kind: String,
        /// Port name.
        port: String,
    },

    /// A controller or indicator has no link to attach it by
    #[error("satellite {module} ('{kind}') has no link to attach it")]
    UnattachedSatellite {
        /// Module index in the document.
        module: usize,
        /// Module kind.
        kind: String,
    },

    /// The chain refused an edit
    #[error("chain rejected the document: {0}")]
    Chain(#[from] ChainError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
