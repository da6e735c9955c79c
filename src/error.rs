//! Error types for hosts file operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`crate::hosts::HostsFile`].
#[derive(Debug, Error)]
pub enum HostsError {
    #[error("unable to read hosts file {}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write hosts file {}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} already exists")]
    DuplicateDomain(String),

    #[error("{0} doesn't exist")]
    DomainNotFound(String),

    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

/// Result type alias using [`HostsError`].
pub type Result<T> = std::result::Result<T, HostsError>;
