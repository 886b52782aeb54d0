//! Error types for the image store

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum StoreError {
    /// Key cannot be mapped to a file inside the cache directory
    InvalidKey(String),
    /// No readable entry at the given path
    NotFound(PathBuf),
    /// Cache directory path is taken by something other than a directory
    NotADirectory(PathBuf),
    Io(Box<std::io::Error>),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::InvalidKey(msg) => write!(f, "Invalid cache key: {}", msg),
            StoreError::NotFound(path) => write!(f, "Cache entry not found: {}", path.display()),
            StoreError::NotADirectory(path) => {
                write!(f, "Cache path is not a directory: {}", path.display())
            }
            StoreError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
