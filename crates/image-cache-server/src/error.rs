//! Error types for the image cache server

use image_cache_store::StoreError;
use std::fmt;

#[derive(Debug)]
pub enum ImageCacheError {
    Store(StoreError),
    Http(Box<reqwest::Error>),
    /// Origin answered with a non-success status
    OriginStatus(u16),
    /// Origin answered but the body is not usable image data
    OriginPayload(String),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ImageCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageCacheError::Store(err) => write!(f, "Store error: {}", err),
            ImageCacheError::Http(err) => write!(f, "HTTP error: {}", err),
            ImageCacheError::OriginStatus(status) => {
                write!(f, "Origin returned status {}", status)
            }
            ImageCacheError::OriginPayload(msg) => write!(f, "Invalid origin payload: {}", msg),
            ImageCacheError::Io(err) => write!(f, "IO error: {}", err),
            ImageCacheError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ImageCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImageCacheError::Store(err) => Some(err),
            ImageCacheError::Http(err) => Some(err.as_ref()),
            ImageCacheError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<StoreError> for ImageCacheError {
    fn from(err: StoreError) -> Self {
        ImageCacheError::Store(err)
    }
}

impl From<reqwest::Error> for ImageCacheError {
    fn from(err: reqwest::Error) -> Self {
        ImageCacheError::Http(Box::new(err))
    }
}

impl From<std::io::Error> for ImageCacheError {
    fn from(err: std::io::Error) -> Self {
        ImageCacheError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ImageCacheError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ImageCacheError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImageCacheError>;
