//! Asset loader contract.
//!
//! The engine does not fetch or decode assets itself; it delegates to a
//! [`Loader`] supplied by the host environment. The contract is
//! deliberately small: load one path, preload a batch, read back from the
//! cache. Format-specific decoding beyond the generic [`Asset`] shapes
//! (sprite atlases and the like) belongs to content packages, not here.

use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by asset loaders.
#[derive(Debug, Error)]
pub enum LoaderError {
    /// The path is not present (memory loaders, cache-only reads).
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Reading the underlying source failed.
    #[error("failed to read asset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The bytes could not be decoded for the path's format.
    #[error("failed to decode asset {path}: {message}")]
    Decode { path: String, message: String },
}

/// A loaded asset, decoded by file extension.
#[derive(Debug, Clone, PartialEq)]
pub enum Asset {
    /// `.json` payloads.
    Json(Value),
    /// UTF-8 text payloads.
    Text(String),
    /// Everything else, verbatim.
    Bytes(Vec<u8>),
}

impl Asset {
    /// The JSON value, if this is a JSON asset.
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Asset::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The text, if this is a text asset.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Asset::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The raw bytes, if this is a binary asset.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Asset::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// The loading facility the engine consumes.
pub trait Loader {
    /// Load (or return the cached) asset at `path`.
    fn load_asset(&mut self, path: &str) -> Result<&Asset, LoaderError>;

    /// Preload a batch of paths, failing on the first error.
    fn load_assets(&mut self, paths: &[&str]) -> Result<(), LoaderError> {
        for path in paths {
            self.load_asset(path)?;
        }
        Ok(())
    }

    /// Read an already-loaded asset from the cache.
    fn get_asset(&self, path: &str) -> Option<&Asset>;
}
