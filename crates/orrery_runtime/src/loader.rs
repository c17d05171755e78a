//! Concrete asset loaders.
//!
//! [`FileLoader`] resolves paths against a root directory, decodes by file
//! extension into the generic [`Asset`] shapes, and caches everything it
//! reads. [`MemoryLoader`] serves preregistered assets, for tests and
//! demos that should not touch the filesystem.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::PathBuf;

use tracing::debug;

use orrery_core::{Asset, Loader, LoaderConfig, LoaderError};

/// Filesystem-backed loader with a path-keyed cache.
#[derive(Debug, Default)]
pub struct FileLoader {
    root: PathBuf,
    cache: HashMap<String, Asset>,
}

impl FileLoader {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    /// Build a loader from the engine configuration's loader section.
    #[must_use]
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.asset_root.clone())
    }

    /// Number of assets currently cached.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl Loader for FileLoader {
    fn load_asset(&mut self, path: &str) -> Result<&Asset, LoaderError> {
        match self.cache.entry(path.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let full = self.root.join(path.trim_start_matches('/'));
                let bytes = std::fs::read(&full).map_err(|source| LoaderError::Io {
                    path: path.to_string(),
                    source,
                })?;
                let asset = decode(path, bytes)?;
                debug!(path, "asset loaded");
                Ok(entry.insert(asset))
            }
        }
    }

    fn get_asset(&self, path: &str) -> Option<&Asset> {
        self.cache.get(path)
    }
}

/// Decode raw bytes by file extension.
fn decode(path: &str, bytes: Vec<u8>) -> Result<Asset, LoaderError> {
    if path.ends_with(".json") {
        let value = serde_json::from_slice(&bytes).map_err(|e| LoaderError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(Asset::Json(value))
    } else if path.ends_with(".txt") || path.ends_with(".md") || path.ends_with(".csv") {
        let text = String::from_utf8(bytes).map_err(|e| LoaderError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(Asset::Text(text))
    } else {
        Ok(Asset::Bytes(bytes))
    }
}

/// In-memory loader serving preregistered assets.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    assets: HashMap<String, Asset>,
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preregister an asset under a path.
    pub fn insert(&mut self, path: impl Into<String>, asset: Asset) -> &mut Self {
        self.assets.insert(path.into(), asset);
        self
    }
}

impl Loader for MemoryLoader {
    fn load_asset(&mut self, path: &str) -> Result<&Asset, LoaderError> {
        self.assets
            .get(path)
            .ok_or_else(|| LoaderError::NotFound(path.to_string()))
    }

    fn get_asset(&self, path: &str) -> Option<&Asset> {
        self.assets.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_loader_serves_preregistered() {
        let mut loader = MemoryLoader::new();
        loader.insert("config.json", Asset::Json(json!({"lives": 3})));

        let asset = loader.load_asset("config.json").unwrap();
        assert_eq!(asset.as_json().unwrap()["lives"], 3);
        assert!(loader.get_asset("config.json").is_some());
    }

    #[test]
    fn test_memory_loader_missing_asset() {
        let mut loader = MemoryLoader::new();
        let err = loader.load_asset("ghost.png").unwrap_err();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn test_file_loader_decodes_by_extension() {
        let root = std::env::temp_dir().join("orrery_loader_test");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("atlas.json"), br#"{"frames": []}"#).unwrap();
        std::fs::write(root.join("notes.txt"), b"hello").unwrap();
        std::fs::write(root.join("blob.bin"), [1u8, 2, 3]).unwrap();

        let mut loader = FileLoader::new(&root);
        assert!(loader.load_asset("atlas.json").unwrap().as_json().is_some());
        assert_eq!(
            loader.load_asset("notes.txt").unwrap().as_text(),
            Some("hello")
        );
        assert_eq!(
            loader.load_asset("blob.bin").unwrap().as_bytes(),
            Some(&[1u8, 2, 3][..])
        );
        assert_eq!(loader.cached(), 3);
    }

    #[test]
    fn test_file_loader_caches_reads() {
        let root = std::env::temp_dir().join("orrery_loader_cache_test");
        std::fs::create_dir_all(&root).unwrap();
        let file = root.join("value.json");
        std::fs::write(&file, b"1").unwrap();

        let mut loader = FileLoader::new(&root);
        loader.load_asset("value.json").unwrap();
        // The cache answers even after the backing file changes.
        std::fs::write(&file, b"2").unwrap();
        assert_eq!(
            loader.load_asset("value.json").unwrap(),
            &Asset::Json(json!(1))
        );
    }

    #[test]
    fn test_file_loader_missing_file_is_io_error() {
        let mut loader = FileLoader::new(std::env::temp_dir());
        let err = loader.load_asset("definitely_missing.json").unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }

    #[test]
    fn test_from_config_resolves_asset_root() {
        let root = std::env::temp_dir().join("orrery_loader_config_test");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("tuning.json"), br#"{"extent": 8.0}"#).unwrap();

        let config = LoaderConfig {
            asset_root: root.to_string_lossy().into_owned(),
        };
        let mut loader = FileLoader::from_config(&config);
        assert!(loader.load_asset("tuning.json").is_ok());
    }

    #[test]
    fn test_engine_delegates_to_loader() {
        use orrery_core::{Engine, EngineConfig, Registry};

        let mut memory = MemoryLoader::new();
        memory.insert("tuning.json", Asset::Json(json!({"extent": 8.0})));

        let mut engine = Engine::new(Registry::new(), EngineConfig::default());
        engine.set_loader(Box::new(memory));

        engine.load_assets(&["tuning.json"]).unwrap();
        let asset = engine.get_asset("tuning.json").unwrap();
        assert_eq!(asset.as_json().unwrap()["extent"], 8.0);
    }

    #[test]
    fn test_batch_load() {
        let mut loader = MemoryLoader::new();
        loader
            .insert("a.txt", Asset::Text("a".to_string()))
            .insert("b.txt", Asset::Text("b".to_string()));

        loader.load_assets(&["a.txt", "b.txt"]).unwrap();
        assert!(loader.load_assets(&["a.txt", "missing"]).is_err());
    }
}
