use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};

/// Environment variable overriding the default asset directory.
pub const ASSETS_ENV: &str = "INTENT_ASSETS";

/// Source of the bundled model, vocabulary and label files.
pub trait ResourceProvider: Send + Sync {
    /// Reads the named resource in full.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    fn exists(&self, name: &str) -> bool;
}

/// Resources stored as files in one directory.
#[derive(Debug, Clone)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Creates an AssetDir at the default location
    pub fn new_default() -> Self {
        Self::new(Self::default_dir())
    }

    /// Returns the default assets directory path
    pub fn default_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(ASSETS_ENV) {
            return PathBuf::from(path);
        }

        // 2. Use platform-specific data directory
        if let Some(data_dir) = dirs::data_dir() {
            return data_dir.join("ondevice-intent").join("assets");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".local").join("share").join("ondevice-intent").join("assets");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("ondevice-intent").join("assets")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ResourceProvider for AssetDir {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.path_of(name);
        log::debug!("Reading asset {:?}", path);
        fs::read(path)
    }

    fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }
}

/// Resources held in memory, e.g. compiled into the host binary.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.into(), bytes.into());
        self
    }
}

impl ResourceProvider for MemoryAssets {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no asset named '{}'", name)))
    }

    fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compares the hash of `bytes` against `expected`, ignoring case.
pub fn verify_sha256(bytes: &[u8], expected: &str) -> bool {
    let hash = sha256_hex(bytes);
    log::debug!("Calculated hash: {}", hash);
    log::debug!("Expected hash:   {}", expected);
    hash.eq_ignore_ascii_case(expected.trim())
}
