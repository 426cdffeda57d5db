// tlx_core/src/repo.rs
use crate::error::Result;
use std::path::PathBuf;

/// Read access to raw bundle bytes addressed by content hash.
pub trait BundleRepo: Send + Sync {
    /// Where the bundle for `hash` lives (whether or not it exists).
    fn bundle_path(&self, hash: &str) -> PathBuf;

    fn exists(&self, hash: &str) -> bool;

    fn is_patched(&self, hash: &str) -> bool;

    fn read(&self, hash: &str) -> Result<Vec<u8>>;
}
