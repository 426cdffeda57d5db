use std::path::{Path, PathBuf};

use crate::bundle::decode::is_patched;
use crate::error::Result;
use crate::repo::BundleRepo;

/// Bundles sharded by the first two characters of their content hash:
/// `<root>/<hash[0..2]>/<hash>`.
pub struct FsBundleRepo {
    root: PathBuf,
}

impl FsBundleRepo {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

pub fn shard_path(root: &Path, hash: &str) -> PathBuf {
    let shard = hash.get(..2).unwrap_or(hash);
    root.join(shard).join(hash)
}

impl BundleRepo for FsBundleRepo {
    fn bundle_path(&self, hash: &str) -> PathBuf {
        shard_path(&self.root, hash)
    }

    fn exists(&self, hash: &str) -> bool {
        self.bundle_path(hash).is_file()
    }

    fn is_patched(&self, hash: &str) -> bool {
        is_patched(&self.bundle_path(hash))
    }

    fn read(&self, hash: &str) -> Result<Vec<u8>> {
        Ok(std::fs::read(self.bundle_path(hash))?)
    }
}
