use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::crypto::kdf::derive_bundle_key;
use crate::crypto::keys::bundle_base_key;
use crate::error::Result;

/// The Unity asset header is stored in the clear.
pub const HEADER_LEN: usize = 256;

/// Trailer left by tools that rewrite bundles in place.
pub const PATCH_MARK: [u8; 2] = [0x08, 0x04];

#[derive(Clone, Debug)]
pub struct BundleDecoder {
    base_key: Vec<u8>,
}

impl BundleDecoder {
    pub fn new() -> Result<Self> {
        Ok(Self::with_base_key(bundle_base_key()?))
    }

    pub fn with_base_key(base_key: Vec<u8>) -> Self {
        Self { base_key }
    }

    /// Decode a raw bundle. Zero keys and header-only buffers pass through.
    pub fn decode(&self, mut raw: Vec<u8>, record_key: i64) -> Vec<u8> {
        self.decode_in_place(&mut raw, record_key);
        raw
    }

    pub fn decode_in_place(&self, buf: &mut [u8], record_key: i64) {
        if record_key == 0 || buf.len() <= HEADER_LEN || self.base_key.is_empty() {
            return;
        }
        let key = derive_bundle_key(&self.base_key, record_key);
        for (off, b) in buf.iter_mut().enumerate().skip(HEADER_LEN) {
            *b ^= key[off % key.len()];
        }
    }
}

/// True when the last two bytes of `path` are [`PATCH_MARK`]. Unreadable or
/// short files count as unpatched.
pub fn is_patched(path: &Path) -> bool {
    fn tail(path: &Path) -> std::io::Result<[u8; 2]> {
        let mut f = File::open(path)?;
        f.seek(SeekFrom::End(-2))?;
        let mut buf = [0u8; 2];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }
    tail(path).is_ok_and(|t| t == PATCH_MARK)
}
