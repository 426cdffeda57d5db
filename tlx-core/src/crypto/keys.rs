//! Process-wide key material. All three are fixed by the game client.

use crate::crypto::hex::{parse_hex, parse_hex_array};
use crate::error::Result;

/// Passed as the `hexkey` URI parameter on the direct index open.
pub const INDEX_DB_KEY: &str = "9c2bab97bcf8c0c4f1a9ea7881a213f6c9ebf9d8d4c6a8e43ce5a259bde7e9fd";

/// Base of the per-bundle keystream.
pub const BUNDLE_BASE_KEY: &str = "532b4631e4a7b9473e7cfb";

/// Presented to the native cipher engine when decrypting the index to plaintext.
pub const INDEX_DECRYPT_KEY: &str =
    "9C2BAB97BCF8C0C4F1A9EA7881A213F6C9EBF9D8D4C6A8E43CE5A259BDE7E9FD";

/// sqlite3mc cipher scheme id used by the index (SQLCipher-compatible).
pub const INDEX_CIPHER_SCHEME: i32 = 3;

pub fn bundle_base_key() -> Result<Vec<u8>> {
    parse_hex(BUNDLE_BASE_KEY)
}

pub fn index_decrypt_key() -> Result<[u8; 32]> {
    parse_hex_array::<32>(INDEX_DECRYPT_KEY)
}
