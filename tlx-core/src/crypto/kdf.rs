/// Expand `base` into the keystream for one bundle.
///
/// `record_key` is taken as 8 little-endian two's-complement bytes and every
/// base byte is XORed against each of them, giving `base.len() * 8` bytes laid
/// out as `out[i * 8 + j] = base[i] ^ record[j]`.
pub fn derive_bundle_key(base: &[u8], record_key: i64) -> Vec<u8> {
    let record = record_key.to_le_bytes();
    let mut out = Vec::with_capacity(base.len() * record.len());
    for b in base {
        out.extend(record.iter().map(|k| b ^ k));
    }
    out
}
