use crate::error::Result;

/// Decode a hex string, tolerating surrounding whitespace and a `0x` prefix.
pub fn parse_hex(hex_str: &str) -> Result<Vec<u8>> {
    let s = hex_str.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    Ok(hex::decode(s)?)
}

pub fn parse_hex_array<const N: usize>(hex_str: &str) -> Result<[u8; N]> {
    let bytes = parse_hex(hex_str)?;
    let out: [u8; N] = bytes
        .try_into()
        .map_err(|_| hex::FromHexError::InvalidStringLength)?;
    Ok(out)
}
