use crate::error::EncodingError;

/// Strip an optional `0x` prefix and decode the remaining hex digits
pub fn decode_hex(s: &str) -> Result<Vec<u8>, EncodingError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    Ok(hex::decode(digits)?)
}

/// Hex-encode with a `0x` prefix, the form every backend expects on the wire
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a decimal amount into the 128-bit range carried by envelopes
pub fn parse_amount(s: &str) -> Result<u128, EncodingError> {
    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        return Err(EncodingError::InvalidAmount(format!("negative amount {}", trimmed)));
    }
    trimmed
        .parse::<u128>()
        .map_err(|e| EncodingError::InvalidAmount(format!("{}: {}", trimmed, e)))
}
