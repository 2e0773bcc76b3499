//! Order-preserving JSON decoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Decode a value from JSON text.
///
/// Object members are returned in document order and duplicate member
/// names are kept, so callers can apply their own duplicate rules.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON.
pub fn from_json(text: &str) -> CodecResult<Value> {
    let value = serde_json::from_str(text)?;
    Ok(value)
}

/// Decode a value from UTF-8 encoded JSON bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8 or not valid JSON.
pub fn from_json_slice(bytes: &[u8]) -> CodecResult<Value> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::decoding_failed(format!("invalid UTF-8: {e}")))?;
    from_json(text)
}
