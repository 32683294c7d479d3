//! Reversible mapping between store-assigned keys and short codes.
//!
//! A key is rendered as its decimal digits and those ASCII bytes are encoded
//! with the Bitcoin base58 alphabet, so `42` becomes the bytes `b"42"` and
//! then `"4yP"`. Longer keys yield longer codes; there is no fixed width.

use crate::error::CodecError;
use crate::shortcode::ShortCode;

/// Encodes a store key into its short code.
///
/// Stores never hand out key `0`, and [`decode`] rejects it.
pub fn encode(key: u64) -> ShortCode {
    let digits = key.to_string();
    ShortCode::from_encoded(bs58::encode(digits.as_bytes()).into_string())
}

/// Decodes a short code back into the key it was produced from.
///
/// Only canonical encodings are accepted: the decoded bytes must be a
/// non-empty run of ASCII digits without a leading zero that fits in a `u64`.
pub fn decode(code: &str) -> Result<u64, CodecError> {
    let bytes = bs58::decode(code)
        .into_vec()
        .map_err(|e| CodecError::InvalidBase58(e.to_string()))?;

    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return Err(CodecError::NotDecimal(
            String::from_utf8_lossy(&bytes).into_owned(),
        ));
    }

    let digits: String = bytes.iter().map(|b| char::from(*b)).collect();
    if digits.starts_with('0') {
        return Err(CodecError::NonCanonical(digits));
    }

    digits
        .parse::<u64>()
        .map_err(|_| CodecError::OutOfRange(digits))
}
