use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

const ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// The longest code accepted from untrusted input. `u64::MAX` encodes to 27 characters.
pub const MAX_LENGTH: usize = 32;

/// The public identifier of a shortened URL.
///
/// Codes are produced by [`crate::base58::encode`] from a store key, or
/// parsed from request input with [`ShortCode::parse`], which only checks the
/// alphabet and length. A parsed code is not guaranteed to decode to a key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ShortCode(SmolStr);

impl ShortCode {
    pub(crate) fn from_encoded(encoded: String) -> Self {
        Self(SmolStr::new(encoded))
    }

    /// Parses a short code received from a caller.
    ///
    /// Valid codes are 1-32 characters from the base58 alphabet.
    pub fn parse(code: &str) -> Result<Self, CodecError> {
        Self::validate(code)?;
        Ok(Self(SmolStr::new(code)))
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(code: &str) -> Result<(), CodecError> {
        if code.is_empty() || code.len() > MAX_LENGTH {
            return Err(CodecError::InvalidBase58(format!(
                "length must be between 1 and {}, got {}",
                MAX_LENGTH,
                code.len()
            )));
        }

        if let Some(c) = code.chars().find(|c| !ALPHABET.contains(*c)) {
            return Err(CodecError::InvalidBase58(format!(
                "character '{}' is not in the base58 alphabet",
                c
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortCode").field(&self.0).finish()
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ShortCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
