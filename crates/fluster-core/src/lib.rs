//! Core types and traits for the Fluster URL shortener.
//!
//! This crate holds the pieces shared by the storage backends, the shortening
//! pipeline and the gateway: the key/short code codec, URL validation and the
//! [`Repository`] contract.

pub mod base58;
pub mod error;
pub mod repository;
pub mod shortcode;
pub mod validate;

pub use error::{CodecError, InvalidUrlError, StorageError};
pub use repository::{Repository, UrlRecord};
pub use shortcode::ShortCode;
pub use validate::validate_url;
