//! URL shortening pipeline.
//!
//! This crate wires URL validation, redirect resolution, the malicious-URL
//! check and persistence into [`ShortenerService`].

pub mod error;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod redirect;
pub mod service;
pub mod shortener;
pub mod threat;

pub use error::{CheckError, ResolutionError, ShortenerError, Stage};
pub use redirect::{HttpRedirectResolver, RedirectResolver, ResolverSettings};
pub use service::ShortenerService;
pub use shortener::Shortener;
pub use threat::{SafeBrowsingChecker, SafeBrowsingSettings, ThreatChecker};
