//! Webimage - a two-tier cache for decoded web images.
//!
//! Images are looked up by URL in a bounded in-memory LRU, then in a flat
//! on-disk PNG store, and only fetched over HTTP on a full miss. Disk writes
//! are handed to a single background writer so callers never wait on them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing use cases.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "webimage";
