//! Content-resolution pipeline for the VoirDrama catalog.
//!
//! Turns the site's unversioned WordPress markup into typed catalog,
//! series and stream records. Every fetch goes through a two-tier TTL
//! cache, extraction is regex-based and best-effort, Cinemeta artwork is
//! overlaid where it helps, and vidmoly embeds are unwrapped into
//! directly playable URLs when the embed page gives one up.

pub mod cache;
pub mod cinemeta;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod resolver;
pub mod streams;
pub mod urls;

pub use cache::TieredCache;
pub use cinemeta::{CinemetaClient, MetaSummary};
pub use error::FetchError;
pub use fetch::Fetcher;
pub use resolver::{CatalogView, DramaResolver};
pub use urls::ListingOrder;
