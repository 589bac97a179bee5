//! # rustarxiv
//!
//! arXiv Paper Feed Pipeline - Rust Microservice
//!
//! ## Modules
//!
//! - [`client`] - arXiv listing API client (Atom feed queries)
//! - [`feed`] - Atom feed decoding
//! - [`paper`] - Canonical paper entity and normalization
//! - [`aggregator`] - Concurrent category fan-out, dedup and merge
//! - [`summary`] - Per-paper AI summary generation with single-flight tracking
//! - [`prefs`] - Persistent category selections and saved papers
//! - [`taxonomy`] - Category taxonomy scraping
//! - [`extract`] - PDF text extraction
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustarxiv::{aggregator::Aggregator, client::ArxivClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(ArxivClient::new()?);
//!     let aggregator = Aggregator::new(client);
//!     aggregator.load(&["cs.AI".to_string(), "cs.LG".to_string()]).await?;
//!     println!("Found {} papers", aggregator.papers().len());
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod client;
pub mod error;
pub mod extract;
pub mod feed;
pub mod paper;
pub mod prefs;
pub mod prompts;
pub mod summary;
pub mod taxonomy;

pub use error::{ExtractError, MalformedFeed, NetworkError, ProviderError, StoreError, TaxonomyError};
pub use paper::Paper;
