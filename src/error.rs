//! Custom error types for rustarxiv.
//!
//! This module defines all error types used throughout the application.
//! Failures are split along component boundaries: feed transport and decoding
//! (`NetworkError`), summary generation (`ProviderError`), persistent stores
//! (`StoreError`), and the two auxiliary fetchers.

use thiserror::Error;

/// Structural feed decode failure.
///
/// Raised when the payload is not well-formed XML. A single entry with
/// missing fields is NOT a `MalformedFeed`; such entries are silently dropped
/// by the normalizer.
#[derive(Debug, Error)]
#[error("Malformed feed: {0}")]
pub struct MalformedFeed(pub String);

/// Transport and protocol failures from the listing service.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Per-request or total-resource timeout exceeded
    #[error("Request timed out")]
    Timeout,

    /// Non-2xx HTTP status
    #[error("HTTP status {0}")]
    BadStatus(u16),

    /// Response body is not an XML payload
    #[error("Response is not an XML feed")]
    MalformedPayload,

    /// Payload looked like XML but failed to decode
    #[error(transparent)]
    Feed(#[from] MalformedFeed),

    /// Underlying transport error
    #[error("Transport error: {0}")]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else {
            NetworkError::Transport(err)
        }
    }
}

/// Summarization provider failures.
///
/// These are local to a single paper id; a failed generation resets that id
/// to a retryable state and never propagates to the result set.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No usable API credential was configured
    #[error("Missing API credential")]
    MissingCredential,

    /// Provider returned a non-200 status or an undecodable body
    #[error("Bad response from provider: {0}")]
    BadResponse(String),
}

/// Persistent store (selections / saved papers) failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to place the store file in
    #[error("Cannot determine home directory")]
    NoHomeDir,
}

/// Category taxonomy scrape failures.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// Transport error fetching the taxonomy page
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx HTTP status
    #[error("HTTP status {0}")]
    BadStatus(u16),

    /// Page markup did not match the expected structure
    #[error("Taxonomy page did not match the expected markup")]
    ParseFailed,
}

/// PDF text extraction failures.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Transport error downloading the document
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx HTTP status for the PDF URL
    #[error("PDF download failed with HTTP status {0}")]
    DownloadFailed(u16),

    /// The downloaded bytes were not a readable PDF
    #[error("Could not extract text from PDF: {0}")]
    PdfParsing(String),
}
