// src/error.rs
//! Error taxonomy for one poll cycle. None of these are fatal to the
//! process; the poll loop logs them and moves on.

use thiserror::Error;

/// Network, timeout or non-2xx failure while fetching a catalog page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{0}")]
    Other(String),
}

/// The fetched document did not contain anything we recognise as listings.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no listing cards found for region {region}")]
    NoListings { region: String },
}

/// Per-recipient delivery failure on the chat channel.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("chat transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat api rejected {method}: {description}")]
    Api { method: &'static str, description: String },
}

/// Snapshot could not be written to disk.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("writing snapshot to {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
