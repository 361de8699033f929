// src/extract/mod.rs
pub mod cards;

use crate::error::ExtractError;
use crate::model::ListingRecord;

pub use cards::CardExtractor;

/// Where a region's catalog lives.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Source {
    #[serde(rename = "name")]
    pub region: String,
    #[serde(rename = "url")]
    pub endpoint: String,
    /// Emoji shown next to the region in status reports.
    #[serde(default)]
    pub flag: Option<String>,
}

impl Source {
    pub fn new(region: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: endpoint.into(),
            flag: None,
        }
    }
}

/// Turns a fetched document into listing records for one region.
///
/// An empty result is an error: a page that parses to nothing is treated as a
/// layout change, not as "everything delisted".
pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &str, source: &Source) -> Result<Vec<ListingRecord>, ExtractError>;
}
