// src/extract/cards.rs
//! Listing-card extraction for the storefront's cart pages.
//!
//! The page layout has changed before, so card discovery walks an ordered
//! list of selectors and keeps the first one that matches anything. When
//! nothing matches, the raw page is optionally dumped for inspection.

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{Extractor, Source};
use crate::error::ExtractError;
use crate::model::{ListingRecord, Tier};

pub const DEFAULT_CARD_SELECTORS: &[&str] = &[
    "div.card.cartitem",
    "div.product-item",
    "div.product-card",
    "div.col-lg-4.col-md-6",
    "div.item",
];

/// Substrings that mark a config line as a tier requirement. First match wins.
const TIER_MARKERS: &[(&str, u8)] = &[
    ("成员", 1),
    ("白银会员", 2),
    ("黄金会员", 3),
    ("钻石会员", 4),
    ("星曜会员", 5),
];

#[derive(Debug, Clone)]
pub struct CardExtractor {
    selectors: Vec<String>,
    capture_dir: Option<PathBuf>,
}

impl Default for CardExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CARD_SELECTORS.iter().map(|s| s.to_string()).collect())
    }
}

impl CardExtractor {
    pub fn new(selectors: Vec<String>) -> Self {
        Self {
            selectors,
            capture_dir: None,
        }
    }

    /// Dump pages without any recognisable cards into `dir/debug_<region>.html`.
    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = Some(dir.into());
        self
    }

    fn capture(&self, raw: &str, region: &str) {
        let Some(dir) = &self.capture_dir else {
            return;
        };
        let safe: String = region
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | ':' | '.') { '_' } else { c })
            .collect();
        let path = dir.join(format!("debug_{safe}.html"));
        let res = std::fs::create_dir_all(dir).and_then(|_| std::fs::write(&path, raw));
        match res {
            Ok(()) => tracing::error!(region, path = %path.display(), "saved unparsed page for inspection"),
            Err(e) => tracing::warn!(region, "could not save unparsed page: {e:#}"),
        }
    }
}

impl Extractor for CardExtractor {
    fn extract(&self, raw: &str, source: &Source) -> Result<Vec<ListingRecord>, ExtractError> {
        let doc = Html::parse_document(raw);
        let region = source.region.as_str();

        let mut cards: Vec<ElementRef> = Vec::new();
        for s in &self.selectors {
            let Ok(sel) = Selector::parse(s) else {
                tracing::warn!(region, selector = %s, "invalid card selector, skipping");
                continue;
            };
            cards = doc.select(&sel).collect();
            if !cards.is_empty() {
                tracing::info!(region, selector = %s, "matched listing cards");
                break;
            }
        }

        let records: Vec<ListingRecord> = cards
            .into_iter()
            .filter_map(|card| parse_card(card, source))
            .collect();

        if records.is_empty() {
            tracing::error!(region, "no known listing cards on page");
            self.capture(raw, region);
            return Err(ExtractError::NoListings {
                region: region.to_string(),
            });
        }
        Ok(records)
    }
}

fn first<'a>(el: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let s = Selector::parse(css).ok()?;
    el.select(&s).next()
}

fn all<'a>(el: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|s| el.select(&s).collect())
        .unwrap_or_default()
}

fn parse_card(card: ElementRef, source: &Source) -> Option<ListingRecord> {
    let name: String = first(card, "h4")?.text().map(str::trim).collect();
    if name.is_empty() {
        return None;
    }

    let mut tier = Tier::NONE;
    let mut config = Vec::new();
    for li in all(card, "ul.vps-config li") {
        let line = joined_text(li);
        match tier_marker(&line) {
            Some(level) => tier = Tier::from(level),
            None => config.push(line),
        }
    }

    // No stock line at all means nothing to buy.
    let stock_count =
        first(card, "p.card-text").map_or(Some(0), |p| parse_stock(&joined_text(p)));

    let price = first(card, "a.cart-num")
        .map(joined_text)
        .filter(|s| !s.is_empty());

    let external_id = first(card, "div.card-footer a")
        .and_then(|a| a.value().attr("href"))
        .filter(|href| href.contains("pid="))
        .and_then(|href| href.rsplit("pid=").next())
        .map(str::to_string);

    Some(ListingRecord {
        name,
        description_text: config.join("\n"),
        stock_count,
        price,
        tier,
        detail_url: source.endpoint.clone(),
        external_id,
        region_id: source.region.clone(),
    })
}

/// Text nodes trimmed and joined by single spaces.
fn joined_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn tier_marker(line: &str) -> Option<u8> {
    TIER_MARKERS
        .iter()
        .find(|(marker, _)| line.contains(marker))
        .map(|(_, level)| *level)
}

/// `库存：12` -> 12. Text without a count (`库存：缺货`) is 0; a negative
/// count is the storefront's own "unknown" and stays unknown.
pub fn parse_stock(text: &str) -> Option<u32> {
    static RE_STOCK: OnceCell<Regex> = OnceCell::new();
    let re = RE_STOCK.get_or_init(|| Regex::new(r"库存\s*[：:]\s*(-?\d+)").unwrap());
    let raw = re
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text.trim(), |m| m.as_str());
    match raw.parse::<i64>() {
        Ok(n) => u32::try_from(n).ok(),
        Err(_) => Some(0),
    }
}
