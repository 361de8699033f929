//! # Data model
//!
//! - [`ListingRecord`]: one catalog item seen in one region during one poll cycle.
//! - [`Tier`]: membership level a listing requires (ordered, `None` = 0).
//! - [`Snapshot`]: all records of the last successful cycle, grouped by region.
//!
//! The serde shape here *is* the on-disk format: a JSON object keyed by region,
//! each value a list of `{name, config, stock, price, member_only, url, pid, region}`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Membership level required to see/buy a listing. Level 0 is "no requirement".
///
/// Persisted as the integer level (`member_only`). Older state files that
/// stored a boolean flag read back as `true -> level 1`, `false -> none`.
/// Anything else that is not a level in `0..=255` reads back as none rather
/// than failing the whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "TierRepr", into = "u8")]
pub struct Tier(u8);

#[derive(Deserialize)]
#[serde(untagged)]
enum TierRepr {
    Number(i64),
    Flag(bool),
    Text(String),
    Other(serde::de::IgnoredAny),
}

impl From<TierRepr> for Tier {
    fn from(r: TierRepr) -> Self {
        match r {
            TierRepr::Number(n) => u8::try_from(n).map(Tier).unwrap_or(Tier::NONE),
            TierRepr::Flag(flag) => Tier(u8::from(flag)),
            TierRepr::Text(s) => s.trim().parse().map(Tier).unwrap_or(Tier::NONE),
            TierRepr::Other(_) => Tier::NONE,
        }
    }
}

impl From<u8> for Tier {
    fn from(n: u8) -> Self {
        Tier(n)
    }
}

impl From<Tier> for u8 {
    fn from(t: Tier) -> Self {
        t.0
    }
}

impl Tier {
    pub const NONE: Tier = Tier(0);

    pub const fn level(n: u8) -> Tier {
        Tier(n)
    }

    pub fn is_required(self) -> bool {
        self.0 > 0
    }

    /// Display name used in chat messages. `None` for listings without a requirement.
    pub fn label(self) -> Option<&'static str> {
        match self.0 {
            0 => None,
            1 => Some("社区成员"),
            2 => Some("白银会员"),
            3 => Some("黄金会员"),
            4 => Some("钻石会员"),
            5 => Some("星曜会员"),
            _ => Some("会员"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub name: String,
    /// Multi-line spec block, tier lines already stripped.
    #[serde(rename = "config", default)]
    pub description_text: String,
    /// `None` only when the storefront reported a negative count.
    #[serde(rename = "stock", default, with = "stock_field")]
    pub stock_count: Option<u32>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(rename = "member_only", default)]
    pub tier: Tier,
    #[serde(rename = "url", default)]
    pub detail_url: String,
    #[serde(rename = "pid", default)]
    pub external_id: Option<String>,
    #[serde(rename = "region", default)]
    pub region_id: String,
}

impl ListingRecord {
    pub fn new(region_id: impl Into<String>, name: impl Into<String>, stock: Option<u32>) -> Self {
        Self {
            name: name.into(),
            description_text: String::new(),
            stock_count: stock,
            price: None,
            tier: Tier::NONE,
            detail_url: String::new(),
            external_id: None,
            region_id: region_id.into(),
        }
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Identity used for diffing: `(region, name)`.
    pub fn key(&self) -> (&str, &str) {
        (&self.region_id, &self.name)
    }
}

/// Negative or missing counts read back as unknown; unknown writes `null`.
mod stock_field {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(n) => s.serialize_u32(*n),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        let raw: Option<i64> = Option::deserialize(d)?;
        Ok(raw.and_then(|n| u32::try_from(n).ok()))
    }
}

/// Full state of the last successful poll cycle, keyed by region in
/// first-seen order. At most one record per `(region, name)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    regions: IndexMap<String, Vec<ListingRecord>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from loose records. A repeated key keeps its first
    /// position but takes the later record's values.
    pub fn from_records<I: IntoIterator<Item = ListingRecord>>(records: I) -> Self {
        let mut snap = Self::new();
        for r in records {
            snap.insert(r);
        }
        snap
    }

    pub fn insert(&mut self, record: ListingRecord) {
        let list = self.regions.entry(record.region_id.clone()).or_default();
        match list.iter_mut().find(|r| r.name == record.name) {
            Some(slot) => *slot = record,
            None => list.push(record),
        }
    }

    /// Replaces a region's listings wholesale.
    pub fn set_region(&mut self, region: impl Into<String>, records: Vec<ListingRecord>) {
        let region = region.into();
        let mut fresh = Snapshot::from_records(records.into_iter().map(|mut r| {
            r.region_id = region.clone();
            r
        }));
        let list = fresh.regions.swap_remove(&region).unwrap_or_default();
        self.regions.insert(region, list);
    }

    pub fn get(&self, region: &str, name: &str) -> Option<&ListingRecord> {
        self.regions.get(region)?.iter().find(|r| r.name == name)
    }

    pub fn region(&self, region: &str) -> Option<&[ListingRecord]> {
        self.regions.get(region).map(Vec::as_slice)
    }

    pub fn regions(&self) -> impl Iterator<Item = (&str, &[ListingRecord])> {
        self.regions.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn records(&self) -> impl Iterator<Item = &ListingRecord> {
        self.regions.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-keys a freshly deserialized document: records missing a `region`
    /// inherit their map key, duplicates collapse, empty regions are kept.
    pub(crate) fn normalized(self) -> Self {
        let mut out = Snapshot::new();
        for (key, list) in self.regions {
            out.regions.entry(key.clone()).or_default();
            for mut r in list {
                if r.region_id.is_empty() {
                    r.region_id = key.clone();
                }
                out.insert(r);
            }
        }
        out
    }
}
