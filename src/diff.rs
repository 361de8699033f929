// src/diff.rs
//! Classifies per-listing stock transitions between two cycles and builds
//! the next snapshot.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{ListingRecord, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransitionKind {
    Listed,
    SoldOut,
    StockChanged,
}

impl TransitionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransitionKind::Listed => "listed",
            TransitionKind::SoldOut => "sold_out",
            TransitionKind::StockChanged => "stock_changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub kind: TransitionKind,
    pub record: ListingRecord,
    pub previous_stock: u32,
}

/// Ordered rule: `0 -> n` is Listed, `n -> 0` is SoldOut, any other change
/// is StockChanged. Exactly one kind or none.
pub fn classify(previous: u32, current: u32) -> Option<TransitionKind> {
    if previous == 0 && current > 0 {
        Some(TransitionKind::Listed)
    } else if previous > 0 && current == 0 {
        Some(TransitionKind::SoldOut)
    } else if previous != current {
        Some(TransitionKind::StockChanged)
    } else {
        None
    }
}

/// Default notify predicate: only listings with a tier requirement alert.
pub fn requires_tier(record: &ListingRecord) -> bool {
    record.tier.is_required()
}

/// Compare `current` against `previous`, emitting at most one event per record.
///
/// - Records rejected by `notify` are skipped (they still land in the snapshot).
/// - A record never seen before counts as previous stock 0.
/// - Unknown previous stock counts as 0; unknown current stock emits nothing.
/// - Records missing from `current` are never reported here.
pub fn diff<F>(previous: &Snapshot, current: &Snapshot, notify: F) -> Vec<TransitionEvent>
where
    F: Fn(&ListingRecord) -> bool,
{
    let known: HashMap<(&str, &str), u32> = previous
        .records()
        .filter_map(|r| Some((r.key(), r.stock_count?)))
        .collect();

    let mut events = Vec::new();
    for record in current.records() {
        if !notify(record) {
            continue;
        }
        let Some(curr) = record.stock_count else {
            continue;
        };
        let prev = known.get(&record.key()).copied().unwrap_or(0);

        if let Some(kind) = classify(prev, curr) {
            events.push(TransitionEvent {
                kind,
                record: record.clone(),
                previous_stock: prev,
            });
        }
    }
    events
}

/// Next snapshot: regions that reported this cycle are replaced by their
/// fresh listings (vanished names are dropped); every other region is
/// carried forward from `previous` untouched. A fresh listing whose count
/// could not be read keeps its last known count.
pub fn merge(previous: &Snapshot, current: &Snapshot, succeeded: &[String]) -> Snapshot {
    let ok = |region: &str| succeeded.iter().any(|s| s == region);
    let known: HashMap<(&str, &str), u32> = previous
        .records()
        .filter_map(|r| Some((r.key(), r.stock_count?)))
        .collect();
    let fresh = |list: &[ListingRecord]| -> Vec<ListingRecord> {
        list.iter()
            .map(|r| {
                let mut r = r.clone();
                if r.stock_count.is_none() {
                    let last = known.get(&r.key()).copied();
                    r.stock_count = last;
                }
                r
            })
            .collect()
    };

    let mut next = Snapshot::new();
    for (region, list) in previous.regions() {
        if ok(region) {
            let list = current.region(region).map(fresh).unwrap_or_default();
            next.set_region(region, list);
        } else {
            next.set_region(region, list.to_vec());
        }
    }
    for (region, list) in current.regions() {
        if next.region(region).is_none() && ok(region) {
            next.set_region(region, fresh(list));
        }
    }
    // Regions that succeeded but yielded nothing and were never seen before.
    for region in succeeded {
        if next.region(region).is_none() {
            next.set_region(region.clone(), Vec::new());
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Tier;

    fn rec(region: &str, name: &str, stock: u32) -> ListingRecord {
        ListingRecord::new(region, name, Some(stock)).with_tier(Tier::level(2))
    }

    fn all(_: &ListingRecord) -> bool {
        true
    }

    #[test]
    fn classify_rules() {
        assert_eq!(classify(0, 5), Some(TransitionKind::Listed));
        assert_eq!(classify(5, 0), Some(TransitionKind::SoldOut));
        assert_eq!(classify(3, 7), Some(TransitionKind::StockChanged));
        assert_eq!(classify(7, 3), Some(TransitionKind::StockChanged));
        assert_eq!(classify(4, 4), None);
        assert_eq!(classify(0, 0), None);
    }

    #[test]
    fn unchanged_stock_emits_nothing() {
        let prev = Snapshot::from_records([rec("A", "X", 4)]);
        let curr = Snapshot::from_records([rec("A", "X", 4)]);
        assert!(diff(&prev, &curr, all).is_empty());
    }

    #[test]
    fn first_appearance_counts_from_zero() {
        let ev = diff(&Snapshot::new(), &Snapshot::from_records([rec("A", "X", 2)]), all);
        assert_eq!(ev.len(), 1);
        assert_eq!(ev[0].kind, TransitionKind::Listed);
        assert_eq!(ev[0].previous_stock, 0);
    }

    #[test]
    fn predicate_filters_untiered() {
        let curr = Snapshot::from_records([ListingRecord::new("A", "X", Some(3))]);
        assert!(diff(&Snapshot::new(), &curr, requires_tier).is_empty());
    }

    #[test]
    fn unknown_current_stock_is_silent() {
        let prev = Snapshot::from_records([rec("A", "X", 3)]);
        let mut r = rec("A", "X", 0);
        r.stock_count = None;
        assert!(diff(&prev, &Snapshot::from_records([r]), all).is_empty());
    }

    #[test]
    fn unknown_previous_stock_counts_as_zero() {
        let mut p = rec("A", "X", 0);
        p.stock_count = None;
        let ev = diff(&Snapshot::from_records([p]), &Snapshot::from_records([rec("A", "X", 1)]), all);
        assert_eq!(ev[0].kind, TransitionKind::Listed);
    }

    #[test]
    fn merge_carries_failed_regions_and_drops_vanished() {
        let prev = Snapshot::from_records([rec("A", "X", 1), rec("A", "Gone", 2), rec("B", "Y", 5)]);
        let curr = Snapshot::from_records([rec("A", "X", 0)]);
        let next = merge(&prev, &curr, &["A".to_string()]);
        assert_eq!(next.get("A", "X").unwrap().stock_count, Some(0));
        assert!(next.get("A", "Gone").is_none());
        assert_eq!(next.get("B", "Y").unwrap().stock_count, Some(5));
    }

    #[test]
    fn unreadable_count_keeps_last_known_stock() {
        let prev = Snapshot::from_records([rec("A", "X", 5)]);
        let mut glitch = rec("A", "X", 0);
        glitch.stock_count = None;
        let curr = Snapshot::from_records([glitch]);

        assert!(diff(&prev, &curr, all).is_empty());
        let next = merge(&prev, &curr, &["A".to_string()]);
        assert_eq!(next.get("A", "X").unwrap().stock_count, Some(5));

        let back = Snapshot::from_records([rec("A", "X", 5)]);
        assert!(diff(&next, &back, all).is_empty());
    }

    #[test]
    fn large_regions_match_by_key() {
        let prev = Snapshot::from_records((0..2000).map(|i| rec("A", &format!("n{i}"), i % 3)));
        let curr = Snapshot::from_records((0..2000).map(|i| rec("A", &format!("n{i}"), (i + 1) % 3)));
        let ev = diff(&prev, &curr, all);
        assert_eq!(ev.len(), 2000);
        assert_eq!(ev[0].record.name, "n0");
        assert_eq!(ev[0].kind, TransitionKind::Listed);
        assert_eq!(ev[2].kind, TransitionKind::SoldOut);
        assert_eq!(ev[1].kind, TransitionKind::StockChanged);
    }

    #[test]
    fn merge_adds_new_regions() {
        let prev = Snapshot::from_records([rec("A", "X", 1)]);
        let curr = Snapshot::from_records([rec("C", "Z", 9)]);
        let next = merge(&prev, &curr, &["C".to_string()]);
        assert_eq!(next.len(), 2);
        let order: Vec<_> = next.regions().map(|(r, _)| r).collect();
        assert_eq!(order, ["A", "C"]);
    }
}
