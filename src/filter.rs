//! Filter and aggregation engine
//!
//! Applies the user's filter criteria as a conjunction of predicates over
//! the catalog, sorts the survivors by potency, and derives the
//! effect-by-type frequency table used for charting. The engine never fails
//! for well-formed input: an empty result set is a result, not an error.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;

use crate::catalog::{split_tags, StrainRecord};

/// Sentinel emitted by the name/type filter controls meaning "no constraint".
pub const ANY: &str = "Any";

/// Terminal ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    None,
    HighestThc,
    HighestCbd,
}

/// Filter criteria. Every field is an independent, commutative constraint;
/// an empty/absent field constrains nothing.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StrainFilters {
    pub name: Option<String>,
    pub strain_type: Option<String>,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub flavors: Vec<String>,
    #[serde(default)]
    pub ailments: Vec<String>,
    #[serde(default)]
    pub breeders: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    pub min_thc: Option<f64>,
    pub max_thc: Option<f64>,
    #[serde(default)]
    pub sort_by: SortBy,
}

/// Filter and sort the catalog per the criteria.
pub fn apply(records: &[StrainRecord], filters: &StrainFilters) -> Vec<StrainRecord> {
    let mut out: Vec<StrainRecord> = records
        .iter()
        .filter(|r| matches(r, filters))
        .cloned()
        .collect();

    // Vec::sort_by is stable, so potency ties keep their prior order.
    match filters.sort_by {
        SortBy::None => {}
        SortBy::HighestThc => out.sort_by(|a, b| descending(a.thc, b.thc)),
        SortBy::HighestCbd => out.sort_by(|a, b| descending(a.cbd, b.cbd)),
    }

    out
}

fn matches(record: &StrainRecord, filters: &StrainFilters) -> bool {
    if let Some(name) = filters.name.as_deref() {
        if name != ANY && record.name != name {
            return false;
        }
    }
    if let Some(strain_type) = filters.strain_type.as_deref() {
        if strain_type != ANY && record.strain_type != strain_type {
            return false;
        }
    }

    if !filters.effects.iter().all(|t| contains_ci(&record.effects, t)) {
        return false;
    }
    if !filters.flavors.iter().all(|t| contains_ci(&record.flavor, t)) {
        return false;
    }
    if !filters.ailments.iter().all(|t| contains_ci(&record.ailment, t)) {
        return false;
    }

    if !filters.breeders.is_empty() && !filters.breeders.iter().any(|b| *b == record.breeder) {
        return false;
    }
    if !filters.locations.is_empty() && !filters.locations.iter().any(|l| *l == record.location) {
        return false;
    }

    // Inclusive bounds; unscored strains rank as zero rather than dropping
    // out of every range.
    if let Some(lo) = filters.min_thc {
        if potency(record.thc) < lo {
            return false;
        }
    }
    if let Some(hi) = filters.max_thc {
        if potency(record.thc) > hi {
            return false;
        }
    }

    true
}

/// Null potency counts as zero for ranges and ordering.
fn potency(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    potency(b).partial_cmp(&potency(a)).unwrap_or(Ordering::Equal)
}

/// Substring containment over the raw tag field, case-insensitive.
/// Containment, not tag equality: "Relax" also matches "Relaxed".
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One row of the effects-by-type chart table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EffectCount {
    #[serde(rename = "type")]
    pub strain_type: String,
    pub effect: String,
    pub count: u64,
}

/// Count effect tags per strain type, ordered descending by count.
///
/// Records with no effects contribute nothing, and an empty input yields an
/// empty table ("no chartable data"). Ties are broken by type then effect so
/// the table is deterministic.
pub fn effect_frequency(records: &[StrainRecord]) -> Vec<EffectCount> {
    let mut counts: FxHashMap<(String, String), u64> = FxHashMap::default();
    for record in records {
        for tag in split_tags(&record.effects) {
            *counts
                .entry((record.strain_type.clone(), tag.to_string()))
                .or_insert(0) += 1;
        }
    }

    let mut table: Vec<EffectCount> = counts
        .into_iter()
        .map(|((strain_type, effect), count)| EffectCount {
            strain_type,
            effect,
            count,
        })
        .collect();

    table.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.strain_type.cmp(&b.strain_type))
            .then_with(|| a.effect.cmp(&b.effect))
    });

    table
}
