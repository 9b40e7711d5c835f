//! Facet extraction
//!
//! Derives the distinct value sets that populate the filter controls from a
//! loaded catalog. Multi-valued fields are exploded on the tag separator
//! first. Empty values never become facets, and case is preserved: ordering
//! is plain case-sensitive lexicographic.

use std::collections::BTreeSet;

use crate::catalog::{split_tags, StrainRecord};

/// Distinct non-empty values of a single-valued field, sorted.
pub fn distinct_values<'a, F>(records: &'a [StrainRecord], field: F) -> Vec<String>
where
    F: Fn(&'a StrainRecord) -> &'a str,
{
    records
        .iter()
        .map(field)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct tags of a multi-valued field: split, flatten, dedupe, sort.
pub fn distinct_tags<'a, F>(records: &'a [StrainRecord], field: F) -> Vec<String>
where
    F: Fn(&'a StrainRecord) -> &'a str,
{
    records
        .iter()
        .flat_map(|r| split_tags(field(r)))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Every facet list the filter controls need, in one pass-friendly bundle.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Facets {
    pub names: Vec<String>,
    pub types: Vec<String>,
    pub effects: Vec<String>,
    pub flavors: Vec<String>,
    pub ailments: Vec<String>,
    pub breeders: Vec<String>,
    pub locations: Vec<String>,
}

impl Facets {
    pub fn from_records(records: &[StrainRecord]) -> Self {
        Facets {
            names: distinct_values(records, |r| &r.name),
            types: distinct_values(records, |r| &r.strain_type),
            effects: distinct_tags(records, |r| &r.effects),
            flavors: distinct_tags(records, |r| &r.flavor),
            ailments: distinct_tags(records, |r| &r.ailment),
            breeders: distinct_values(records, |r| &r.breeder),
            locations: distinct_values(records, |r| &r.location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, strain_type: &str, effects: &str, breeder: &str) -> StrainRecord {
        StrainRecord {
            name: name.to_string(),
            strain_type: strain_type.to_string(),
            thc: None,
            cbd: None,
            effects: effects.to_string(),
            flavor: String::new(),
            ailment: String::new(),
            breeder: breeder.to_string(),
            location: String::new(),
            description: String::new(),
            youtube: String::new(),
            image: String::new(),
        }
    }

    #[test]
    fn tags_are_exploded_deduped_and_sorted() {
        let records = vec![
            record("A", "Hybrid", "Relaxed, Happy", "X"),
            record("B", "Sativa", "Happy, Energetic", "Y"),
        ];

        assert_eq!(
            distinct_tags(&records, |r| &r.effects),
            vec!["Energetic", "Happy", "Relaxed"]
        );
    }

    #[test]
    fn empty_values_contribute_nothing() {
        let records = vec![
            record("A", "Hybrid", "", ""),
            record("B", "Sativa", "Uplifted", "Seedsman"),
        ];

        assert_eq!(distinct_tags(&records, |r| &r.effects), vec!["Uplifted"]);
        assert_eq!(distinct_values(&records, |r| &r.breeder), vec!["Seedsman"]);
    }

    #[test]
    fn duplicates_collapse_and_case_is_preserved() {
        let records = vec![
            record("A", "Hybrid", "happy, Happy", "X"),
            record("B", "Hybrid", "Happy", "X"),
        ];

        // Case-sensitive: "Happy" and "happy" are distinct facets, each once.
        assert_eq!(distinct_tags(&records, |r| &r.effects), vec!["Happy", "happy"]);
        assert_eq!(distinct_values(&records, |r| &r.strain_type), vec!["Hybrid"]);
    }

    #[test]
    fn facet_bundle_covers_all_controls() {
        let records = vec![record("Blue Dream", "Hybrid", "Relaxed", "DJ Short")];
        let facets = Facets::from_records(&records);

        assert_eq!(facets.names, vec!["Blue Dream"]);
        assert_eq!(facets.types, vec!["Hybrid"]);
        assert_eq!(facets.effects, vec!["Relaxed"]);
        assert_eq!(facets.breeders, vec!["DJ Short"]);
        assert!(facets.flavors.is_empty());
        assert!(facets.locations.is_empty());
    }
}
