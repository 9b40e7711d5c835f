//! Catalog loading and normalization
//!
//! Reads the strain spreadsheet (CSV) with Polars and materializes typed
//! records. The snapshot is loaded once per process and shared; an explicit
//! `invalidate` forces a re-read on the next access.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use polars::prelude::*;
use rustc_hash::FxHashMap;

/// Separator used by the multi-valued spreadsheet columns
/// (`effects`, `flavor`, `ailment`).
pub const TAG_SEPARATOR: &str = ", ";

/// One row of the strain catalog, fully normalized.
///
/// Every optional column is present after load: text fields default to the
/// empty string (`strain_type` to `"Unknown"`); only the potency fields stay
/// `None` when the source value is absent or unparsable, which means
/// "unknown potency", distinct from zero.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StrainRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub strain_type: String,
    pub thc: Option<f64>,
    pub cbd: Option<f64>,
    pub effects: String,
    pub flavor: String,
    pub ailment: String,
    pub breeder: String,
    pub location: String,
    pub description: String,
    pub youtube: String,
    pub image: String,
}

impl StrainRecord {
    /// Non-empty effect tags of this record.
    pub fn effect_tags(&self) -> impl Iterator<Item = &str> + '_ {
        split_tags(&self.effects)
    }
}

/// Split a `", "`-separated tag field, dropping empty tags.
pub fn split_tags(raw: &str) -> impl Iterator<Item = &str> + '_ {
    raw.split(TAG_SEPARATOR).filter(|t| !t.is_empty())
}

/// The spreadsheet could not be read at all.
///
/// Callers degrade to an empty catalog and surface a "no data" state; this
/// condition never crashes the pipeline.
#[derive(Debug, thiserror::Error)]
#[error("strain catalog unavailable: {reason}")]
pub struct DataUnavailable {
    pub reason: String,
}

/// Immutable catalog snapshot with a by-name index for O(1) lookups.
#[derive(Debug)]
pub struct Catalog {
    records: Vec<StrainRecord>,
    by_name: FxHashMap<String, usize>,
}

impl Catalog {
    fn new(records: Vec<StrainRecord>) -> Self {
        let mut by_name = FxHashMap::default();
        for (idx, record) in records.iter().enumerate() {
            by_name.insert(record.name.clone(), idx);
        }
        Catalog { records, by_name }
    }

    /// The degraded snapshot used when the source is unreadable.
    pub fn empty() -> Self {
        Catalog::new(Vec::new())
    }

    pub fn records(&self) -> &[StrainRecord] {
        &self.records
    }

    /// Look up a record by its name (the identity key).
    pub fn get(&self, name: &str) -> Option<&StrainRecord> {
        self.by_name.get(name).map(|&idx| &self.records[idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Memoizing loader for the catalog source.
///
/// First access reads the file and publishes the snapshot; later accesses
/// return the published `Arc` without touching the source again. Concurrent
/// first loads may both read the file, but they publish equivalent snapshots
/// and converge on one cached value.
pub struct CatalogStore {
    path: PathBuf,
    snapshot: RwLock<Option<Arc<Catalog>>>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CatalogStore {
            path: path.into(),
            snapshot: RwLock::new(None),
        }
    }

    /// Return the catalog snapshot, reading the source on first use.
    pub fn load(&self) -> Result<Arc<Catalog>, DataUnavailable> {
        if let Some(snapshot) = self.snapshot.read().expect("catalog lock poisoned").as_ref() {
            return Ok(snapshot.clone());
        }

        let catalog = Arc::new(read_catalog(&self.path)?);
        tracing::info!("loaded {} strains from {}", catalog.len(), self.path.display());

        *self.snapshot.write().expect("catalog lock poisoned") = Some(catalog.clone());
        Ok(catalog)
    }

    /// Drop the cached snapshot; the next `load` re-reads the source.
    pub fn invalidate(&self) {
        *self.snapshot.write().expect("catalog lock poisoned") = None;
    }
}

fn read_catalog(path: &Path) -> Result<Catalog, DataUnavailable> {
    // Every column is read as text; numeric coercion happens below so a bad
    // cell becomes a null potency instead of a load error.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.into()))
        .map_err(|e| DataUnavailable { reason: e.to_string() })?
        .finish()
        .map_err(|e| DataUnavailable { reason: e.to_string() })?;

    Ok(Catalog::new(materialize(&df)))
}

fn materialize(df: &DataFrame) -> Vec<StrainRecord> {
    let n = df.height();

    let name = text_column(df, "name", "");
    let strain_type = text_column(df, "type", "Unknown");
    let thc = numeric_column(df, "thc");
    let cbd = numeric_column(df, "cbd");
    let effects = text_column(df, "effects", "");
    let flavor = text_column(df, "flavor", "");
    let ailment = text_column(df, "ailment", "");
    let breeder = text_column(df, "breeder", "");
    let location = text_column(df, "location", "");
    let description = text_column(df, "description", "");
    let youtube = text_column(df, "youtube", "");
    let image = text_column(df, "image", "");

    (0..n)
        .map(|i| StrainRecord {
            name: name[i].clone(),
            strain_type: strain_type[i].clone(),
            thc: thc[i],
            cbd: cbd[i],
            effects: effects[i].clone(),
            flavor: flavor[i].clone(),
            ailment: ailment[i].clone(),
            breeder: breeder[i].clone(),
            location: location[i].clone(),
            description: description[i].clone(),
            youtube: youtube[i].clone(),
            image: image[i].clone(),
        })
        .collect()
}

/// Extract a text column, synthesizing `missing` for absent columns and
/// absent/empty cells.
fn text_column(df: &DataFrame, name: &str, missing: &str) -> Vec<String> {
    let n = df.height();
    let col = match df.column(name).ok().and_then(|c| c.str().ok().cloned()) {
        Some(col) => col,
        None => return vec![missing.to_string(); n],
    };

    (0..n)
        .map(|i| match col.get(i) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => missing.to_string(),
        })
        .collect()
}

/// Extract a numeric column. Unparsable cells and absent columns become
/// null, never an error.
fn numeric_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    let n = df.height();
    let col = match df.column(name) {
        Ok(col) => col,
        Err(_) => return vec![None; n],
    };

    if let Ok(f) = col.f64() {
        return (0..n).map(|i| f.get(i)).collect();
    }
    if let Ok(ints) = col.i64() {
        if let Ok(cast) = ints.cast(&DataType::Float64) {
            if let Ok(f) = cast.f64() {
                return (0..n).map(|i| f.get(i)).collect();
            }
        }
    }
    if let Ok(s) = col.str() {
        return (0..n)
            .map(|i| s.get(i).and_then(|v| v.trim().parse::<f64>().ok()))
            .collect();
    }

    vec![None; n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    #[test]
    fn loads_and_normalizes_rows() {
        let file = write_csv(
            "name,type,thc,cbd,effects,image\n\
             Blue Dream,Hybrid,18,0.5,\"Relaxed, Happy\",http://img/bd.jpg\n\
             Sour Diesel,Sativa,22,,Energetic,\n",
        );

        let store = CatalogStore::new(file.path());
        let catalog = store.load().expect("load");
        assert_eq!(catalog.len(), 2);

        let bd = catalog.get("Blue Dream").expect("Blue Dream");
        assert_eq!(bd.strain_type, "Hybrid");
        assert_eq!(bd.thc, Some(18.0));
        assert_eq!(bd.cbd, Some(0.5));
        assert_eq!(bd.effect_tags().collect::<Vec<_>>(), vec!["Relaxed", "Happy"]);

        let sd = catalog.get("Sour Diesel").expect("Sour Diesel");
        assert_eq!(sd.cbd, None);
        assert_eq!(sd.image, "");
    }

    #[test]
    fn missing_optional_columns_are_synthesized() {
        let file = write_csv("name,type,thc,cbd,effects,image\nOG Kush,Indica,20,1,Sleepy,\n");

        let catalog = CatalogStore::new(file.path()).load().expect("load");
        let record = catalog.get("OG Kush").expect("OG Kush");
        assert_eq!(record.flavor, "");
        assert_eq!(record.ailment, "");
        assert_eq!(record.breeder, "");
        assert_eq!(record.location, "");
        assert_eq!(record.description, "");
        assert_eq!(record.youtube, "");
    }

    #[test]
    fn type_defaults_to_unknown_and_bad_potency_becomes_null() {
        let file = write_csv(
            "name,type,thc,cbd,effects,image\n\
             Mystery,,n/a,??,,\n",
        );

        let catalog = CatalogStore::new(file.path()).load().expect("load");
        let record = catalog.get("Mystery").expect("Mystery");
        assert_eq!(record.strain_type, "Unknown");
        assert_eq!(record.thc, None);
        assert_eq!(record.cbd, None);
        assert_eq!(record.effects, "");
    }

    #[test]
    fn load_is_memoized_until_invalidated() {
        let file = write_csv("name,type,thc,cbd,effects,image\nA,Hybrid,10,1,Happy,\n");

        let store = CatalogStore::new(file.path());
        let first = store.load().expect("load");
        let second = store.load().expect("load");
        assert!(Arc::ptr_eq(&first, &second));

        store.invalidate();
        let third = store.load().expect("load");
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn unreadable_source_signals_data_unavailable() {
        let store = CatalogStore::new("/nonexistent/strains.csv");
        let err = store.load().expect_err("should be unavailable");
        assert!(err.to_string().contains("unavailable"));
    }
}
