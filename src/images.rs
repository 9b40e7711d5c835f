//! Best-effort strain image resolution
//!
//! Catalog rows usually carry an image URL; when they don't, an online image
//! search fills the gap. Lookups are memoized per strain name in a grow-only
//! cache, and every failure mode degrades to "no image found" — absence of
//! an image is an expected outcome, handled by the presentation layer's
//! placeholder.

use std::sync::RwLock;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::catalog::StrainRecord;

/// Appended to the strain name so short, generic names search well.
const QUERY_QUALIFIER: &str = " cannabis strain";

/// External image search. The contract is deliberately small so the
/// production client can be swapped for a stub in tests.
pub trait ImageLookup: Send + Sync {
    /// First candidate image URL for a free-text query, if any.
    fn first_image(&self, query: &str) -> anyhow::Result<Option<String>>;
}

/// Memoizing resolver in front of an [`ImageLookup`].
pub struct ImageResolver {
    lookup: Box<dyn ImageLookup>,
    cache: RwLock<FxHashMap<String, Option<String>>>,
}

impl ImageResolver {
    pub fn new(lookup: Box<dyn ImageLookup>) -> Self {
        ImageResolver {
            lookup,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Resolve an image URL for the record.
    ///
    /// A catalog URL is returned unchanged; anything else goes through the
    /// memoized external lookup keyed by strain name. Racing first lookups
    /// for the same name are last-writer-wins: results for the same key are
    /// equivalent.
    pub fn resolve(&self, record: &StrainRecord) -> Option<String> {
        if record.image.starts_with("http") {
            return Some(record.image.clone());
        }

        if let Some(hit) = self
            .cache
            .read()
            .expect("image cache poisoned")
            .get(&record.name)
        {
            return hit.clone();
        }

        let query = format!("{}{}", record.name, QUERY_QUALIFIER);
        let resolved = match self.lookup.first_image(&query) {
            Ok(url) => url.filter(|u| u.starts_with("http")),
            Err(e) => {
                tracing::warn!("image lookup failed for {}: {}", record.name, e);
                None
            }
        };

        self.cache
            .write()
            .expect("image cache poisoned")
            .insert(record.name.clone(), resolved.clone());

        resolved
    }
}

/// DuckDuckGo image search client.
///
/// The images endpoint requires the per-query `vqd` token embedded in the
/// regular results page, so each lookup is a two-step fetch. Timeouts are
/// bounded; a slow or failing lookup degrades to no image.
pub struct DuckDuckGoLookup {
    agent: ureq::Agent,
}

impl DuckDuckGoLookup {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(5))
            .build();
        DuckDuckGoLookup { agent }
    }
}

impl Default for DuckDuckGoLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLookup for DuckDuckGoLookup {
    fn first_image(&self, query: &str) -> anyhow::Result<Option<String>> {
        let page = self
            .agent
            .get("https://duckduckgo.com/")
            .query("q", query)
            .call()?
            .into_string()?;

        let vqd = match extract_vqd(&page) {
            Some(vqd) => vqd,
            None => return Ok(None),
        };

        let body: serde_json::Value = self
            .agent
            .get("https://duckduckgo.com/i.js")
            .query("l", "us-en")
            .query("o", "json")
            .query("q", query)
            .query("vqd", &vqd)
            .call()?
            .into_json()?;

        let first = body["results"].as_array().and_then(|results| {
            results.iter().find_map(|r| {
                r["image"]
                    .as_str()
                    .filter(|url| url.starts_with("http"))
                    .map(str::to_string)
            })
        });

        Ok(first)
    }
}

/// Pull the `vqd` token out of the results page. The page embeds it as
/// `vqd="..."`, `vqd='...'` or `vqd=...&`.
fn extract_vqd(page: &str) -> Option<String> {
    let start = page.find("vqd=")? + 4;
    let rest = page[start..].trim_start_matches(['"', '\'']);
    let token: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubLookup {
        calls: Arc<AtomicUsize>,
        result: anyhow::Result<Option<String>>,
    }

    impl StubLookup {
        fn returning(url: Option<&str>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                StubLookup {
                    calls: calls.clone(),
                    result: Ok(url.map(str::to_string)),
                },
                calls,
            )
        }

        fn failing() -> Self {
            StubLookup {
                calls: Arc::new(AtomicUsize::new(0)),
                result: Err(anyhow::anyhow!("network down")),
            }
        }
    }

    impl ImageLookup for StubLookup {
        fn first_image(&self, _query: &str) -> anyhow::Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.result {
                Ok(url) => Ok(url.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn record(name: &str, image: &str) -> StrainRecord {
        StrainRecord {
            name: name.to_string(),
            strain_type: "Hybrid".to_string(),
            thc: None,
            cbd: None,
            effects: String::new(),
            flavor: String::new(),
            ailment: String::new(),
            breeder: String::new(),
            location: String::new(),
            description: String::new(),
            youtube: String::new(),
            image: image.to_string(),
        }
    }

    #[test]
    fn catalog_url_passes_through_without_lookup() {
        let (stub, calls) = StubLookup::returning(Some("http://found/img.jpg"));
        let resolver = ImageResolver::new(Box::new(stub));

        let url = resolver.resolve(&record("Blue Dream", "https://catalog/bd.jpg"));
        assert_eq!(url.as_deref(), Some("https://catalog/bd.jpg"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_image_triggers_memoized_lookup() {
        let (stub, calls) = StubLookup::returning(Some("http://found/img.jpg"));
        let resolver = ImageResolver::new(Box::new(stub));
        let rec = record("Blue Dream", "");

        assert_eq!(resolver.resolve(&rec).as_deref(), Some("http://found/img.jpg"));
        assert_eq!(resolver.resolve(&rec).as_deref(), Some("http://found/img.jpg"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_result_set_is_memoized_as_no_image() {
        let (stub, calls) = StubLookup::returning(None);
        let resolver = ImageResolver::new(Box::new(stub));
        let rec = record("Obscure Cut", "");

        assert_eq!(resolver.resolve(&rec), None);
        assert_eq!(resolver.resolve(&rec), None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lookup_failure_degrades_to_no_image() {
        let resolver = ImageResolver::new(Box::new(StubLookup::failing()));
        assert_eq!(resolver.resolve(&record("Blue Dream", "")), None);
    }

    #[test]
    fn non_http_candidates_are_rejected() {
        let (stub, _) = StubLookup::returning(Some("data:image/png;base64,xyz"));
        let resolver = ImageResolver::new(Box::new(stub));
        assert_eq!(resolver.resolve(&record("Blue Dream", "")), None);
    }

    #[test]
    fn vqd_token_extraction_handles_page_variants() {
        assert_eq!(
            extract_vqd(r#"...vqd="4-1234abcd"&..."#).as_deref(),
            Some("4-1234abcd")
        );
        assert_eq!(
            extract_vqd("...&vqd=4-987_xyz&kl=us-en...").as_deref(),
            Some("4-987_xyz")
        );
        assert_eq!(extract_vqd("no token here"), None);
    }
}
