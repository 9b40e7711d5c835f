// Axum API server module
//
// Purpose: JSON request handlers over the catalog, filter engine, image
// resolver, and session store. The presentation layer (out of process)
// renders controls, cards, and charts from these responses.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use moka::future::Cache;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::catalog::{Catalog, CatalogStore};
use crate::facets::Facets;
use crate::filter::{apply, effect_frequency, SortBy, StrainFilters};
use crate::i18n::{tr, Lang};
use crate::images::{DuckDuckGoLookup, ImageResolver};
use crate::session::SessionRegistry;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogStore>,
    pub resolver: Arc<ImageResolver>,
    pub sessions: Arc<SessionRegistry>,
    pub cache: Cache<String, serde_json::Value>,
}

impl AppState {
    pub fn new(csv_path: impl Into<std::path::PathBuf>) -> Self {
        let catalog = Arc::new(CatalogStore::new(csv_path));

        // Warm the snapshot; a missing source is a degraded start, not a
        // failed one.
        if let Err(e) = catalog.load() {
            tracing::warn!("starting with empty catalog: {}", e);
        }

        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300))
            .build();

        AppState {
            catalog,
            resolver: Arc::new(ImageResolver::new(Box::new(DuckDuckGoLookup::new()))),
            sessions: Arc::new(SessionRegistry::new()),
            cache,
        }
    }

    /// The published snapshot, degraded to an empty catalog when the source
    /// is unreadable.
    fn catalog_or_empty(&self) -> (Arc<Catalog>, bool) {
        match self.catalog.load() {
            Ok(catalog) => (catalog, false),
            Err(e) => {
                tracing::warn!("catalog unavailable, serving empty: {}", e);
                (Arc::new(Catalog::empty()), true)
            }
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Strain endpoints
        .route("/api/strains/search", get(search_strains))
        .route("/api/strains/facets", get(get_facets))
        .route("/api/strains/:name", get(get_strain))
        .route("/api/strains/:name/image", get(get_strain_image))

        // Chart data
        .route("/api/effects/frequency", get(get_effect_frequency))

        // Session endpoints
        .route("/api/sessions/:session", get(get_session).delete(end_session))
        .route("/api/sessions/:session/favorites/:name", post(toggle_favorite))
        .route("/api/sessions/:session/notes/:name", put(save_note))

        // Explicit cache invalidation
        .route("/api/catalog/reload", post(reload_catalog))

        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request Types
// ============================================================================

/// Query-string shape of the filter controls. Multi-select controls arrive
/// comma-separated and are split here before reaching the engine.
#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SearchParams {
    name: Option<String>,
    #[serde(rename = "type")]
    strain_type: Option<String>,
    effects: Option<String>,
    flavors: Option<String>,
    ailments: Option<String>,
    breeders: Option<String>,
    locations: Option<String>,
    min_thc: Option<f64>,
    max_thc: Option<f64>,
    sort_by: Option<SortBy>,
    lang: Option<String>,
}

impl SearchParams {
    fn lang(&self) -> Lang {
        Lang::from_code(self.lang.as_deref().unwrap_or("en"))
    }

    fn to_filters(&self) -> StrainFilters {
        StrainFilters {
            name: self.name.clone(),
            strain_type: self.strain_type.clone(),
            effects: split_csv(&self.effects),
            flavors: split_csv(&self.flavors),
            ailments: split_csv(&self.ailments),
            breeders: split_csv(&self.breeders),
            locations: split_csv(&self.locations),
            min_thc: self.min_thc,
            max_thc: self.max_thc,
            sort_by: self.sort_by.unwrap_or_default(),
        }
    }

    /// Cache key covering every field that changes the response.
    fn cache_key(&self, prefix: &str) -> String {
        format!("{}:{:?}", prefix, self)
    }
}

fn split_csv(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, serde::Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

impl LangQuery {
    fn lang(&self) -> Lang {
        Lang::from_code(self.lang.as_deref().unwrap_or("en"))
    }
}

#[derive(Debug, serde::Deserialize)]
struct NoteRequest {
    text: String,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn search_strains(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cache_key = params.cache_key("search");
    if let Some(cached) = state.cache.get(&cache_key).await {
        tracing::debug!("cache hit for strain search");
        return Ok(Json(cached));
    }

    let lang = params.lang();
    let (catalog, degraded) = state.catalog_or_empty();
    let matches = apply(catalog.records(), &params.to_filters());

    let mut result = serde_json::json!({
        "rows": matches.len(),
        "data": matches,
    });
    if degraded {
        result["message"] = serde_json::json!(tr(lang, "no_data"));
    } else if matches.is_empty() {
        result["message"] = serde_json::json!(tr(lang, "no_results"));
    }

    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

async fn get_facets(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cache_key = "facets:all".to_string();
    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let (catalog, _) = state.catalog_or_empty();
    let facets = Facets::from_records(catalog.records());

    let result = serde_json::to_value(&facets)
        .map_err(|e| AppError::Internal(format!("facet serialization error: {}", e)))?;
    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

async fn get_strain(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<LangQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (catalog, _) = state.catalog_or_empty();
    let record = catalog
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("Strain {} not found", name)))?;

    let mut result = serde_json::json!({ "data": record });
    if record.description.is_empty() {
        result["message"] = serde_json::json!(tr(params.lang(), "no_desc"));
    }

    Ok(Json(result))
}

async fn get_strain_image(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<LangQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (catalog, _) = state.catalog_or_empty();
    let record = catalog
        .get(&name)
        .ok_or_else(|| AppError::NotFound(format!("Strain {} not found", name)))?
        .clone();

    // The external lookup is blocking I/O; keep it off the async workers.
    let resolver = state.resolver.clone();
    let image = tokio::task::spawn_blocking(move || resolver.resolve(&record))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?;

    let result = match image {
        Some(url) => serde_json::json!({ "image": url }),
        None => serde_json::json!({
            "image": null,
            "message": tr(params.lang(), "no_image"),
        }),
    };

    Ok(Json(result))
}

async fn get_effect_frequency(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let cache_key = params.cache_key("frequency");
    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let (catalog, _) = state.catalog_or_empty();
    let matches = apply(catalog.records(), &params.to_filters());
    let table = effect_frequency(&matches);

    let mut result = serde_json::json!({
        "rows": table.len(),
        "data": table,
    });
    if table.is_empty() {
        result["message"] = serde_json::json!(tr(params.lang(), "no_effect_data"));
    }

    state.cache.insert(cache_key, result.clone()).await;

    Ok(Json(result))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = state.sessions.snapshot(&session).unwrap_or_default();
    Ok(Json(serde_json::json!({
        "favorites": snapshot.favorites().collect::<Vec<_>>(),
        "notes": snapshot.notes(),
    })))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.end(&session);
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Path((session, name)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (favorite, favorites) = state.sessions.with_session(&session, |s| {
        let favorite = s.toggle_favorite(&name);
        let favorites: Vec<String> = s.favorites().map(str::to_string).collect();
        (favorite, favorites)
    });

    Ok(Json(serde_json::json!({
        "name": name,
        "favorite": favorite,
        "favorites": favorites,
    })))
}

async fn save_note(
    State(state): State<AppState>,
    Path((session, name)): Path<(String, String)>,
    Query(params): Query<LangQuery>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .sessions
        .with_session(&session, |s| s.set_note(&name, &payload.text));

    Ok(Json(serde_json::json!({
        "name": name,
        "message": tr(params.lang(), "note_saved"),
    })))
}

/// Explicit invalidation: drop the catalog snapshot and every response
/// derived from it.
async fn reload_catalog(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.catalog.invalidate();
    state.cache.invalidate_all();

    let (catalog, degraded) = state.catalog_or_empty();
    tracing::info!("catalog reloaded: {} strains", catalog.len());

    Ok(Json(serde_json::json!({
        "rows": catalog.len(),
        "degraded": degraded,
    })))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
