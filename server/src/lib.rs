use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use spimi_core::persist::{load_all, IndexPaths};
use spimi_core::{Analyzer, DocId, InvertedIndex, QueryEvaluator};
use std::collections::HashMap;
use std::path::Path as StdPath;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Cap on returned hits; `total_hits` always counts every match.
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub terms: Vec<String>,
    pub absent_terms: Vec<String>,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub external_id: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub strategy: String,
    pub num_docs: u32,
    pub num_terms: usize,
    pub num_postings: usize,
    pub stages: Vec<String>,
}

/// Loaded once at startup and never mutated, so handlers share it without locking.
pub struct LoadedIndex {
    pub index: InvertedIndex,
    pub analyzer: Analyzer,
    pub external_ids: HashMap<DocId, String>,
    pub strategy: String,
}

#[derive(Clone)]
pub struct AppState {
    pub loaded: Arc<LoadedIndex>,
}

impl LoadedIndex {
    pub fn stage_names(&self) -> Vec<String> {
        self.analyzer.pipeline().stages().iter().map(|s| s.name().to_string()).collect()
    }
}

/// Index, id map and the analyzer rebuilt from the config the index was built with.
pub fn load_index(index_dir: impl AsRef<StdPath>) -> Result<LoadedIndex> {
    let paths = IndexPaths::new(index_dir);
    let (index, meta, doc_id_map) = load_all(&paths)?;
    let analyzer = Analyzer::from_config(&meta.config.tokenizer, &meta.config.pipeline)?;
    let external_ids = doc_id_map.into_iter().map(|(ext, id)| (id, ext)).collect();
    Ok(LoadedIndex { index, analyzer, external_ids, strategy: meta.strategy })
}

pub fn build_app(index_dir: String) -> Result<Router> {
    Ok(router(Arc::new(load_index(&index_dir)?)))
}

pub fn router(loaded: Arc<LoadedIndex>) -> Router {
    let app_state = AppState { loaded };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    app
}

/// Whitespace-separated terms are ANDed; a single term is a plain lookup.
pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let loaded = &state.loaded;
    let raw_terms: Vec<&str> = params.q.split_whitespace().collect();
    let result = QueryEvaluator::new(&loaded.index, &loaded.analyzer).and(&raw_terms);

    let total_hits = result.count();
    let k = params.k.unwrap_or(total_hits);
    let results = result
        .doc_ids
        .iter()
        .take(k)
        .map(|&doc_id| SearchHit { doc_id, external_id: loaded.external_ids.get(&doc_id).cloned() })
        .collect();

    let elapsed = start.elapsed();
    Json(SearchResponse {
        query: params.q,
        terms: result.terms,
        absent_terms: result.absent_terms,
        took_s: elapsed.as_secs_f64(),
        total_hits,
        results,
    })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let loaded = &state.loaded;
    Json(StatsResponse {
        strategy: loaded.strategy.clone(),
        num_docs: loaded.index.num_docs(),
        num_terms: loaded.index.num_terms(),
        num_postings: loaded.index.num_postings(),
        stages: loaded.stage_names(),
    })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<u32>) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match state.loaded.external_ids.get(&doc_id) {
        Some(ext) => Ok(Json(serde_json::json!({ "doc_id": doc_id, "external_id": ext }))),
        None => Err((StatusCode::NOT_FOUND, format!("document {doc_id} not found"))),
    }
}
