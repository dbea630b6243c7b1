//! HTTP route handlers.
//!
//! Every handler reads a fresh snapshot of the store and runs the graph
//! engine over it; nothing derived from notes is cached between requests.

use crate::filter::{project, NodeFilter};
use crate::graph::{all_tags, build_graph, compute_stats, get_backlinks, outgoing_links};
use crate::models::{DuplicateTitle, GraphStats, NewNote, Note, NoteUpdate};
use crate::references::duplicate_titles;
use crate::simulation::{Simulation, SimulationConfig};
use crate::store::StoreError;
use crate::{AppState, CANVAS_HEIGHT, CANVAS_WIDTH};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_RECENT_LIMIT: usize = 5;

fn store_error(e: StoreError) -> Response {
    let status = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        StoreError::Db(_) | StoreError::Serde(_) | StoreError::Io(_) => {
            log::error!("store failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string()).into_response()
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct NotesQuery {
    pub q: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LayoutQuery {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl LayoutQuery {
    fn canvas(&self) -> (f64, f64) {
        let valid = |v: Option<f64>, default: f64| match v {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => default,
        };
        (valid(self.width, CANVAS_WIDTH), valid(self.height, CANVAS_HEIGHT))
    }
}

// ============================================================================
// Note Handlers
// ============================================================================

pub async fn list_notes(
    Query(params): Query<NotesQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let q = params.q.unwrap_or_default();
    let tag = params.tag.unwrap_or_default();

    let result = match (q.is_empty(), tag.is_empty()) {
        (true, true) => state.store.all(),
        (false, true) => state.store.search(&q),
        (true, false) => state.store.by_tag(&tag),
        (false, false) => state
            .store
            .search(&q)
            .map(|notes| notes.into_iter().filter(|n| n.tags.contains(&tag)).collect()),
    };

    match result {
        Ok(notes) => Json(notes).into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn recent_notes(
    Query(params): Query<RecentQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    match state.store.recent(limit) {
        Ok(notes) => Json(notes).into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewNote>,
) -> Response {
    match state.store.create(body) {
        Ok(note) => (StatusCode::CREATED, Json(note)).into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn get_note(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.store.get(&id) {
        Ok(Some(note)) => Json(note).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Note not found").into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn update_note(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<NoteUpdate>,
) -> Response {
    match state.store.update_with_backlinks(&id, body) {
        Ok(note) => Json(note).into_response(),
        Err(e) => store_error(e),
    }
}

pub async fn delete_note(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.store.delete(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Note not found").into_response(),
        Err(e) => store_error(e),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklinksResponse {
    pub backlinks: Vec<Note>,
    pub outgoing: Vec<Note>,
}

pub async fn note_backlinks(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let notes = match state.store.all() {
        Ok(notes) => notes,
        Err(e) => return store_error(e),
    };
    if !notes.iter().any(|n| n.id == id) {
        return (StatusCode::NOT_FOUND, "Note not found").into_response();
    }

    Json(BacklinksResponse {
        backlinks: get_backlinks(&id, &notes).into_iter().cloned().collect(),
        outgoing: outgoing_links(&id, &notes).into_iter().cloned().collect(),
    })
    .into_response()
}

// ============================================================================
// Graph Handlers
// ============================================================================

pub async fn graph_api(
    Query(params): Query<NotesQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let notes = match state.store.all() {
        Ok(notes) => notes,
        Err(e) => return store_error(e),
    };
    let graph = build_graph(&notes);
    let filter = NodeFilter::new(params.q, params.tag);
    Json(project(&graph.nodes, &graph.links, &filter)).into_response()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: GraphStats,
    pub all_tags: Vec<String>,
    pub duplicate_titles: Vec<DuplicateTitle>,
}

pub async fn graph_stats(State(state): State<Arc<AppState>>) -> Response {
    let notes = match state.store.all() {
        Ok(notes) => notes,
        Err(e) => return store_error(e),
    };
    let graph = build_graph(&notes);

    let duplicates = duplicate_titles(&notes);
    for dup in &duplicates {
        log::warn!(
            "title \"{}\" is shared by {} notes; references resolve to {}",
            dup.title,
            dup.ids.len(),
            dup.ids.first().map(String::as_str).unwrap_or("")
        );
    }

    Json(StatsResponse {
        stats: compute_stats(&graph),
        all_tags: all_tags(&graph.nodes),
        duplicate_titles: duplicates,
    })
    .into_response()
}

/// Runs a fresh layout session over the filtered graph until it settles.
/// Settling is CPU-bound, so it runs on the blocking pool.
pub async fn graph_layout(
    Query(params): Query<LayoutQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let (width, height) = params.canvas();
    let filter = NodeFilter::new(params.q, params.tag);

    let result = tokio::task::spawn_blocking(move || {
        let notes = state.store.all()?;
        let graph = build_graph(&notes);
        let visible = project(&graph.nodes, &graph.links, &filter);

        let mut sim =
            Simulation::with_graph(SimulationConfig::with_canvas(width, height), &visible);
        sim.settle();
        log::debug!("layout of {} nodes settled after {} ticks", sim.len(), sim.ticks());
        Ok::<_, StoreError>(sim.snapshot())
    })
    .await;

    match result {
        Ok(Ok(snapshot)) => Json(snapshot).into_response(),
        Ok(Err(e)) => store_error(e),
        Err(e) => {
            log::error!("layout task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Layout failed").into_response()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
