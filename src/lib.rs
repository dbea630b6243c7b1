//! Notegraph library - backlink graph engine for a personal notes store.
//!
//! The engine itself (`references`, `graph`, `filter`, `simulation`,
//! `interaction`) is pure and synchronous; `store` and `handlers` wrap it in
//! a sled-backed JSON API.

use std::env;
use std::path::PathBuf;

pub mod filter;
pub mod graph;
pub mod handlers;
pub mod interaction;
pub mod models;
pub mod references;
pub mod simulation;
pub mod store;

// ============================================================================
// Configuration
// ============================================================================

pub const DB_PATH: &str = ".notes_db";
pub const BIND_ADDR: &str = "127.0.0.1:3000";

/// Default canvas used when a caller does not supply its own.
pub const CANVAS_WIDTH: f64 = 800.0;
pub const CANVAS_HEIGHT: f64 = 600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: String,
    /// JSON file of notes imported at startup, if set.
    pub seed_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DB_PATH),
            bind_addr: BIND_ADDR.to_string(),
            seed_path: None,
        }
    }
}

impl Config {
    /// Defaults overridden by `NOTES_DB_PATH`, `NOTES_BIND` and `NOTES_SEED`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            db_path: set("NOTES_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            bind_addr: set("NOTES_BIND").unwrap_or(defaults.bind_addr),
            seed_path: set("NOTES_SEED").map(PathBuf::from),
        }
    }
}

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub store: store::NoteStore,
    pub config: Config,
}

impl AppState {
    pub fn new(store: store::NoteStore, config: Config) -> Self {
        Self { store, config }
    }
}

// Re-export commonly used types
pub use models::{
    DuplicateTitle, GraphEdge, GraphNode, GraphPayload, GraphStats, MostConnected, NewNote, Note,
    NoteUpdate, TagCount,
};

pub use references::{duplicate_titles, extract_references, resolve_title, suggest_links};

pub use graph::{all_tags, build_graph, compute_stats, get_backlinks, outgoing_links};

pub use filter::{project, NodeFilter};

pub use simulation::{LayoutSnapshot, NodeState, Phase, Simulation, SimulationConfig};

pub use interaction::{InteractionController, InteractionEvent, ViewTransform};

pub use store::{NoteStore, StoreError};
