//! Notegraph server - JSON API over the backlink graph engine.
//!
//! - `store`: sled-backed note persistence
//! - `graph`: graph building, backlinks and stats
//! - `filter`: search/tag projection
//! - `simulation`: force-directed layout
//! - `handlers`: HTTP route handlers

use axum::{routing::get, Router};
use std::sync::Arc;

use notegraph::{handlers, AppState, Config, NoteStore};

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env();

    let store = match NoteStore::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            log::error!("failed to open {}: {}", config.db_path.display(), e);
            std::process::exit(1);
        }
    };

    if let Some(seed) = &config.seed_path {
        if let Err(e) = store.import_json(seed) {
            log::error!("seed import from {} failed: {}", seed.display(), e);
        }
    }

    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(store, config));

    let app = Router::new()
        // Note routes
        .route("/api/notes", get(handlers::list_notes).post(handlers::create_note))
        .route("/api/notes/recent", get(handlers::recent_notes))
        .route(
            "/api/notes/{id}",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/api/notes/{id}/backlinks", get(handlers::note_backlinks))
        // Graph routes
        .route("/api/graph", get(handlers::graph_api))
        .route("/api/graph/stats", get(handlers::graph_stats))
        .route("/api/graph/layout", get(handlers::graph_layout))
        .with_state(state.clone());

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("failed to bind to {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    log::info!("Notegraph server running at http://{}", bind_addr);
    log::info!(
        "Database: {} ({} notes)",
        state.config.db_path.display(),
        state.store.len()
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        log::error!("server error: {}", e);
    }

    if let Err(e) = state.store.flush() {
        log::error!("failed to flush database: {}", e);
    }
    log::info!("Notegraph server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", e);
    }
}
