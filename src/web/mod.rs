//! Web layer: router assembly and the HTTP server.
//!
//! Handlers live in [`api`] and stay thin; parsing, ordering and filtering
//! logic belongs to the `ingest`, `export` and `groups` modules, persistence
//! to `database`.

use anyhow::Result;
use axum::{
    routing::{get, patch, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    backup::BackupService, config::Config, database::Database, ingest::PlaylistFetcher,
};

pub mod api;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
    pub fetcher: PlaylistFetcher,
    pub backup: BackupService,
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: Config, database: Database) -> Result<Self> {
        let fetcher = PlaylistFetcher::new(config.import.fetch_timeout_secs);
        let backup = BackupService::new(&config);
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;

        let app = create_router(AppState {
            database,
            config,
            fetcher,
            backup,
        });

        Ok(Self { app, addr })
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Build the router with all routes and middleware. Public so integration
/// tests can drive it directly.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health_check))
        // Playlists
        .route(
            "/api/playlist",
            get(api::list_playlists).post(api::import_playlist),
        )
        .route(
            "/api/playlist/:id",
            get(api::get_playlist)
                .put(api::reimport_playlist)
                .patch(api::rename_playlist)
                .delete(api::delete_playlist),
        )
        .route("/api/playlist/:id/channel", post(api::create_channel))
        .route("/api/playlist/:id/sort", put(api::sort_channels))
        .route("/api/playlist/:id/group-order", put(api::set_group_order))
        .route(
            "/api/playlist/:id/hidden-groups",
            put(api::set_hidden_groups),
        )
        .route(
            "/api/playlist/:id/hidden-channels",
            put(api::set_hidden_channels),
        )
        .route("/api/playlist/:id/group/rename", post(api::rename_group))
        .route("/api/playlist/:id/group/delete", post(api::delete_group))
        // Channels
        .route("/api/channel/batch", patch(api::batch_channels))
        .route(
            "/api/channel/:id",
            patch(api::update_channel).delete(api::delete_channel),
        )
        // Export
        .route("/api/export/:id", get(api::export_playlist))
        // Backups
        .route(
            "/api/backup",
            get(api::list_backups).post(api::create_backup),
        )
        .route("/api/backup/:filename", axum::routing::delete(api::delete_backup))
        .route("/api/backup/:filename/restore", post(api::restore_backup))
        // Middleware (applied in reverse order)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        // Shared state
        .with_state(state)
}
