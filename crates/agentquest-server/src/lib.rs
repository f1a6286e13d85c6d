use axum::{
    Json, Router,
    http::HeaderValue,
    routing::{get, post},
};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
mod routes;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<ServerConfig>,
    session_key: Arc<[u8]>,
}

impl AppState {
    pub fn new(connection: Connection, config: ServerConfig) -> Self {
        let key = config.session_key();
        Self::with_session_key(connection, config, key)
    }

    pub fn with_session_key(connection: Connection, config: ServerConfig, key: Vec<u8>) -> Self {
        Self {
            db: Arc::new(Mutex::new(connection)),
            config: Arc::new(config),
            session_key: key.into(),
        }
    }

    pub fn session_key(&self) -> &[u8] {
        &self.session_key
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/auth/login", post(routes::session::login))
        .route("/api/auth/youtube", get(routes::session::youtube_start))
        .route("/api/auth/youtube/callback", get(routes::session::youtube_callback))
        .route("/api/missions", get(routes::missions::list_active).post(routes::missions::create))
        .route("/api/claims", get(routes::claims::list_own).post(routes::claims::submit))
        .route("/api/agents/leaderboard", get(routes::agents::leaderboard))
        .route(
            "/api/agents/profile",
            get(routes::agents::profile).patch(routes::agents::update_profile),
        )
        .route("/api/payouts", get(routes::payouts::summary).post(routes::payouts::request))
        .route("/api/admin/agents", get(routes::admin::list_agents))
        .route("/api/admin/audits/queue", get(routes::admin::audit_queue))
        .route("/api/admin/audits/{id}/start", post(routes::admin::start_audit))
        .route("/api/admin/audits/{id}/approve", post(routes::admin::approve_claim))
        .route("/api/admin/audits/{id}/reject", post(routes::admin::reject_claim))
        .route(
            "/api/admin/missions",
            get(routes::admin::list_missions).patch(routes::admin::update_mission),
        )
        .route("/api/admin/trust/agents", get(routes::admin::trust_agents))
        .route("/api/admin/trust/history", get(routes::admin::trust_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}
