//! Stand-in for the upstream Flask service.
//!
//! Serves the exact wire contract the assertion suites are written against:
//! three JSON endpoints (`/`, `/health`, `/api/info`) with fixed bodies.
//! Integration tests mount this router in-process; the e2e harness spawns
//! the `wirecheck-stub` binary instead when no external base URL is given.

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

/// Port the service binds when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Build the application router.
pub fn router() -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/api/info", get(api_info))
}

async fn home() -> Json<Value> {
    Json(json!({
        "message": "Bienvenue sur la page d'accueil de l'application Flask",
        "version": "1.0",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "Flask App",
    }))
}

async fn api_info() -> Json<Value> {
    // The upstream app returns the raw PORT env string when set and the
    // number 8080 otherwise. Suites only assert presence, but keep the quirk
    // so responses stay byte-comparable with the original service.
    let port = match std::env::var("PORT") {
        Ok(v) => Value::String(v),
        Err(_) => Value::from(DEFAULT_PORT),
    };
    let environment =
        std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    Json(json!({
        "app_name": "Flask Application",
        "port": port,
        "environment": environment,
    }))
}
