use std::path::PathBuf;

use axum::{
    Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::chat::SharedEngine;

mod assets;
mod chat;
mod error;

#[derive(Clone)]
pub struct AppState {
    pub engine: SharedEngine,
    pub index_path: Option<PathBuf>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(assets::index))
        .route("/index.html", get(assets::index))
        .route("/health", get(health))
        .route("/chat", get(chat::chat))
        .fallback(not_found)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found(uri: Uri) -> StatusCode {
    log::warn!("{uri} is 404!");
    StatusCode::NOT_FOUND
}
