use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};

use super::AppState;

const INDEX_HTML: &str = include_str!("../../../assets/index.html");

pub async fn index(State(state): State<AppState>) -> Response {
    let Some(path) = &state.index_path else {
        return Html(INDEX_HTML).into_response();
    };

    match tokio::fs::read(path).await {
        Ok(page) => ([(header::CONTENT_TYPE, "text/html")], page).into_response(),
        Err(why) => {
            log::error!("could not read {}: {why}", path.display());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
