use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::chat::ChatError;

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChatError::Network(why) if why.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        };

        (status, self.to_string()).into_response()
    }
}
