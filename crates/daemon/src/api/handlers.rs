/// Announce request handler

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use damnet_core::{AnnounceRequest, AnnounceResponder, Status};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub responder: Arc<AnnounceResponder>,
}

/// Wire shape of every announce reply body
#[derive(Debug, Serialize, Deserialize)]
pub struct SecretBody {
    pub secret: String,
}

/// Handler for POST /announce
pub async fn announce(
    State(state): State<AppState>,
    Json(request): Json<AnnounceRequest>,
) -> (StatusCode, Json<SecretBody>) {
    debug!(address = %request.address, "API: POST /announce");

    let response = state.responder.handle(&request).await;
    (
        status_code(response.status),
        Json(SecretBody {
            secret: response.secret,
        }),
    )
}

fn status_code(status: Status) -> StatusCode {
    match status {
        Status::Success => StatusCode::OK,
        Status::ClientError => StatusCode::BAD_REQUEST,
        Status::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes_map_to_http_codes() {
        assert_eq!(status_code(Status::Success), StatusCode::OK);
        assert_eq!(status_code(Status::ClientError), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_code(Status::ServerError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
