use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::auth::{ChallengeRequest, ChallengeResponse, HandshakeError};

use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<ChallengeRequest>,
) -> Result<Json<ChallengeResponse>, ChallengeError> {
    let challenge = state.verifier().request_challenge(&req.user_id)?;
    Ok(Json(ChallengeResponse { challenge }))
}

#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

impl IntoResponse for ChallengeError {
    fn into_response(self) -> Response {
        match self {
            ChallengeError::Handshake(e) => super::error_response("challenge", e),
        }
    }
}

impl ApiRequest for ChallengeRequest {
    type Response = ChallengeResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/auth/challenge")?;
        Ok(client.post(full_url).json(&self))
    }
}
