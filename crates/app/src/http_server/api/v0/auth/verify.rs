use axum::body::Bytes;
use axum::extract::{Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::auth::{HandshakeError, VerifyRequest, VerifyResponse};

use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    body: Bytes,
) -> Result<Json<VerifyResponse>, VerifyError> {
    // decoded by hand so a garbled signature still spends the challenge
    let req = VerifyRequest::from_body(&body)?;
    let session = state.verifier().verify_request(&req)?;
    Ok(Json(VerifyResponse {
        access_token: session.access_token,
    }))
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        match self {
            VerifyError::Handshake(e) => super::error_response("verify", e),
        }
    }
}

impl ApiRequest for VerifyRequest {
    type Response = VerifyResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/auth/verify")?;
        Ok(client.post(full_url).json(&self))
    }
}
