use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::auth::{HandshakeError, RegisterRequest, RegisterResponse};

use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, RegisterError> {
    let user_id = state.verifier().register_request(req)?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

impl IntoResponse for RegisterError {
    fn into_response(self) -> Response {
        match self {
            RegisterError::Handshake(e) => super::error_response("register", e),
        }
    }
}

impl ApiRequest for RegisterRequest {
    type Response = RegisterResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/auth/register")?;
        Ok(client.post(full_url).json(&self))
    }
}
