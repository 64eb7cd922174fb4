use axum::extract::{Json, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::auth::{HandshakeError, SessionResponse};

use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Ask the server who an access token belongs to
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub access_token: String,
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, SessionError> {
    let user_id = super::authenticated_user(&state, &headers)?;
    Ok(Json(SessionResponse { user_id }))
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        match self {
            SessionError::Handshake(e) => super::error_response("session", e),
        }
    }
}

impl ApiRequest for SessionRequest {
    type Response = SessionResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/auth/session")?;
        Ok(client.get(full_url).bearer_auth(self.access_token))
    }
}
