use axum::extract::{Json, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};

use common::auth::{HandshakeError, UserRegistry};
use common::identity::Identity;

use crate::http_server::api::client::ApiRequest;
use crate::http_server::api::v0::auth::{authenticated_user, error_response};
use crate::ServiceState;

/// Fetch a registered user's public identity
#[derive(Debug, Clone)]
pub struct UserRequest {
    pub access_token: String,
    pub user_id: String,
}

#[tracing::instrument(skip_all)]
pub async fn handler(
    State(state): State<ServiceState>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Identity>, UserError> {
    let requester = authenticated_user(&state, &headers)?;
    let identity = state
        .verifier()
        .registry()
        .lookup(&user_id)?
        .ok_or(HandshakeError::UnknownUser(user_id))?;
    tracing::debug!(requester = %requester, user_id = %identity.user_id, "served identity");
    Ok(Json(identity))
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        match self {
            UserError::Handshake(e) => error_response("users", e),
        }
    }
}

impl ApiRequest for UserRequest {
    type Response = Identity;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join(&format!("/api/v0/users/{}", self.user_id))?;
        Ok(client.get(full_url).bearer_auth(self.access_token))
    }
}
