use reqwest::{header::HeaderMap, header::HeaderValue, Client};
use url::Url;

use common::auth::{
    ChallengeResponse, Handshake, HandshakeError, RegisterRequest, RegisterResponse,
};
use common::identity::{Credential, Identity};

use super::error::ApiError;
use super::ApiRequest;
use crate::http_server::api::v0::users::get::UserRequest;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("handshake error: {0}")]
    Handshake(#[from] HandshakeError),
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&self, request: T) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client)?;
        let response = request_builder.send().await?;

        if response.status().is_success() {
            Ok(response.json::<T::Response>().await?)
        } else {
            Err(ApiError::HttpStatus(
                response.status(),
                response.text().await?,
            ))
        }
    }

    /// Register `identity`, treating an existing registration as success.
    pub async fn ensure_registered(&self, identity: &Identity) -> Result<String, ApiError> {
        let request = RegisterRequest {
            user_id: identity.user_id.clone(),
            alias: identity.alias.clone(),
            public_key: identity.public_key,
            name: identity.name.clone(),
            email: identity.email.clone(),
        };
        match self.call(request).await {
            Ok(RegisterResponse { user_id }) => Ok(user_id),
            Err(e) if e.status() == Some(reqwest::StatusCode::CONFLICT) => {
                Ok(identity.user_id.clone())
            }
            Err(e) => Err(e),
        }
    }

    /// Run the challenge/response handshake for `credential`.
    ///
    /// Returns the finished handshake: `Verified` with an access token, or
    /// `Rejected` when the server refused the signature.
    pub async fn login(&self, credential: &Credential) -> Result<Handshake, LoginError> {
        let mut handshake = Handshake::new(credential.user_id());

        let response: ChallengeResponse = self.call(handshake.challenge_request()?).await?;
        handshake.receive_challenge(response)?;

        let verify = handshake.sign(credential)?;
        match self.call(verify).await {
            Ok(response) => handshake.accept(response)?,
            // a refused or expired challenge ends the handshake either way
            Err(e) if e.status().is_some_and(|s| s.is_client_error()) => {
                tracing::warn!(user_id = %credential.user_id(), "login rejected: {}", e);
                handshake.reject();
            }
            Err(e) => return Err(e.into()),
        }
        Ok(handshake)
    }

    /// Look up a registered user with an access token from [`ApiClient::login`].
    ///
    /// `None` when the service has no such user. The returned identity is checked
    /// against its key and against the requested id.
    pub async fn fetch_identity(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Option<Identity>, LoginError> {
        let request = UserRequest {
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
        };
        let identity = match self.call(request).await {
            Ok(identity) => identity,
            Err(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        identity.validate().map_err(HandshakeError::from)?;
        if identity.user_id != user_id {
            return Err(HandshakeError::Malformed(format!(
                "asked for {} but got {}",
                user_id, identity.user_id
            ))
            .into());
        }
        Ok(Some(identity))
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
