//! Login handshake routes
//!
//! | route                | body / header            | success            |
//! |----------------------|--------------------------|--------------------|
//! | `POST /register`     | `RegisterRequest`        | 201 `{user_id}`    |
//! | `POST /challenge`    | `{user_id}`              | 200 `{challenge}`  |
//! | `POST /verify`       | `{user_id, signature}`   | 200 `{access_token}` |
//! | `GET /session`       | `Authorization: Bearer`  | 200 `{user_id}`    |

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use common::auth::HandshakeError;

pub mod challenge;
pub mod register;
pub mod session;
pub mod verify;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/register", post(register::handler))
        .route("/challenge", post(challenge::handler))
        .route("/verify", post(verify::handler))
        .route("/session", get(session::handler))
        .with_state(state)
}

/// Status code for a handshake failure.
fn status_for(err: &HandshakeError) -> StatusCode {
    match err {
        HandshakeError::UnknownUser(_) => StatusCode::NOT_FOUND,
        HandshakeError::UserExists(_) => StatusCode::CONFLICT,
        HandshakeError::NoChallenge(_)
        | HandshakeError::Malformed(_)
        | HandshakeError::Identity(_) => StatusCode::BAD_REQUEST,
        HandshakeError::Rejected | HandshakeError::InvalidToken => StatusCode::UNAUTHORIZED,
        HandshakeError::InvalidState(..)
        | HandshakeError::Registry(_)
        | HandshakeError::Crypto(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// User id behind the request's bearer token.
pub(crate) fn authenticated_user(
    state: &ServiceState,
    headers: &HeaderMap,
) -> Result<String, HandshakeError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(HandshakeError::InvalidToken)?;
    state.verifier().authenticate(authorization)
}

/// JSON error body shared by the auth and user routes.
pub(crate) fn error_response(route: &str, err: HandshakeError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(route, "handshake error: {}", err);
    } else {
        tracing::debug!(route, "handshake refused: {}", err);
    }
    let msg = serde_json::json!({"error": err.to_string()});
    (status, Json(msg)).into_response()
}

#[cfg(test)]
mod test {
    use axum::body::Body;
    use axum::http::{header, Request};
    use common::auth::{ChallengeResponse, SessionResponse, VerifyRequest, VerifyResponse};
    use common::crypto::SecretKey;
    use common::identity::Identity;
    use tower::ServiceExt;

    use super::*;
    use crate::http_server;
    use crate::registry::FsRegistry;
    use common::auth::Verifier;

    fn app(dir: &tempfile::TempDir) -> Router {
        let verifier = Verifier::new(FsRegistry::new(dir.path().join("users")));
        http_server::router(ServiceState::new(verifier), tracing::Level::DEBUG)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn register_body(key: &SecretKey) -> (String, serde_json::Value) {
        let identity = Identity::new("alice", key.public()).unwrap();
        let body = serde_json::to_value(&identity).unwrap();
        (identity.user_id, body)
    }

    #[tokio::test]
    async fn test_full_login_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let key = SecretKey::generate().unwrap();
        let (user_id, body) = register_body(&key);

        let response = app
            .clone()
            .oneshot(post_json("/api/v0/auth/register", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v0/auth/challenge",
                serde_json::json!({ "user_id": user_id }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let challenge: ChallengeResponse = read_json(response).await;

        let signature = key.sign(challenge.challenge.as_bytes());
        let verify = VerifyRequest::new(user_id.clone(), &signature);
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v0/auth/verify",
                serde_json::to_value(&verify).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let session: VerifyResponse = read_json(response).await;

        let request = Request::builder()
            .uri("/api/v0/auth/session")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", session.access_token),
            )
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let whoami: SessionResponse = read_json(response).await;
        assert_eq!(whoami.user_id, user_id);

        // replaying the same signature fails: the challenge is gone
        let response = app
            .oneshot(post_json(
                "/api/v0/auth/verify",
                serde_json::to_value(&verify).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let key = SecretKey::generate().unwrap();
        let (_, body) = register_body(&key);

        let first = app
            .clone()
            .oneshot(post_json("/api/v0/auth/register", body.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(post_json("/api/v0/auth/register", body))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_id() {
        let dir = tempfile::tempdir().unwrap();
        let key = SecretKey::generate().unwrap();
        let (_, mut body) = register_body(&key);
        body["user_id"] = "0".repeat(64).into();

        let response = app(&dir)
            .oneshot(post_json("/api/v0/auth/register", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_user_challenge() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(&dir)
            .oneshot(post_json(
                "/api/v0/auth/challenge",
                serde_json::json!({ "user_id": "a".repeat(64) }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_signature_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let key = SecretKey::generate().unwrap();
        let (user_id, body) = register_body(&key);
        app.clone()
            .oneshot(post_json("/api/v0/auth/register", body))
            .await
            .unwrap();
        app.clone()
            .oneshot(post_json(
                "/api/v0/auth/challenge",
                serde_json::json!({ "user_id": user_id }),
            ))
            .await
            .unwrap();

        let impostor = SecretKey::generate().unwrap();
        let verify = VerifyRequest::new(user_id, &impostor.sign(b"not the challenge"));
        let response = app
            .oneshot(post_json(
                "/api/v0/auth/verify",
                serde_json::to_value(&verify).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbled_signature_spends_challenge() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);
        let key = SecretKey::generate().unwrap();
        let (user_id, body) = register_body(&key);
        app.clone()
            .oneshot(post_json("/api/v0/auth/register", body))
            .await
            .unwrap();
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v0/auth/challenge",
                serde_json::json!({ "user_id": user_id }),
            ))
            .await
            .unwrap();
        let challenge: ChallengeResponse = read_json(response).await;

        // ten bytes of base64 is no Ed25519 signature
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v0/auth/verify",
                serde_json::json!({ "user_id": user_id, "signature": "AAAAAAAAAAAAAA==" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let verify = VerifyRequest::new(user_id.clone(), &key.sign(challenge.challenge.as_bytes()));
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/v0/auth/verify",
                serde_json::to_value(&verify).unwrap(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_json(
                "/api/v0/auth/verify",
                serde_json::json!({ "signature": "AAAA" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_session_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .uri("/api/v0/auth/session")
            .body(Body::empty())
            .unwrap();
        let response = app(&dir).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_livez_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir);

        let request = Request::builder()
            .uri("/_status/livez")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
