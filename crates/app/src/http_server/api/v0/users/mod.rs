//! Directory of registered users
//!
//! | route              | header                  | success           |
//! |--------------------|-------------------------|-------------------|
//! | `GET /:user_id`    | `Authorization: Bearer` | 200 `Identity`    |

use axum::routing::get;
use axum::Router;

pub mod get;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/:user_id", get(get::handler))
        .with_state(state)
}
