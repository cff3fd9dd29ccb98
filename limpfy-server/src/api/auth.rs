//! Request identity
//!
//! Authentication happens upstream; the gateway forwards the verified user
//! in `x-actor-id` and `x-actor-role`. Only clients and workers can be
//! named here, the system role is reserved for the settlement sweep.

use axum::{extract::FromRequestParts, http::request::Parts};
use limpfy_core::domain::actor::{Actor, Role};

use super::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The actor issuing the current request
#[derive(Debug, Clone)]
pub struct Authenticated(pub Actor);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {ACTOR_ID_HEADER} header")))?;

        let role = header(ACTOR_ROLE_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {ACTOR_ROLE_HEADER} header")))?
            .parse::<Role>()
            .map_err(ApiError::Unauthorized)?;

        let actor = Actor {
            id: id.to_string(),
            role,
        };
        if actor.is_system() {
            return Err(ApiError::Unauthorized(
                "the system role cannot be used over HTTP".to_string(),
            ));
        }

        Ok(Authenticated(actor))
    }
}
