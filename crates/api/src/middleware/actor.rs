//! Acting-user extractor.
//!
//! There is no authentication: the front-end forwards the signed-in user's id
//! and role in headers and the API trusts them for visibility filtering and
//! review attribution.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use fieldmark_core::privacy::Viewer;
use fieldmark_core::roles::Role;

use crate::error::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const ENTITY_ID_HEADER: &str = "x-entity-id";

/// Id used when the request carries no `X-User-Id`.
pub const ANONYMOUS: &str = "anonymous";

/// The user a request acts for.
///
/// ```ignore
/// async fn my_handler(actor: Actor) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %actor.viewer.id, role = %actor.viewer.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Actor {
    pub viewer: Viewer,
}

impl Actor {
    pub fn id(&self) -> &str {
        &self.viewer.id
    }

    pub fn role(&self) -> Role {
        self.viewer.role
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    match parts.headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()).filter(|v| !v.is_empty()))
            .map_err(|_| AppError::BadRequest(format!("Header {name} must be visible ASCII"))),
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = header(parts, USER_ID_HEADER)?.unwrap_or(ANONYMOUS);
        let role = match header(parts, USER_ROLE_HEADER)? {
            Some(raw) => raw.parse::<Role>()?,
            None => Role::default(),
        };

        let mut viewer = Viewer::new(id, role);
        if let Some(entity_id) = header(parts, ENTITY_ID_HEADER)? {
            viewer = viewer.acting_for(entity_id);
        }

        Ok(Actor { viewer })
    }
}
