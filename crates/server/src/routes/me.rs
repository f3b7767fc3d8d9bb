use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use service::permission::require_authenticated;

use crate::auth::Requester;
use crate::errors::ApiError;

/// The calling user.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeBody {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_authenticated: bool,
}

#[utoipa::path(get, path = "/me/", tag = "auth",
    responses(
        (status = 200, description = "Current user", body = MeBody),
        (status = 403, description = "Not authenticated"),
    ))]
pub async fn me(requester: Requester) -> Result<Json<MeBody>, ApiError> {
    let user = require_authenticated(requester.user())?;
    Ok(Json(MeBody {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        is_authenticated: true,
    }))
}
