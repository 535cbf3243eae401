use std::collections::BTreeMap;

use axum::{extract::State, Extension, Json};

use crate::{
    api::{middleware::auth::{current_user, CurrentUser}, state::AppState},
    domain::PermissionMap,
};

/// Global capabilities of the caller, e.g. whether they may create games.
pub async fn permissions(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Json<BTreeMap<String, PermissionMap>> {
    Json(
        state
            .service_context
            .permissions
            .global_permissions(current_user(&user)),
    )
}
