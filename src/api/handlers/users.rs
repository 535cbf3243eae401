use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::{current_user, CurrentUser}, state::AppState},
    domain::{Announcement, Page, WithPermissions},
    error::Result,
    search::Pagination,
};

type AnnouncementPage = Json<Page<WithPermissions<Announcement>>>;

/// Announcements organized by the caller.
pub async fn my_organized_announcements(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Extension(current): Extension<CurrentUser>,
) -> Result<AnnouncementPage> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let ctx = &state.service_context;

    let (announcements, count) = ctx
        .announcement_service
        .organized_by(current.user.id, skip, limit)
        .await?;
    let items = ctx.permissions.batch_permissions(Some(&current.user), announcements)?;

    Ok(Json(Page { items, count }))
}

/// Announcements the caller was approved into.
pub async fn my_participated_announcements(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Extension(current): Extension<CurrentUser>,
) -> Result<AnnouncementPage> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let ctx = &state.service_context;

    let (announcements, count) = ctx
        .announcement_service
        .participating_in(current.user.id, skip, limit)
        .await?;
    let items = ctx.permissions.batch_permissions(Some(&current.user), announcements)?;

    Ok(Json(Page { items, count }))
}

pub async fn organized_announcements(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    user: Option<Extension<CurrentUser>>,
) -> Result<AnnouncementPage> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let ctx = &state.service_context;

    let (announcements, count) = ctx
        .announcement_service
        .organized_by(user_id, skip, limit)
        .await?;
    let items = ctx
        .permissions
        .batch_permissions(current_user(&user), announcements)?;

    Ok(Json(Page { items, count }))
}
