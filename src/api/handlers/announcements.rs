use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::{middleware::auth::{current_user, CurrentUser}, state::AppState},
    domain::*,
    error::Result,
    search::{AnnouncementFilter, Pagination},
};

#[derive(Debug, Serialize)]
pub struct RegistrationFormReplaced {
    pub form: RegistrationForm,
    pub cancelled_requests: u64,
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<AnnouncementFilter>,
    Query(pagination): Query<Pagination>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Page<WithPermissions<Announcement>>>> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let ctx = &state.service_context;

    let (announcements, count) = ctx.announcement_service.search(&filter, skip, limit).await?;
    let items = ctx
        .permissions
        .batch_permissions(current_user(&user), announcements)?;

    Ok(Json(Page { items, count }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<WithPermissions<Announcement>>> {
    let ctx = &state.service_context;
    let announcement = ctx.announcement_service.get(id).await?;

    Ok(Json(ctx.permissions.annotate(current_user(&user), announcement)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<WithPermissions<Announcement>>)> {
    let ctx = &state.service_context;
    let announcement = ctx
        .announcement_service
        .create(Some(&current.user), request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ctx.permissions.annotate(Some(&current.user), announcement)),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> Result<Json<WithPermissions<Announcement>>> {
    let ctx = &state.service_context;
    let announcement = ctx
        .announcement_service
        .update(Some(&current.user), id, request)
        .await?;

    Ok(Json(ctx.permissions.annotate(Some(&current.user), announcement)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode> {
    state
        .service_context
        .announcement_service
        .delete(Some(&current.user), id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<AnnouncementStatusUpdate>,
) -> Result<Json<WithPermissions<Announcement>>> {
    let ctx = &state.service_context;
    let announcement = ctx
        .announcement_service
        .update_status(Some(&current.user), id, request.action)
        .await?;

    Ok(Json(ctx.permissions.annotate(Some(&current.user), announcement)))
}

pub async fn registration_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<RegistrationForm>>> {
    let form = state
        .service_context
        .announcement_service
        .registration_form(id)
        .await?;

    Ok(Json(form))
}

pub async fn replace_registration_form(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<RegistrationFormInput>,
) -> Result<Json<RegistrationFormReplaced>> {
    let (form, cancelled_requests) = state
        .service_context
        .announcement_service
        .replace_registration_form(Some(&current.user), id, input)
        .await?;

    Ok(Json(RegistrationFormReplaced {
        form,
        cancelled_requests,
    }))
}

pub async fn participants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Page<AnnouncementParticipant>>> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let (items, count) = state
        .service_context
        .announcement_service
        .participants(id, skip, limit)
        .await?;

    Ok(Json(Page { items, count }))
}

pub async fn list_registration_requests(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Page<WithPermissions<RegistrationRequest>>>> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let ctx = &state.service_context;

    let (requests, count) = ctx
        .registration_service
        .list_for_announcement(Some(&current.user), id, skip, limit)
        .await?;
    let items = ctx.permissions.batch_permissions(Some(&current.user), requests)?;

    Ok(Json(Page { items, count }))
}

pub async fn create_registration_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<WithPermissions<RegistrationRequest>>)> {
    let ctx = &state.service_context;
    let created = ctx
        .registration_service
        .create(Some(&current.user), id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ctx.permissions.annotate(Some(&current.user), created)),
    ))
}
