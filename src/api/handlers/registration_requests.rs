use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Page, RegistrationRequest, RejectRegistrationRequest, WithPermissions},
    error::Result,
    search::Pagination,
};

type Annotated = Json<WithPermissions<RegistrationRequest>>;

pub async fn mine(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Page<WithPermissions<RegistrationRequest>>>> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let ctx = &state.service_context;

    let (requests, count) = ctx
        .registration_service
        .list_for_user(&current.user, skip, limit)
        .await?;
    let items = ctx.permissions.batch_permissions(Some(&current.user), requests)?;

    Ok(Json(Page { items, count }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Annotated> {
    let ctx = &state.service_context;
    let request = ctx.registration_service.get(Some(&current.user), id).await?;

    Ok(Json(ctx.permissions.annotate(Some(&current.user), request)))
}

pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Annotated> {
    let ctx = &state.service_context;
    let request = ctx.registration_service.approve(Some(&current.user), id).await?;

    Ok(Json(ctx.permissions.annotate(Some(&current.user), request)))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    body: Option<Json<RejectRegistrationRequest>>,
) -> Result<Annotated> {
    let ctx = &state.service_context;
    let reason = body.and_then(|Json(b)| b.reason);
    let request = ctx
        .registration_service
        .reject(Some(&current.user), id, reason)
        .await?;

    Ok(Json(ctx.permissions.annotate(Some(&current.user), request)))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Annotated> {
    let ctx = &state.service_context;
    let request = ctx.registration_service.cancel(Some(&current.user), id).await?;

    Ok(Json(ctx.permissions.annotate(Some(&current.user), request)))
}
