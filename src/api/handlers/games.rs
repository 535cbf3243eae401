use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::{current_user, CurrentUser}, state::AppState},
    domain::{CreateGameRequest, Game, GameDetails, Page, UpdateGameRequest, WithPermissions},
    error::Result,
    search::{GameFilter, Pagination},
};

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<GameFilter>,
    Query(pagination): Query<Pagination>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Page<WithPermissions<Game>>>> {
    let (skip, limit) = pagination.resolve(&state.settings.search);
    let ctx = &state.service_context;

    let (games, count) = ctx.game_service.search(&filter, skip, limit).await?;
    let items = ctx.permissions.batch_permissions(current_user(&user), games)?;

    Ok(Json(Page { items, count }))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<WithPermissions<GameDetails>>> {
    let ctx = &state.service_context;
    let details = ctx.game_service.get(id).await?;
    let permissions = ctx
        .permissions
        .record_permissions(current_user(&user), &details.game);

    Ok(Json(WithPermissions {
        record: details,
        permissions,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<WithPermissions<Game>>)> {
    let ctx = &state.service_context;
    let game = ctx.game_service.create(Some(&current.user), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ctx.permissions.annotate(Some(&current.user), game)),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<UpdateGameRequest>,
) -> Result<Json<WithPermissions<Game>>> {
    let ctx = &state.service_context;
    let game = ctx.game_service.update(Some(&current.user), id, request).await?;

    Ok(Json(ctx.permissions.annotate(Some(&current.user), game)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(current): Extension<CurrentUser>,
) -> Result<StatusCode> {
    state
        .service_context
        .game_service
        .delete(Some(&current.user), id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
