use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
    Extension,
};

use crate::{
    api::state::AppState,
    domain::User,
    error::AppError,
};

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

/// The user behind an optional `CurrentUser` extension.
pub fn current_user(user: &Option<Extension<CurrentUser>>) -> Option<&User> {
    user.as_ref().map(|Extension(current)| &current.user)
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

/// Rejects the request with 401 unless it carries a valid session token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.extensions().get::<CurrentUser>().is_some() {
        return Ok(next.run(request).await);
    }

    let token = bearer_token(&request).ok_or(AppError::Unauthorized)?;

    let user = state
        .service_context
        .auth_service
        .authenticate(&token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

/// Attaches `CurrentUser` when a valid session token is present.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request) {
        match state.service_context.auth_service.authenticate(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(CurrentUser { user });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to resolve session: {}", e),
        }
    }

    next.run(request).await
}
