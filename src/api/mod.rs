pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        .route("/health", get(handlers::root::health_check))
        .nest("/api", api_routes(app_state.clone()))
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me/permissions", get(handlers::me::permissions))
        .nest("/games", game_routes(state.clone()))
        .nest("/announcements", announcement_routes(state.clone()))
        .nest("/registration-requests", registration_request_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::optional_auth,
        ))
}

fn game_routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(handlers::games::list))
        .route("/:id", get(handlers::games::get));

    let protected = Router::new()
        .route("/", post(handlers::games::create))
        .route("/:id", put(handlers::games::update).delete(handlers::games::delete))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ));

    public.merge(protected)
}

fn announcement_routes(state: AppState) -> Router<AppState> {
    use handlers::announcements as h;

    let public = Router::new()
        .route("/", get(h::list))
        .route("/:id", get(h::get))
        .route("/:id/registration-form", get(h::registration_form))
        .route("/:id/participants", get(h::participants));

    let protected = Router::new()
        .route("/", post(h::create))
        .route("/:id", put(h::update).delete(h::delete))
        .route("/:id/status", post(h::update_status))
        .route("/:id/registration-form", put(h::replace_registration_form))
        .route(
            "/:id/registration-requests",
            get(h::list_registration_requests).post(h::create_registration_request),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ));

    public.merge(protected)
}

fn registration_request_routes(state: AppState) -> Router<AppState> {
    use handlers::registration_requests as h;

    Router::new()
        .route("/mine", get(h::mine))
        .route("/:id", get(h::get))
        .route("/:id/approve", post(h::approve))
        .route("/:id/reject", post(h::reject))
        .route("/:id/cancel", post(h::cancel))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn user_routes(state: AppState) -> Router<AppState> {
    use handlers::users as h;

    let public = Router::new()
        .route("/:id/organized-announcements", get(h::organized_announcements));

    let protected = Router::new()
        .route("/me/organized-announcements", get(h::my_organized_announcements))
        .route("/me/participated-announcements", get(h::my_participated_announcements))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ));

    public.merge(protected)
}
