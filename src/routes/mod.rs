use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod contracts;
pub mod health;
pub mod kanban;
pub mod surveys;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let contracts_routes = Router::new()
        .route(
            "/",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route("/:id", get(contracts::get_contract))
        .route("/:id/dashboard", get(contracts::contract_dashboard));

    let surveys_routes = Router::new()
        .route(
            "/",
            get(surveys::list_surveys).post(surveys::create_survey),
        )
        .route("/:id", get(surveys::get_survey))
        .route("/:id/status", patch(surveys::set_status))
        .route("/:id/schedule", patch(surveys::schedule_survey));

    let admin_routes = Router::new()
        .route("/deadlines", get(surveys::list_deadlines))
        .route("/surveys/:id/deadline", patch(surveys::update_deadline));

    let kanban_routes = Router::new()
        .route("/", get(kanban::get_board))
        .route("/move", post(kanban::move_card));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/contracts", contracts_routes)
        .nest("/api/surveys", surveys_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/kanban", kanban_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let allow_origin = match allowed_origins {
        Some(origins) => AllowOrigin::list(parse_origins(origins)),
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

fn parse_origins(origins: &str) -> Vec<HeaderValue> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| match value.parse::<HeaderValue>() {
            Ok(header) => Some(header),
            Err(_) => {
                tracing::warn!(origin = value, "ignoring invalid CORS allowed origin");
                None
            }
        })
        .collect()
}
