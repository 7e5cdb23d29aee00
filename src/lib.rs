use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use config::Config;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use middleware::{RateLimiter, log_errors, rate_limit, require_session};
use session::SessionStore;
use stackstorm::{ConnectionsConfig, StackStormClient, StackStormError};

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod stackstorm;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub connections: Arc<ConnectionsConfig>,
    pub stackstorm: StackStormClient,
    pub auth_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: SessionStore,
        connections: ConnectionsConfig,
    ) -> Result<Self, StackStormError> {
        let stackstorm = StackStormClient::new(config.stackstorm_verify_tls)?;
        let auth_limiter =
            RateLimiter::new(config.auth_rate_limit, config.trust_forwarded_headers);

        Ok(AppState {
            config,
            sessions,
            connections: Arc::new(connections),
            stackstorm,
            auth_limiter,
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) if origin != "*" => Some(value),
            _ => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Assembles the full HTTP application.
pub fn app(state: AppState) -> Router {
    let auth_route = Router::new()
        .route("/session/auth", post(routes::session::authenticate))
        .route_layer(from_fn_with_state(state.auth_limiter.clone(), rate_limit));

    let public_routes = Router::new()
        .route("/session/status", get(routes::session::status))
        .route("/session/logout", post(routes::session::logout))
        .merge(auth_route);

    let protected_routes = Router::new()
        .route(
            "/session/data",
            get(routes::session::get_data).post(routes::session::store_data),
        )
        .route("/session/count", get(routes::session::count))
        .route(
            "/stackstorm/connection",
            get(routes::stackstorm::get_connection).put(routes::stackstorm::set_connection),
        )
        .route(
            "/stackstorm/connection/test",
            post(routes::stackstorm::test_connection),
        )
        .route(
            "/stackstorm/executions",
            get(routes::stackstorm::list_executions),
        )
        .route(
            "/stackstorm/executions/{execution_id}",
            get(routes::stackstorm::get_execution),
        )
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health))
        .nest(
            "/api",
            Router::new().merge(public_routes).merge(protected_routes),
        )
        .layer(from_fn(log_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}
