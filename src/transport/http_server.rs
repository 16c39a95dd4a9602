use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    server::AppState,
    transport::{middleware::check_auth, routes, websocket_server},
};

pub fn router(state: Arc<AppState>) -> Router {
    let mut search_routes = Router::new().route("/search", get(routes::search_tracks));
    if state.config.server.search_requires_auth {
        search_routes =
            search_routes.layer(middleware::from_fn_with_state(state.clone(), check_auth));
    }

    let debug_routes = Router::new()
        .route("/debug", get(routes::debug_stats))
        .layer(middleware::from_fn_with_state(state.clone(), check_auth));

    Router::new()
        .route("/", get(websocket_server::websocket_handler))
        .merge(search_routes)
        .merge(debug_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
