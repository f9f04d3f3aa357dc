use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{feeds, handlers, middleware::metrics_middleware, subscribers, sync};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Sync
        .route("/sync", post(sync::trigger_sync))
        // Subscribers
        .route(
            "/subscribers/{subscriber}",
            put(subscribers::register)
                .get(subscribers::get_subscriber)
                .delete(subscribers::unregister),
        )
        .route(
            "/subscribers/{subscriber}/subscriptions",
            put(subscribers::subscribe),
        )
        .route(
            "/subscribers/{subscriber}/subscriptions/{series}",
            delete(subscribers::unsubscribe),
        )
        // Subscriber artifacts
        .route("/feeds/{subscriber}", get(feeds::get_feed))
        .route("/torrents/{subscriber}/{file}", get(feeds::get_torrent))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(metrics_middleware)),
        )
}
