/// API Routes definition

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::core::Controller;

pub fn create_router(controller: Arc<Controller>, enable_cors: bool) -> Router {
    let mut app = Router::new()
        .route("/api/snapshot", get(handlers::get_snapshot))
        .route("/api/disk", get(handlers::get_disk))
        .route("/api/containers", get(handlers::get_containers))
        .route("/api/containers/stop", post(handlers::stop_containers))
        .route("/api/containers/remove", post(handlers::remove_containers))
        .route("/api/ports", get(handlers::get_ports))
        .route("/api/databases", get(handlers::get_databases))
        .route("/api/images", get(handlers::get_images))
        .route("/api/images/dangling", get(handlers::get_dangling_images))
        .route("/api/images/:id", delete(handlers::remove_image))
        .route("/api/apps", get(handlers::get_apps).post(handlers::create_app))
        .route(
            "/api/apps/:name/compose",
            get(handlers::get_compose).put(handlers::save_compose),
        )
        .route("/api/readme", get(handlers::get_readme))
        .route("/api/version", get(handlers::get_version_info))
        .with_state(controller)
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}
