use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all Sila endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route(
            "/assemblies",
            get(handler::list_assemblies).post(handler::create_assembly),
        )
        .route(
            "/assemblies/:id",
            get(handler::get_assembly)
                .put(handler::update_assembly)
                .delete(handler::delete_assembly),
        )
        .route("/assemblies/:id/children", get(handler::assembly_children))
        .route("/assemblies/:id/parent", get(handler::assembly_parent))
        .route(
            "/parts",
            get(handler::list_parts).post(handler::create_part),
        )
        .route(
            "/parts/:id",
            get(handler::get_part)
                .put(handler::update_part)
                .delete(handler::delete_part),
        )
        .route("/parts/:id/parent", get(handler::part_parent))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
