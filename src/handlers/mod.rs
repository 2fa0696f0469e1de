// HTTP surface: one route group per configured resource plus /health
pub mod health;
pub mod resource;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::config;
use crate::crud::Crud;

pub use resource::{resource_routes, JsonReply};

/// Assemble the application router
pub fn app(cruds: Vec<Crud>, pool: Option<PgPool>) -> Router {
    let settings = config();

    let mut router = Router::new().route("/health", get(health::health).with_state(pool));

    for crud in cruds {
        tracing::info!("Mounted /api/{}", crud.collection());
        router = router.merge(resource_routes(crud));
    }

    let router = router.layer(DefaultBodyLimit::max(settings.api.max_request_size_bytes));

    let router = if settings.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    if settings.security.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
