// handlers/health.rs - GET /health handler
use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::manager::DatabaseManager;

/// Liveness plus a database ping when documents live in Postgres
pub async fn health(State(pool): State<Option<PgPool>>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    let Some(pool) = pool else {
        return (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "memory"
            })),
        );
    };

    match DatabaseManager::health_check(&pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                })),
            )
        }
    }
}
