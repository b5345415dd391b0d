//! `GET /health`: readiness of the client directory schema.
//!
//! Ready means the migrated tables answer a read, not merely that a
//! connection can be opened.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use bakehouse_db::DbPool;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseProbe {
    pub status: Readiness,
    pub detail: String,
}

/// Row counts seen by the probe; absent when the schema is unreadable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DirectorySnapshot {
    pub clients: i64,
    pub orders: i64,
    pub schema_version: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: Readiness,
    pub database: DatabaseProbe,
    pub directory: Option<DirectorySnapshot>,
    pub checked_at: DateTime<Utc>,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(db_pool)
}

pub async fn health(State(pool): State<DbPool>) -> (StatusCode, Json<HealthReport>) {
    let report = match snapshot(&pool).await {
        Ok(directory) => HealthReport {
            status: Readiness::Ready,
            database: DatabaseProbe {
                status: Readiness::Ready,
                detail: "client directory schema readable".to_string(),
            },
            directory: Some(directory),
            checked_at: Utc::now(),
        },
        Err(error) => {
            warn!(
                event_name = "system.health.database_degraded",
                error = %error,
                "client directory schema probe failed"
            );
            HealthReport {
                status: Readiness::Degraded,
                database: DatabaseProbe {
                    status: Readiness::Degraded,
                    detail: format!("schema probe failed: {error}"),
                },
                directory: None,
                checked_at: Utc::now(),
            }
        }
    };

    let code = match report.status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(report))
}

async fn snapshot(pool: &DbPool) -> Result<DirectorySnapshot, sqlx::Error> {
    let (clients, orders, schema_version): (i64, i64, Option<i64>) = sqlx::query_as(
        "SELECT (SELECT COUNT(*) FROM customer),
                (SELECT COUNT(*) FROM customer_order),
                (SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1)",
    )
    .fetch_one(pool)
    .await?;
    Ok(DirectorySnapshot { clients, orders, schema_version })
}
