//! Health check endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use store::Database;

/// What a health endpoint reports on.
#[derive(Clone)]
pub struct HealthState {
    pub service: &'static str,
    /// Probed on every request when present.
    pub database: Option<Arc<dyn Database>>,
}

impl HealthState {
    pub fn new(service: &'static str) -> Self {
        Self {
            service,
            database: None,
        }
    }

    pub fn with_database(mut self, database: Arc<dyn Database>) -> Self {
        self.database = Some(database);
        self
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
}

/// GET /health — 200 when the service and its database answer, 503 otherwise.
pub async fn check(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let Some(database) = &state.database else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                service: state.service,
                database: None,
            }),
        );
    };

    match database.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                service: state.service,
                database: Some("connected"),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, service = state.service, "database health probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    ok: false,
                    service: state.service,
                    database: Some("disconnected"),
                }),
            )
        }
    }
}
