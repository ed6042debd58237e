use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use platano_store::{JsonFileStore, MeetupRegistry};
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    registry: Arc<MeetupRegistry<JsonFileStore>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(registry: Arc<MeetupRegistry<JsonFileStore>>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { registry })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    registry: Arc<MeetupRegistry<JsonFileStore>>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(registry)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store = store_check(&state.registry).await;
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "platano-server runtime initialized".to_string(),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(registry: &MeetupRegistry<JsonFileStore>) -> HealthCheck {
    match registry.list().await {
        Ok(meetups) => HealthCheck {
            status: "ready",
            detail: format!("meetup store readable ({} meetups)", meetups.len()),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("meetup store unavailable: {error}") }
        }
    }
}
