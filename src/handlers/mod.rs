use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::reservation::{HealthReport, ReservationService};
use crate::utils::response::success;

pub mod tickets;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub tickets: ReservationService,
}

impl AppState {
    pub fn new(tickets: ReservationService) -> Self {
        Self { tickets }
    }
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    dependencies: HealthReport,
}

pub async fn health_check(State(state): State<AppState>) -> Response {
    let dependencies = state.tickets.health().await;
    let payload = HealthPayload {
        status: dependencies.status(),
        service: "ticket-service",
        dependencies,
    };

    let mut response = success(payload, "Health check completed");
    if !dependencies.is_serving() {
        *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
    }
    response
}
