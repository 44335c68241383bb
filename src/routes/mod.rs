use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{health_check, tickets, AppState};

/// Ticket API without any middleware.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/tickets",
            get(tickets::list_tickets).post(tickets::reserve_ticket),
        )
        .route("/tickets/:ticket_id", get(tickets::get_ticket))
        .route("/tickets/:ticket_id/payment", post(tickets::confirm_payment))
        .route("/tickets/:ticket_id/cancel", post(tickets::cancel_ticket))
        .route("/users/:user_id/tickets", get(tickets::list_user_tickets))
        .route("/movies/:movie_id/tickets", get(tickets::list_movie_tickets))
        .route(
            "/sessions/:session_id/seats/:seat_number",
            get(tickets::seat_availability),
        )
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    let router = api_routes().with_state(state);

    create_security_headers_layer(router, config.production).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(create_cors_layer(config.cors_allowed_origins.as_deref())),
    )
}
