use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::utils::response::{created, success};
use crate::utils::AppError;

#[derive(Debug, Deserialize)]
pub struct ReserveTicketRequest {
    pub session_id: String,
    pub movie_id: String,
    pub user_id: String,
    pub seat_number: String,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_method: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeatAvailability {
    pub session_id: String,
    pub seat_number: String,
    pub available: bool,
}

pub async fn reserve_ticket(
    State(state): State<AppState>,
    Json(body): Json<ReserveTicketRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .reserve_ticket(
            &body.session_id,
            &body.movie_id,
            &body.user_id,
            &body.seat_number,
            body.price,
        )
        .await?;

    Ok(created(ticket, "Ticket reserved"))
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
    Json(body): Json<ConfirmPaymentRequest>,
) -> Result<Response, AppError> {
    let ticket = state
        .tickets
        .confirm_payment(&ticket_id, &body.payment_method)
        .await?;

    Ok(success(ticket, "Payment confirmed"))
}

pub async fn cancel_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    let ticket = state.tickets.cancel_ticket(&ticket_id).await?;
    Ok(success(ticket, "Ticket cancelled"))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, AppError> {
    let ticket = state.tickets.get_ticket(&ticket_id).await?;
    Ok(success(ticket, "Ticket retrieved"))
}

pub async fn list_tickets(State(state): State<AppState>) -> Result<Response, AppError> {
    let tickets = state.tickets.get_all_tickets().await?;
    Ok(success(tickets, "Tickets retrieved"))
}

pub async fn list_user_tickets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let tickets = state.tickets.get_user_tickets(&user_id).await?;
    Ok(success(tickets, "User tickets retrieved"))
}

pub async fn list_movie_tickets(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
) -> Result<Response, AppError> {
    let tickets = state.tickets.get_movie_tickets(&movie_id).await?;
    Ok(success(tickets, "Movie tickets retrieved"))
}

pub async fn seat_availability(
    State(state): State<AppState>,
    Path((session_id, seat_number)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let available = state
        .tickets
        .check_seat_availability(&session_id, &seat_number)
        .await?;

    Ok(success(
        SeatAvailability {
            session_id,
            seat_number,
            available,
        },
        "Seat availability retrieved",
    ))
}
