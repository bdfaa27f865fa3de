use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::allocation::Placement;
use crate::coordinator::ReservationError;
use crate::middleware::AuthUser;
use crate::models::{Seat, UserId};
use crate::venue::SeatMap;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/seats", get(get_seats))
        .route("/seats/reserve", post(reserve_seats))
        .route("/seats/cancel", post(cancel_reservation))
}

/* ---------- helpers ---------- */

fn reservation_error(e: ReservationError) -> (StatusCode, String) {
    let status = match &e {
        ReservationError::InvalidCount(_) | ReservationError::NotEnoughSeats { .. } => {
            StatusCode::BAD_REQUEST
        }
        ReservationError::Contention { .. } => StatusCode::CONFLICT,
        ReservationError::StoreUnavailable(_) => {
            tracing::error!("seat store error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Seat store unavailable".to_string());
        }
    };
    (status, e.to_string())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeatResponse {
    row: i32,
    seat_number: i32,
    global_number: Option<u32>,
    is_reserved: bool,
    reserved_by: Option<UserId>,
}

impl SeatResponse {
    fn from_seat(seat: &Seat, map: &SeatMap) -> Self {
        Self {
            row: seat.row,
            seat_number: seat.seat_number,
            global_number: map.global_number(seat.key()),
            is_reserved: seat.is_reserved(),
            reserved_by: seat.reserved_by,
        }
    }
}

fn global_numbers(seats: &[Seat], map: &SeatMap) -> Vec<u32> {
    seats
        .iter()
        .filter_map(|s| map.global_number(s.key()))
        .collect()
}

/* ---------- SEATS ---------- */

// GET /api/seats
async fn get_seats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let seats = match state.cache.get_seats().await {
        Some(seats) => seats,
        None => {
            let generation = state.cache.generation();
            let seats = state
                .coordinator
                .list_seats()
                .await
                .map_err(reservation_error)?;
            state.cache.save_seats(generation, &seats).await;
            seats
        }
    };

    let payload: Vec<SeatResponse> = seats
        .iter()
        .map(|s| SeatResponse::from_seat(s, &state.seat_map))
        .collect();

    Ok((StatusCode::OK, Json(payload)))
}

// POST /api/seats/reserve
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReserveRequest {
    seat_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReserveResponse {
    message: &'static str,
    reserved_seats: Vec<u32>,
    placement: Placement,
    seats: Vec<SeatResponse>,
}

async fn reserve_seats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ReserveRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // отрицательные и огромные значения отсеет координатор как InvalidCount
    let requested = u32::try_from(req.seat_count).unwrap_or(0);

    let granted = state
        .coordinator
        .reserve(user.user_id, requested)
        .await
        .map_err(reservation_error)?;

    state.cache.invalidate_seats().await;

    Ok((
        StatusCode::OK,
        Json(ReserveResponse {
            message: "Seats reserved successfully",
            reserved_seats: global_numbers(&granted.seats, &state.seat_map),
            placement: granted.placement,
            seats: granted
                .seats
                .iter()
                .map(|s| SeatResponse::from_seat(s, &state.seat_map))
                .collect(),
        }),
    ))
}

// POST /api/seats/cancel
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelResponse {
    message: &'static str,
    released_seats: Vec<u32>,
}

async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let released = state
        .coordinator
        .cancel(user.user_id)
        .await
        .map_err(reservation_error)?;

    if !released.is_empty() {
        state.cache.invalidate_seats().await;
    }

    Ok((
        StatusCode::OK,
        Json(CancelResponse {
            message: "Reservation cancelled successfully",
            released_seats: global_numbers(&released, &state.seat_map),
        }),
    ))
}
