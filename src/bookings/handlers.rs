use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::dto::MessageResponse,
    bookings::{
        dto::{
            BookingListResponse, BookingResponse, CreateBookingRequest, ListBookingsQuery,
            ServicesResponse, StatsResponse, UpdateBookingRequest,
        },
        services,
    },
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list_services))
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/upcoming", get(upcoming_bookings))
        .route("/bookings/stats", get(booking_stats))
        .route(
            "/bookings/:id",
            get(get_booking)
                .put(update_booking)
                .patch(update_booking)
                .delete(delete_booking),
        )
}

pub async fn list_services(State(state): State<AppState>) -> Json<ServicesResponse> {
    Json(ServicesResponse {
        success: true,
        services: state.config.catalog.offers().to_vec(),
    })
}

#[instrument(skip(state, payload))]
pub async fn create_booking(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let booking = services::create(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(BookingResponse::ok(booking))))
}

#[instrument(skip(state))]
pub async fn list_bookings(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListBookingsQuery>,
) -> AppResult<Json<BookingListResponse>> {
    let bookings = services::list(&state, query).await?;
    Ok(Json(bookings.into()))
}

#[instrument(skip(state))]
pub async fn upcoming_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<BookingListResponse>> {
    let bookings = services::upcoming(&state).await?;
    Ok(Json(bookings.into()))
}

#[instrument(skip(state))]
pub async fn booking_stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let stats = services::stats(&state).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

#[instrument(skip(state))]
pub async fn get_booking(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = services::get(&state, id).await?;
    Ok(Json(BookingResponse::ok(booking)))
}

#[instrument(skip(state, payload))]
pub async fn update_booking(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    let booking = services::update(&state, id, payload).await?;
    Ok(Json(BookingResponse::ok(booking)))
}

#[instrument(skip(state))]
pub async fn delete_booking(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete(&state, id).await?;
    Ok(Json(MessageResponse::ok("Booking deleted successfully")))
}
