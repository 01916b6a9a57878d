use time::{Date, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    bookings::{
        dto::{CreateBookingRequest, ListBookingsQuery, UpdateBookingRequest},
        repo_types::{Booking, BookingStats, BookingStatus},
    },
    error::{with_deadline, AppError, AppResult},
    mailer::{send_best_effort, TemplateData},
    state::AppState,
    validation::{is_valid_email, is_valid_phone, normalize_email, parse_date, require_fields},
};

const UPCOMING_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub number_of_days: i32,
    pub total_price: i64,
}

/// Both ends of the range are billed.
pub fn quote(start: Date, end: Date, daily_rate: i64) -> AppResult<Quote> {
    if end < start {
        return Err(AppError::validation("End date must not be before start date"));
    }
    let days = (end - start).whole_days() + 1;
    let number_of_days =
        i32::try_from(days).map_err(|_| AppError::validation("Date range is too long"))?;
    let total_price = days
        .checked_mul(daily_rate)
        .ok_or_else(|| AppError::validation("Date range is too long"))?;
    Ok(Quote {
        number_of_days,
        total_price,
    })
}

fn not_found() -> AppError {
    AppError::NotFound("Booking not found".into())
}

pub async fn create(st: &AppState, req: CreateBookingRequest) -> AppResult<Booking> {
    require_fields(&[
        ("pet_name", req.pet_name.as_str()),
        ("breed", req.breed.as_str()),
        ("owner_name", req.owner_name.as_str()),
        ("email", req.email.as_str()),
        ("phone", req.phone.as_str()),
        ("start_date", req.start_date.as_str()),
        ("end_date", req.end_date.as_str()),
        ("service_name", req.service_name.as_str()),
    ])?;
    let start_date = parse_date("start_date", &req.start_date)?;
    let end_date = parse_date("end_date", &req.end_date)?;
    if end_date < start_date {
        warn!(%start_date, %end_date, "booking with inverted dates");
        return Err(AppError::validation("End date must not be before start date"));
    }
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    let phone = req.phone.trim().to_string();
    if !is_valid_phone(&phone) {
        return Err(AppError::validation("Phone number must be exactly 10 digits"));
    }
    let offer = st
        .config
        .catalog
        .find(&req.service_name)
        .ok_or_else(|| AppError::validation(format!("Unknown service: {}", req.service_name.trim())))?;
    let Quote {
        number_of_days,
        total_price,
    } = quote(start_date, end_date, offer.daily_rate)?;

    let booking = Booking {
        id: Uuid::new_v4(),
        pet_name: req.pet_name.trim().to_string(),
        breed: req.breed.trim().to_string(),
        owner_name: req.owner_name.trim().to_string(),
        email,
        phone,
        start_date,
        end_date,
        special_notes: req
            .special_notes
            .map(|n| n.trim().to_string())
            .unwrap_or_default(),
        service_name: offer.name.clone(),
        total_price,
        number_of_days,
        status: BookingStatus::Pending,
        created_at: OffsetDateTime::now_utc(),
    };

    let timeout = st.config.upstream_timeout;
    with_deadline(timeout, st.bookings.insert(&booking)).await?;

    send_best_effort(
        st.notifier.as_ref(),
        &booking.email,
        TemplateData::Booking {
            service_name: booking.service_name.clone(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_price: booking.total_price,
        },
        timeout,
    )
    .await;

    info!(booking_id = %booking.id, service = %booking.service_name, total_price, "booking created");
    Ok(booking)
}

pub async fn get(st: &AppState, id: Uuid) -> AppResult<Booking> {
    with_deadline(st.config.upstream_timeout, st.bookings.find_by_id(id))
        .await?
        .ok_or_else(not_found)
}

pub async fn list(st: &AppState, query: ListBookingsQuery) -> AppResult<Vec<Booking>> {
    let filter = query.into_filter()?;
    with_deadline(st.config.upstream_timeout, st.bookings.search(&filter)).await
}

/// Last write wins. The store re-checks the merged date range at write time,
/// so a concurrent update cannot leave the booking ending before it starts.
pub async fn update(st: &AppState, id: Uuid, req: UpdateBookingRequest) -> AppResult<Booking> {
    let changes = req.into_changes()?;
    let timeout = st.config.upstream_timeout;
    let current = with_deadline(timeout, st.bookings.find_by_id(id))
        .await?
        .ok_or_else(not_found)?;

    let start = changes.start_date.unwrap_or(current.start_date);
    let end = changes.end_date.unwrap_or(current.end_date);
    if end < start {
        return Err(AppError::validation("End date must not be before start date"));
    }
    if let Some(next) = changes.status {
        if !current.status.can_transition_to(next) {
            warn!(booking_id = %id, from = ?current.status, to = ?next, "unusual status transition");
        }
    }

    let updated = with_deadline(timeout, st.bookings.update(id, &changes))
        .await?
        .ok_or_else(not_found)?;
    info!(booking_id = %id, status = ?updated.status, "booking updated");
    Ok(updated)
}

pub async fn delete(st: &AppState, id: Uuid) -> AppResult<()> {
    if !with_deadline(st.config.upstream_timeout, st.bookings.delete(id)).await? {
        return Err(not_found());
    }
    info!(booking_id = %id, "booking deleted");
    Ok(())
}

pub async fn upcoming(st: &AppState) -> AppResult<Vec<Booking>> {
    let today = OffsetDateTime::now_utc().date();
    with_deadline(
        st.config.upstream_timeout,
        st.bookings.upcoming(today, UPCOMING_LIMIT),
    )
    .await
}

pub async fn stats(st: &AppState) -> AppResult<BookingStats> {
    let today = OffsetDateTime::now_utc().date();
    with_deadline(st.config.upstream_timeout, st.bookings.stats(today)).await
}
