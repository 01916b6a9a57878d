use serde::{Deserialize, Serialize};

use super::catalog::ServiceOffer;
use super::repo_types::{
    Booking, BookingChanges, BookingFilter, BookingStats, BookingStatus, DEFAULT_LIST_LIMIT,
    MAX_LIST_LIMIT,
};
use crate::error::{AppError, AppResult};
use crate::validation::parse_date;

/// Customer submission. Totals sent by the client are not read; the price is
/// derived from the catalog.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub pet_name: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    pub special_notes: Option<String>,
    #[serde(default)]
    pub service_name: String,
}

/// Partial update. Fields outside this struct are dropped by deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub special_notes: Option<String>,
    pub total_price: Option<i64>,
    pub number_of_days: Option<i32>,
}

impl UpdateBookingRequest {
    pub fn into_changes(self) -> AppResult<BookingChanges> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<BookingStatus>)
            .transpose()
            .map_err(AppError::Validation)?;
        let start_date = self
            .start_date
            .as_deref()
            .map(|d| parse_date("start_date", d))
            .transpose()?;
        let end_date = self
            .end_date
            .as_deref()
            .map(|d| parse_date("end_date", d))
            .transpose()?;
        if matches!(self.total_price, Some(p) if p < 0) {
            return Err(AppError::validation("total_price must not be negative"));
        }
        if matches!(self.number_of_days, Some(n) if n < 1) {
            return Err(AppError::validation("number_of_days must be at least 1"));
        }
        Ok(BookingChanges {
            status,
            start_date,
            end_date,
            special_notes: self.special_notes.map(|n| n.trim().to_string()),
            total_price: self.total_price,
            number_of_days: self.number_of_days,
        })
    }
}

/// Query string of `GET /bookings`. Blank values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub service: Option<String>,
    pub email: Option<String>,
    pub limit: Option<i64>,
}

fn present(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl ListBookingsQuery {
    pub fn into_filter(self) -> AppResult<BookingFilter> {
        let status = present(self.status)
            .map(|s| s.parse::<BookingStatus>())
            .transpose()
            .map_err(AppError::Validation)?;
        let start_from = present(self.start_date)
            .map(|d| parse_date("start_date", &d))
            .transpose()?;
        let start_until = present(self.end_date)
            .map(|d| parse_date("end_date", &d))
            .transpose()?;
        Ok(BookingFilter {
            status,
            start_from,
            start_until,
            service_name: present(self.service),
            email: present(self.email).map(|e| e.to_lowercase()),
            limit: self
                .limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub booking: Booking,
}

impl BookingResponse {
    pub fn ok(booking: Booking) -> Self {
        Self {
            success: true,
            booking,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub success: bool,
    pub count: usize,
    pub bookings: Vec<Booking>,
}

impl From<Vec<Booking>> for BookingListResponse {
    fn from(bookings: Vec<Booking>) -> Self {
        Self {
            success: true,
            count: bookings.len(),
            bookings,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: BookingStats,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub success: bool,
    pub services: Vec<ServiceOffer>,
}
