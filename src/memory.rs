//! In-process document store used by tests and when no `DATABASE_URL` is set.
//! Each operation holds the lock for a single read or write, which matches the
//! per-document atomicity of the Postgres store.

use std::collections::HashMap;

use axum::async_trait;
use time::Date;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::UserRepo;
use crate::auth::repo_types::User;
use crate::bookings::repo::BookingRepo;
use crate::bookings::repo_types::{
    Booking, BookingChanges, BookingFilter, BookingStats, BookingStatus,
};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryUserRepo {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        if let Some(existing) = self.users.write().await.get_mut(&user.id) {
            // email, role and counters are not written by save
            *existing = User {
                email: existing.email.clone(),
                role: existing.role,
                rating: existing.rating,
                total_bookings: existing.total_bookings,
                created_at: existing.created_at,
                ..user.clone()
            };
        }
        Ok(())
    }
}

/// Bookings kept in insertion order.
#[derive(Default)]
pub struct MemoryBookingRepo {
    bookings: RwLock<Vec<Booking>>,
}

#[async_trait]
impl BookingRepo for MemoryBookingRepo {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut bookings = self.bookings.write().await;
        if bookings.iter().any(|b| b.id == booking.id) {
            return Err(StoreError::Duplicate);
        }
        bookings.push(booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn search(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        // Walk newest-inserted first so equal timestamps keep that order.
        let mut found: Vec<Booking> = bookings
            .iter()
            .rev()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(filter.limit.max(0) as usize);
        Ok(found)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &BookingChanges,
    ) -> Result<Option<Booking>, StoreError> {
        let mut bookings = self.bookings.write().await;
        let Some(b) = bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        let start = changes.start_date.unwrap_or(b.start_date);
        let end = changes.end_date.unwrap_or(b.end_date);
        if end < start {
            return Err(StoreError::InvalidDateRange);
        }
        changes.apply_to(b);
        Ok(Some(b.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut bookings = self.bookings.write().await;
        let before = bookings.len();
        bookings.retain(|b| b.id != id);
        Ok(bookings.len() != before)
    }

    async fn upcoming(&self, today: Date, limit: i64) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.bookings.read().await;
        let mut found: Vec<Booking> = bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled && b.end_date >= today)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.start_date);
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn stats(&self, today: Date) -> Result<BookingStats, StoreError> {
        let bookings = self.bookings.read().await;
        let mut stats = BookingStats::default();
        for b in bookings.iter() {
            stats.total += 1;
            match b.status {
                BookingStatus::Pending => stats.pending += 1,
                BookingStatus::Confirmed => {
                    stats.confirmed += 1;
                    stats.revenue += b.total_price;
                    if b.end_date >= today {
                        stats.active += 1;
                    }
                }
                BookingStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }
}
