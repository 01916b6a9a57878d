use axum::async_trait;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use crate::bookings::repo_types::{
    Booking, BookingChanges, BookingFilter, BookingStats, BOOKING_COLUMNS,
};
use crate::error::StoreError;

/// Access to the `bookings` collection.
#[async_trait]
pub trait BookingRepo: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;
    /// Newest first, at most `filter.limit` rows.
    async fn search(&self, filter: &BookingFilter) -> Result<Vec<Booking>, StoreError>;
    /// Applies `changes` and returns the updated record, `None` when absent.
    /// Fails with [`StoreError::InvalidDateRange`] when the stored record
    /// merged with `changes` would end before it starts.
    async fn update(
        &self,
        id: Uuid,
        changes: &BookingChanges,
    ) -> Result<Option<Booking>, StoreError>;
    /// Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    /// Pending or confirmed bookings ending on or after `today`, soonest start first.
    async fn upcoming(&self, today: Date, limit: i64) -> Result<Vec<Booking>, StoreError>;
    async fn stats(&self, today: Date) -> Result<BookingStats, StoreError>;
}

#[derive(Clone)]
pub struct PgBookingRepo {
    db: PgPool,
}

impl PgBookingRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingRepo for PgBookingRepo {
    async fn insert(&self, b: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, pet_name, breed, owner_name, email, phone, start_date, end_date,
                special_notes, service_name, total_price, number_of_days, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(b.id)
        .bind(&b.pet_name)
        .bind(&b.breed)
        .bind(&b.owner_name)
        .bind(&b.email)
        .bind(&b.phone)
        .bind(b.start_date)
        .bind(b.end_date)
        .bind(&b.special_notes)
        .bind(&b.service_name)
        .bind(b.total_price)
        .bind(b.number_of_days)
        .bind(b.status)
        .bind(b.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(booking)
    }

    async fn search(&self, f: &BookingFilter) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE ($1::booking_status IS NULL OR status = $1)
              AND ($2::date IS NULL OR start_date >= $2)
              AND ($3::date IS NULL OR start_date <= $3)
              AND ($4::text IS NULL OR service_name = $4)
              AND ($5::text IS NULL OR email = $5)
            ORDER BY created_at DESC
            LIMIT $6
            "#
        ))
        .bind(f.status)
        .bind(f.start_from)
        .bind(f.start_until)
        .bind(&f.service_name)
        .bind(&f.email)
        .bind(f.limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn update(
        &self,
        id: Uuid,
        c: &BookingChanges,
    ) -> Result<Option<Booking>, StoreError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            r#"
            UPDATE bookings SET
                status = COALESCE($2, status),
                start_date = COALESCE($3, start_date),
                end_date = COALESCE($4, end_date),
                special_notes = COALESCE($5, special_notes),
                total_price = COALESCE($6, total_price),
                number_of_days = COALESCE($7, number_of_days)
            WHERE id = $1
              AND COALESCE($4, end_date) >= COALESCE($3, start_date)
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(c.status)
        .bind(c.start_date)
        .bind(c.end_date)
        .bind(&c.special_notes)
        .bind(c.total_price)
        .bind(c.number_of_days)
        .fetch_optional(&self.db)
        .await?;
        if booking.is_some() {
            return Ok(booking);
        }

        // No row: either the booking is gone or the merged range was rejected.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bookings WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.db)
                .await?;
        if exists {
            return Err(StoreError::InvalidDateRange);
        }
        Ok(None)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn upcoming(&self, today: Date, limit: i64) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query_as::<_, Booking>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE status IN ('pending', 'confirmed') AND end_date >= $1
            ORDER BY start_date ASC
            LIMIT $2
            "#
        ))
        .bind(today)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn stats(&self, today: Date) -> Result<BookingStats, StoreError> {
        let stats = sqlx::query_as::<_, BookingStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
                COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
                COUNT(*) FILTER (WHERE status = 'confirmed' AND end_date >= $1) AS active,
                COALESCE(SUM(total_price) FILTER (WHERE status = 'confirmed'), 0)::BIGINT AS revenue
            FROM bookings
            "#,
        )
        .bind(today)
        .fetch_one(&self.db)
        .await?;
        Ok(stats)
    }
}
