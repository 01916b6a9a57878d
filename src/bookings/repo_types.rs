use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 100;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// pending -> confirmed -> cancelled, and pending -> cancelled.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        ) || self == next
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!(
                "status must be one of pending, confirmed, cancelled (got {other:?})"
            )),
        }
    }
}

/// Booking record in the document store.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub pet_name: String,
    pub breed: String,
    pub owner_name: String,
    pub email: String,
    pub phone: String,
    pub start_date: Date,
    pub end_date: Date,
    pub special_notes: String,
    pub service_name: String,
    pub total_price: i64,
    pub number_of_days: i32,
    pub status: BookingStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub(crate) const BOOKING_COLUMNS: &str = "id, pet_name, breed, owner_name, email, phone, \
     start_date, end_date, special_notes, service_name, total_price, number_of_days, \
     status, created_at";

/// Independently combinable search criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    /// Lower bound (inclusive) on the start date.
    pub start_from: Option<Date>,
    /// Upper bound (inclusive) on the start date.
    pub start_until: Option<Date>,
    pub service_name: Option<String>,
    pub email: Option<String>,
    pub limit: i64,
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            status: None,
            start_from: None,
            start_until: None,
            service_name: None,
            email: None,
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl BookingFilter {
    pub fn matches(&self, b: &Booking) -> bool {
        self.status.map_or(true, |s| b.status == s)
            && self.start_from.map_or(true, |d| b.start_date >= d)
            && self.start_until.map_or(true, |d| b.start_date <= d)
            && self
                .service_name
                .as_deref()
                .map_or(true, |s| b.service_name == s)
            && self.email.as_deref().map_or(true, |e| b.email == e)
    }
}

/// The only booking fields an update may touch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BookingChanges {
    pub status: Option<BookingStatus>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub special_notes: Option<String>,
    pub total_price: Option<i64>,
    pub number_of_days: Option<i32>,
}

impl BookingChanges {
    pub fn apply_to(&self, b: &mut Booking) {
        if let Some(s) = self.status {
            b.status = s;
        }
        if let Some(d) = self.start_date {
            b.start_date = d;
        }
        if let Some(d) = self.end_date {
            b.end_date = d;
        }
        if let Some(n) = &self.special_notes {
            b.special_notes = n.clone();
        }
        if let Some(p) = self.total_price {
            b.total_price = p;
        }
        if let Some(n) = self.number_of_days {
            b.number_of_days = n;
        }
    }
}

/// Dashboard counters.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct BookingStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    /// Confirmed bookings that have not ended yet.
    pub active: i64,
    /// Sum of total price over confirmed bookings.
    pub revenue: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn sample() -> Booking {
        Booking {
            id: Uuid::new_v4(),
            pet_name: "Max".into(),
            breed: "Beagle".into(),
            owner_name: "John Doe".into(),
            email: "john@example.com".into(),
            phone: "5551234567".into(),
            start_date: date!(2024 - 03 - 20),
            end_date: date!(2024 - 03 - 22),
            special_notes: String::new(),
            service_name: "Day Care".into(),
            total_price: 90,
            number_of_days: 3,
            status: BookingStatus::Pending,
            created_at: datetime!(2024-03-01 10:00 UTC),
        }
    }

    #[test]
    fn transition_graph() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Pending));
    }

    #[test]
    fn parses_status() {
        assert_eq!("Confirmed".parse::<BookingStatus>(), Ok(BookingStatus::Confirmed));
        assert!("completed".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn filter_combines_criteria() {
        let b = sample();
        assert!(BookingFilter::default().matches(&b));

        let f = BookingFilter {
            status: Some(BookingStatus::Pending),
            start_from: Some(date!(2024 - 03 - 20)),
            start_until: Some(date!(2024 - 03 - 20)),
            service_name: Some("Day Care".into()),
            email: Some("john@example.com".into()),
            ..Default::default()
        };
        assert!(f.matches(&b));

        let f = BookingFilter {
            start_from: Some(date!(2024 - 03 - 21)),
            ..Default::default()
        };
        assert!(!f.matches(&b));

        let f = BookingFilter {
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        };
        assert!(!f.matches(&b));
    }

    #[test]
    fn changes_touch_only_listed_fields() {
        let mut b = sample();
        let before = b.clone();
        BookingChanges {
            status: Some(BookingStatus::Confirmed),
            special_notes: Some("Allergic to chicken".into()),
            ..Default::default()
        }
        .apply_to(&mut b);
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert_eq!(b.special_notes, "Allergic to chicken");
        assert_eq!(b.pet_name, before.pet_name);
        assert_eq!(b.total_price, before.total_price);
        assert_eq!(b.start_date, before.start_date);
    }

    #[test]
    fn booking_serializes_dates_as_iso() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["start_date"], "2024-03-20");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["created_at"], "2024-03-01T10:00:00Z");
    }
}
