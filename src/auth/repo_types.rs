use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Boarder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Weekly availability of a boarder; times are `HH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub days: Vec<Weekday>,
    pub start_time: String,
    pub end_time: String,
}

/// User record in the document store.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string, never serialized
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub bio: Option<String>,
    pub experience: Option<String>,
    pub availability: Option<Json<Availability>>,
    pub profile_picture: Option<String>,
    pub rating: f64,
    pub total_bookings: i32,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_expires_at: Option<OffsetDateTime>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub(crate) const USER_COLUMNS: &str = "id, email, password_hash, role, first_name, last_name, phone, \
     bio, experience, availability, profile_picture, rating, total_bookings, email_verified, \
     verification_token, verification_expires_at, reset_token, reset_expires_at, \
     created_at, updated_at";
