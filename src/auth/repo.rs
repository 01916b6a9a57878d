use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{User, USER_COLUMNS};
use crate::error::StoreError;

/// Access to the `users` collection.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    /// Writes every mutable column of `user` in one statement.
    async fn save(&self, user: &User) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verification_token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, role, first_name, last_name, phone,
                bio, experience, availability, profile_picture, rating, total_bookings, email_verified,
                verification_token, verification_expires_at, reset_token, reset_expires_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.bio)
        .bind(&user.experience)
        .bind(&user.availability)
        .bind(&user.profile_picture)
        .bind(user.rating)
        .bind(user.total_bookings)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(user.verification_expires_at)
        .bind(&user.reset_token)
        .bind(user.reset_expires_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $2,
                first_name = $3,
                last_name = $4,
                phone = $5,
                bio = $6,
                experience = $7,
                availability = $8,
                profile_picture = $9,
                email_verified = $10,
                verification_token = $11,
                verification_expires_at = $12,
                reset_token = $13,
                reset_expires_at = $14,
                updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.bio)
        .bind(&user.experience)
        .bind(&user.availability)
        .bind(&user.profile_picture)
        .bind(user.email_verified)
        .bind(&user.verification_token)
        .bind(user.verification_expires_at)
        .bind(&user.reset_token)
        .bind(user.reset_expires_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}
