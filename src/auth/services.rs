use axum::extract::FromRef;
use rand::{distributions::Alphanumeric, Rng};
use sqlx::types::Json;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{RegisterRequest, UpdateProfileRequest},
        jwt::JwtKeys,
        password::{hash_password, validate_password, verify_password},
        repo_types::{Role, User},
    },
    error::{with_deadline, AppError, AppResult},
    mailer::{send_best_effort, TemplateData},
    state::AppState,
    validation::{
        check_availability, check_max_len, is_valid_email, normalize_email, require_fields,
        MAX_BIO_LEN, MAX_EXPERIENCE_LEN, MAX_PICTURE_URL_LEN,
    },
};

/// Identical for existing and unknown accounts.
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account exists, a password reset email will be sent";

const VERIFICATION_TOKEN_LEN: usize = 64;

/// An authenticated user plus the session token to hand back.
pub struct Session {
    pub user: User,
    pub token: String,
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub async fn register(st: &AppState, req: RegisterRequest) -> AppResult<Session> {
    let email = normalize_email(&req.email);
    let role = req
        .role
        .ok_or_else(|| AppError::validation("Missing required fields: role"))?;
    require_fields(&[
        ("email", email.as_str()),
        ("password", req.password.as_str()),
        ("first_name", req.first_name.as_str()),
        ("last_name", req.last_name.as_str()),
        ("phone", req.phone.as_str()),
    ])?;
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    validate_password(&req.password)?;
    let bio = trimmed(req.bio);
    let experience = trimmed(req.experience);
    check_max_len("bio", bio.as_deref(), MAX_BIO_LEN)?;
    check_max_len("experience", experience.as_deref(), MAX_EXPERIENCE_LEN)?;
    if let Some(a) = &req.availability {
        check_availability(a)?;
    }

    let timeout = st.config.upstream_timeout;
    if with_deadline(timeout, st.users.find_by_email(&email))
        .await?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateAccount);
    }

    let password_hash = hash_password(&req.password)?;
    let now = OffsetDateTime::now_utc();
    let verification_token = random_token();
    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash,
        role,
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        bio,
        experience,
        availability: req.availability.map(Json),
        profile_picture: None,
        rating: 0.0,
        total_bookings: 0,
        email_verified: false,
        verification_token: Some(verification_token.clone()),
        verification_expires_at: Some(now + TimeDuration::hours(st.config.verify_ttl_hours)),
        reset_token: None,
        reset_expires_at: None,
        created_at: now,
        updated_at: now,
    };

    // The unique index still catches a registration racing this one.
    with_deadline(timeout, st.users.insert(&user)).await?;

    send_best_effort(
        st.notifier.as_ref(),
        &user.email,
        TemplateData::Verification {
            token: verification_token,
        },
        timeout,
    )
    .await;

    let token = JwtKeys::from_ref(st).sign_session(user.id)?;
    info!(user_id = %user.id, role = ?user.role, "user registered");
    Ok(Session { user, token })
}

pub async fn login(st: &AppState, email: &str, password: &str) -> AppResult<Session> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let user = match with_deadline(st.config.upstream_timeout, st.users.find_by_email(&email))
        .await?
    {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(st).sign_session(user.id)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Session { user, token })
}

/// Always succeeds for a well-formed request, whether or not the account exists.
pub async fn request_password_reset(st: &AppState, email: Option<String>) -> AppResult<()> {
    let email = email.map(|e| normalize_email(&e)).unwrap_or_default();
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }

    let timeout = st.config.upstream_timeout;
    let Some(mut user) = with_deadline(timeout, st.users.find_by_email(&email)).await? else {
        info!("password reset requested for unknown email");
        return Ok(());
    };

    let keys = JwtKeys::from_ref(st);
    let token = keys.sign_reset(user.id)?;
    let now = OffsetDateTime::now_utc();
    user.reset_token = Some(token.clone());
    user.reset_expires_at = Some(now + TimeDuration::seconds(keys.reset_ttl.as_secs() as i64));
    user.updated_at = now;
    with_deadline(timeout, st.users.save(&user)).await?;

    send_best_effort(
        st.notifier.as_ref(),
        &user.email,
        TemplateData::PasswordReset { token },
        timeout,
    )
    .await;
    info!(user_id = %user.id, "password reset issued");
    Ok(())
}

pub async fn confirm_password_reset(
    st: &AppState,
    token: Option<String>,
    password: Option<String>,
) -> AppResult<()> {
    let (Some(token), Some(password)) = (
        token.filter(|t| !t.trim().is_empty()),
        password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::validation("Token and password are required"));
    };
    validate_password(&password)?;

    let claims = JwtKeys::from_ref(st).verify_reset(token.trim()).map_err(|e| {
        warn!(error = %e, "rejected reset token");
        AppError::InvalidOrExpiredToken
    })?;

    let timeout = st.config.upstream_timeout;
    let mut user = with_deadline(timeout, st.users.find_by_id(claims.sub))
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let now = OffsetDateTime::now_utc();
    let still_pending = user.reset_token.as_deref() == Some(token.trim())
        && user.reset_expires_at.is_some_and(|exp| exp > now);
    if !still_pending {
        warn!(user_id = %user.id, "reset token already used or superseded");
        return Err(AppError::InvalidOrExpiredToken);
    }

    user.password_hash = hash_password(&password)?;
    user.reset_token = None;
    user.reset_expires_at = None;
    user.updated_at = now;
    with_deadline(timeout, st.users.save(&user)).await?;
    info!(user_id = %user.id, "password reset completed");
    Ok(())
}

pub async fn verify_email(st: &AppState, token: Option<String>) -> AppResult<()> {
    let token = token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidOrExpiredToken)?;

    let timeout = st.config.upstream_timeout;
    let mut user = with_deadline(timeout, st.users.find_by_verification_token(&token))
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    let now = OffsetDateTime::now_utc();
    if !user.verification_expires_at.is_some_and(|exp| exp > now) {
        warn!(user_id = %user.id, "verification token expired");
        return Err(AppError::InvalidOrExpiredToken);
    }

    user.email_verified = true;
    user.verification_token = None;
    user.verification_expires_at = None;
    user.updated_at = now;
    with_deadline(timeout, st.users.save(&user)).await?;
    info!(user_id = %user.id, "email verified");
    Ok(())
}

pub async fn get_profile(st: &AppState, user_id: Uuid) -> AppResult<User> {
    with_deadline(st.config.upstream_timeout, st.users.find_by_id(user_id))
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))
}

pub async fn update_profile(
    st: &AppState,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    let mut user = get_profile(st, user_id).await?;

    for (field, value, target) in [
        ("first_name", req.first_name, &mut user.first_name),
        ("last_name", req.last_name, &mut user.last_name),
        ("phone", req.phone, &mut user.phone),
    ] {
        if let Some(v) = value {
            let v = v.trim();
            if v.is_empty() {
                return Err(AppError::validation(format!("{field} cannot be empty")));
            }
            *target = v.to_string();
        }
    }
    if let Some(bio) = req.bio {
        check_max_len("bio", Some(bio.trim()), MAX_BIO_LEN)?;
        user.bio = trimmed(Some(bio));
    }
    if let Some(experience) = req.experience {
        check_max_len("experience", Some(experience.trim()), MAX_EXPERIENCE_LEN)?;
        user.experience = trimmed(Some(experience));
    }
    if let Some(a) = req.availability {
        check_availability(&a)?;
        user.availability = Some(Json(a));
    }
    if let Some(url) = req.profile_picture {
        check_max_len("profile_picture", Some(url.trim()), MAX_PICTURE_URL_LEN)?;
        user.profile_picture = trimmed(Some(url));
    }
    user.updated_at = OffsetDateTime::now_utc();

    with_deadline(st.config.upstream_timeout, st.users.save(&user)).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(user)
}

/// Only the role differs between owner and boarder sign-up.
pub fn force_role(mut req: RegisterRequest, role: Role) -> RegisterRequest {
    req.role = Some(role);
    req
}
