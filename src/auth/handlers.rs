use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        cookies::{build_session_cookie, clear_session_cookie},
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, ResetPasswordRequest, UpdateProfileRequest, UserResponse,
            VerifyEmailRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        repo_types::Role,
        services::{self, Session, RESET_REQUESTED_MESSAGE},
    },
    error::AppResult,
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/register/boarder", post(register_boarder))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/check", get(check))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/verify-email", post(verify_email))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

fn session_cookie(state: &AppState, token: &str) -> String {
    let keys = JwtKeys::from_ref(state);
    build_session_cookie(token, keys.session_ttl.as_secs(), state.config.cookie_secure)
}

fn session_response(state: &AppState, status: StatusCode, session: Session) -> impl IntoResponse {
    let cookie = session_cookie(state, &session.token);
    (
        status,
        [(SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            token: session.token,
            user: PublicUser::from(&session.user),
        }),
    )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let session = services::register(&state, payload).await?;
    Ok(session_response(&state, StatusCode::CREATED, session))
}

#[instrument(skip(state, payload))]
pub async fn register_boarder(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let session = services::register(&state, services::force_role(payload, Role::Boarder)).await?;
    Ok(session_response(&state, StatusCode::CREATED, session))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let session = services::login(&state, &payload.email, &payload.password).await?;
    Ok(session_response(&state, StatusCode::OK, session))
}

/// Idempotent: clears the cookie whether or not a session exists.
#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_session_cookie(state.config.cookie_secure))],
        Json(MessageResponse::ok("Logged out successfully")),
    )
}

#[instrument(skip(state))]
pub async fn check(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UserResponse>> {
    let user = services::get_profile(&state, user_id).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::request_password_reset(&state, payload.email).await?;
    Ok(Json(MessageResponse::ok(RESET_REQUESTED_MESSAGE)))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::confirm_password_reset(&state, payload.token, payload.password).await?;
    Ok(Json(MessageResponse::ok("Password reset successful")))
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::verify_email(&state, payload.token).await?;
    Ok(Json(MessageResponse::ok("Email verified successfully")))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UserResponse>> {
    let user = services::get_profile(&state, user_id).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = services::update_profile(&state, user_id, payload).await?;
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    type Meta = (u16, Option<String>);

    async fn send(app: axum::Router, req: Request<Body>) -> (Meta, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        ((status.as_u16(), cookie), body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn owner(email: &str) -> Value {
        json!({
            "role": "owner",
            "email": email,
            "password": "goodboy123",
            "first_name": "Jane",
            "last_name": "Doe",
            "phone": "5551234567"
        })
    }

    #[tokio::test]
    async fn register_returns_201_profile_without_secrets() {
        let app = build_app(AppState::fake());
        let ((status, cookie), body) =
            send(app, post_json("/api/v1/auth/register", owner("jane@example.com"))).await;

        assert_eq!(status, 201);
        assert!(cookie.unwrap().starts_with("session="));
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "jane@example.com");
        assert_eq!(body["user"]["role"], "owner");
        assert_eq!(body["user"]["email_verified"], false);
        assert!(body["user"].get("password_hash").is_none());
        assert!(body["user"].get("verification_token").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_400() {
        let app = build_app(AppState::fake());
        let (first, _) = send(
            app.clone(),
            post_json("/api/v1/auth/register", owner("dup@example.com")),
        )
        .await;
        assert_eq!(first.0, 201);

        let ((status, _), body) =
            send(app, post_json("/api/v1/auth/register", owner("dup@example.com"))).await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "DUPLICATE_ACCOUNT");
    }

    #[tokio::test]
    async fn boarder_route_forces_role() {
        let app = build_app(AppState::fake());
        let mut payload = owner("walker@example.com");
        payload["experience"] = json!("Ten years of dog walking");
        let ((status, _), body) =
            send(app, post_json("/api/v1/auth/register/boarder", payload)).await;
        assert_eq!(status, 201);
        assert_eq!(body["user"]["role"], "boarder");
    }

    #[tokio::test]
    async fn login_failures_are_uniform_401() {
        let app = build_app(AppState::fake());
        send(
            app.clone(),
            post_json("/api/v1/auth/register", owner("jane@example.com")),
        )
        .await;

        let ((s1, _), b1) = send(
            app.clone(),
            post_json(
                "/api/v1/auth/login",
                json!({"email": "ghost@example.com", "password": "goodboy123"}),
            ),
        )
        .await;
        let ((s2, _), b2) = send(
            app,
            post_json(
                "/api/v1/auth/login",
                json!({"email": "jane@example.com", "password": "wrongpass1"}),
            ),
        )
        .await;
        assert_eq!((s1, s2), (401, 401));
        assert_eq!(b1, b2);
    }

    #[tokio::test]
    async fn session_cookie_authenticates_check_and_logout_clears_it() {
        let app = build_app(AppState::fake());
        let ((_, cookie), _) = send(
            app.clone(),
            post_json("/api/v1/auth/register", owner("jane@example.com")),
        )
        .await;
        let pair = cookie.unwrap().split(';').next().unwrap().to_string();

        let ((status, _), body) = send(
            app.clone(),
            Request::get("/api/v1/auth/check")
                .header(header::COOKIE, pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["user"]["email"], "jane@example.com");

        let ((status, _), _) = send(
            app.clone(),
            Request::get("/api/v1/auth/check").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, 401);

        let ((status, cleared), _) = send(
            app,
            Request::post("/api/v1/auth/logout").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, 200);
        assert!(cleared.unwrap().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn forgot_password_response_does_not_reveal_account() {
        let app = build_app(AppState::fake());
        send(
            app.clone(),
            post_json("/api/v1/auth/register", owner("jane@example.com")),
        )
        .await;

        let known = send(
            app.clone(),
            post_json("/api/v1/auth/forgot-password", json!({"email": "jane@example.com"})),
        )
        .await;
        let unknown = send(
            app.clone(),
            post_json("/api/v1/auth/forgot-password", json!({"email": "ghost@example.com"})),
        )
        .await;
        assert_eq!(known.0 .0, 200);
        assert_eq!(known, unknown);

        let ((status, _), _) =
            send(app, post_json("/api/v1/auth/forgot-password", json!({}))).await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn bad_reset_and_verify_tokens_are_400() {
        let app = build_app(AppState::fake());
        let ((status, _), body) = send(
            app.clone(),
            post_json(
                "/api/v1/auth/reset-password",
                json!({"token": "garbage", "password": "newpass123"}),
            ),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_TOKEN");

        let ((status, _), body) = send(
            app,
            post_json("/api/v1/auth/verify-email", json!({"token": "nope"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn me_patch_ignores_non_profile_fields() {
        let app = build_app(AppState::fake());
        let (_, body) = send(
            app.clone(),
            post_json("/api/v1/auth/register", owner("jane@example.com")),
        )
        .await;
        let token = body["token"].as_str().unwrap().to_string();

        let ((status, _), body) = send(
            app,
            Request::patch("/api/v1/me")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "bio": "Loves beagles",
                        "profile_picture": "https://cdn.example.com/jane.png",
                        "email": "evil@example.com",
                        "rating": 5
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["user"]["bio"], "Loves beagles");
        assert_eq!(
            body["user"]["profile_picture"],
            "https://cdn.example.com/jane.png"
        );
        assert_eq!(body["user"]["email"], "jane@example.com");
        assert_eq!(body["user"]["rating"], 0.0);
    }

    #[tokio::test]
    async fn malformed_bodies_get_error_envelope() {
        let app = build_app(AppState::fake());
        let no_content_type = Request::post("/api/v1/auth/register")
            .body(Body::from(owner("jane@example.com").to_string()))
            .unwrap();
        let ((status, _), body) = send(app.clone(), no_content_type).await;
        assert_eq!(status, 400);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let broken = Request::post("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"email\": "))
            .unwrap();
        let ((status, _), body) = send(app, broken).await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
}
