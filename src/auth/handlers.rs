use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        claims::Claims,
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, PublicUser,
            RegisterRequest, ResetPasswordRequest,
        },
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo_types::User,
        services::{check_password, generate_reset_token, normalize_email, RESET_TOKEN_TTL},
    },
    error::ApiError,
    state::AppState,
};

const RESET_REQUESTED: &str = "If that email is registered, a reset link is on its way";

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me))
        .route("/auth/verify", get(verify))
}

fn issue(state: &AppState, user: User) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id, &user.email, &user.name)?;
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    let email = normalize_email(&payload.email)?;
    check_password(&payload.password)?;

    let hash = hash_password(&payload.password)?;
    let Some(user) = User::create(&state.db, name, &email, &hash).await? else {
        warn!(%email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    };

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, issue(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&payload.email)?;
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let Some(user) = User::find_by_email(&state.db, &email).await? else {
        warn!(%email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    if let Err(e) = User::record_login(&state.db, user.id).await {
        warn!(error = %e, user_id = %user.id, "failed to record login");
    }

    info!(user_id = %user.id, %email, "user logged in");
    issue(&state, user)
}

#[instrument(skip(state, auth))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user_id = auth.id();
    let user = User::find_by_id(&state.db, user_id).await?.ok_or_else(|| {
        error!(%user_id, "token subject has no user record");
        ApiError::Unauthorized("User not found".into())
    })?;
    Ok(Json(user.into()))
}

pub async fn verify(AuthUser(claims): AuthUser) -> Json<Claims> {
    Json(claims)
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let email = normalize_email(&payload.email)?;

    if let Some(user) = User::find_by_email(&state.db, &email).await? {
        let token = generate_reset_token();
        let expires = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
        User::set_reset_token(&state.db, user.id, &token, expires).await?;

        let url = format!("{}/reset-password/{}", state.config.site_url, token);
        if let Err(e) = state.notifier.send_reset(&user.email, &url).await {
            error!(error = %e, user_id = %user.id, "failed to deliver reset link");
        }
        info!(user_id = %user.id, "password reset requested");
    } else {
        warn!(%email, "password reset for unknown email");
    }

    Ok((StatusCode::ACCEPTED, Json(MessageResponse::new(RESET_REQUESTED))))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    check_password(&payload.password)?;
    let invalid = || ApiError::bad_request("Password reset token is invalid or has expired");

    let token = payload.token.trim();
    if token.is_empty() {
        return Err(invalid());
    }

    let hash = hash_password(&payload.password)?;
    let user_id = User::reset_password(&state.db, token, &hash)
        .await?
        .ok_or_else(|| {
            warn!("reset token unknown, expired or already used");
            invalid()
        })?;

    info!(%user_id, "password reset completed");
    Ok(Json(MessageResponse::new("Password has been reset")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SIGN_IN_AGAIN, test_support::TestApp};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
        Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app(state: AppState) -> Router {
        Router::new()
            .merge(auth_routes())
            .merge(me_routes())
            .with_state(state)
    }

    async fn body_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn verify_without_token_asks_to_sign_in_again() {
        let res = app(AppState::fake())
            .oneshot(Request::get("/auth/verify").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["error"], SIGN_IN_AGAIN);
    }

    #[tokio::test]
    async fn verify_echoes_claims_for_valid_token() {
        let state = AppState::fake();
        let user_id = Uuid::new_v4();
        let token = JwtKeys::from_ref(&state)
            .sign(user_id, "a@b.co", "A")
            .unwrap();
        let res = app(state)
            .oneshot(
                Request::get("/auth/verify")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = body_json(res).await;
        assert_eq!(json["sub"], user_id.to_string());
        assert_eq!(json["email"], "a@b.co");
    }

    #[tokio::test]
    async fn verify_rejects_foreign_scheme_and_bad_token() {
        for value in ["Basic dXNlcjpwYXNz", "Bearer abc123"] {
            let res = app(AppState::fake())
                .oneshot(
                    Request::get("/auth/verify")
                        .header(header::AUTHORIZATION, value)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn missing_secret_is_a_server_fault() {
        let res = app(AppState::fake_with_secret(None))
            .oneshot(
                Request::get("/auth/verify")
                    .header(header::AUTHORIZATION, "Bearer abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(res).await["error"], "Internal server error");
    }

    #[tokio::test]
    async fn register_validates_before_touching_db() {
        let cases = [
            serde_json::json!({"name": "A", "email": "nope", "password": "long-enough"}),
            serde_json::json!({"name": "A", "email": "a@b.co", "password": "short"}),
            serde_json::json!({"name": "  ", "email": "a@b.co", "password": "long-enough"}),
        ];
        for body in cases {
            let res = app(AppState::fake())
                .oneshot(post_json("/auth/register", body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password() {
        let res = app(AppState::fake())
            .oneshot(post_json(
                "/auth/reset-password",
                serde_json::json!({"token": "x", "password": "short"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], "Password too short");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn duplicate_email_is_a_conflict(db: sqlx::PgPool) {
        let app = TestApp::new(db);
        app.register("rivera@brightsteps.test").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "name": "Someone Else",
                    "email": "  Rivera@BrightSteps.test ",
                    "password": "another-password",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Email already registered");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn reset_token_works_once(db: sqlx::PgPool) {
        let app = TestApp::new(db.clone());
        let email = "rivera@brightsteps.test";
        app.register(email).await;

        let forgot = Some(serde_json::json!({"email": email}));
        let (status, _) = app.send(Method::POST, "/auth/forgot-password", None, forgot).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let token = app.resets.last_token().expect("reset link delivered");

        let reset = serde_json::json!({"token": token, "password": "second-password"});
        let (status, _) = app
            .send(Method::POST, "/auth/reset-password", None, Some(reset.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (stored,): (Option<String>,) =
            sqlx::query_as("SELECT reset_password_token FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(stored, None);

        let login = |password: &str| {
            Some(serde_json::json!({"email": email, "password": password}))
        };
        let (status, _) = app.send(Method::POST, "/auth/login", None, login("second-password")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.send(Method::POST, "/auth/login", None, login("first-password")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // a second use of the same token must not change the password again
        let replay = serde_json::json!({"token": token, "password": "third-password"});
        let (status, body) = app
            .send(Method::POST, "/auth/reset-password", None, Some(replay))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Password reset token is invalid or has expired");
        let (status, _) = app.send(Method::POST, "/auth/login", None, login("second-password")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs a Postgres DATABASE_URL"]
    async fn expired_reset_token_is_rejected(db: sqlx::PgPool) {
        let app = TestApp::new(db.clone());
        let email = "rivera@brightsteps.test";
        app.register(email).await;
        app.send(
            Method::POST,
            "/auth/forgot-password",
            None,
            Some(serde_json::json!({"email": email})),
        )
        .await;
        let token = app.resets.last_token().expect("reset link delivered");

        sqlx::query("UPDATE users SET reset_password_expires = now() - interval '1 minute'")
            .execute(&db)
            .await
            .unwrap();

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/reset-password",
                None,
                Some(serde_json::json!({"token": token, "password": "second-password"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn public_user_serialization() {
        let response = PublicUser {
            id: Uuid::new_v4(),
            name: "Ms. Rivera".into(),
            email: "rivera@brightsteps.test".into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("rivera@brightsteps.test"));
        assert!(json.contains("id"));
    }
}
