//! Shared helpers for tests that drive the full router against Postgres.
//!
//! Those tests use `#[sqlx::test]` (a fresh migrated database per test) and are
//! ignored by default; run them with `DATABASE_URL` set and `cargo test -- --ignored`.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use crate::{app::build_app, notify::ResetNotifier, state::AppState};

/// Keeps every reset link instead of delivering it.
#[derive(Default)]
pub struct CapturedResets {
    urls: Mutex<Vec<String>>,
}

impl CapturedResets {
    pub fn last_token(&self) -> Option<String> {
        let urls = self.urls.lock().unwrap_or_else(PoisonError::into_inner);
        urls.last()
            .and_then(|url| url.rsplit('/').next())
            .map(str::to_string)
    }
}

#[async_trait]
impl ResetNotifier for CapturedResets {
    async fn send_reset(&self, _email: &str, reset_url: &str) -> anyhow::Result<()> {
        self.urls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reset_url.to_string());
        Ok(())
    }
}

pub struct TestApp {
    router: Router,
    pub resets: Arc<CapturedResets>,
}

impl TestApp {
    pub fn new(db: PgPool) -> Self {
        let resets = Arc::new(CapturedResets::default());
        let state = AppState::fake_with_pool(db, resets.clone());
        Self {
            router: build_app(state),
            resets,
        }
    }

    /// Sends one request under `/api/v1`. The body is `Null` when the response is empty.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(format!("/api/v1{path}"));
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Registers `email` with a fixed password and returns the issued token.
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"name": "Ms. Rivera", "email": email, "password": "first-password"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a student for the token's owner and returns its id.
    pub async fn student(&self, token: &str, first_name: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/students",
                Some(token),
                Some(json!({"first_name": first_name, "last_name": "Lopez"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}
