use brightsteps::{app, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "brightsteps=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = match AppState::init().await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = ?e, "startup failed");
            std::process::exit(1);
        }
    };

    if app_state.config.jwt.secret.is_none() {
        tracing::warn!("JWT_SECRET is not set; authenticated routes will fail");
    }

    if let Err(e) = db::migrate(&app_state.db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    app::serve(app::build_app(app_state)).await
}
