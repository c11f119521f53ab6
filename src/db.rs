use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::error::ConnectionError;

pub async fn connect(database_url: &str) -> Result<PgPool, ConnectionError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(ConnectionError)?;
    info!("database connected");
    Ok(pool)
}

/// Lazily connecting pool; nothing touches the network until the first query.
pub fn lazy(database_url: &str) -> anyhow::Result<PgPool> {
    Ok(PgPoolOptions::new().connect_lazy(database_url)?)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}
