use crate::auth::repo_types::User;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, password_hash, reset_password_token, \
                            reset_password_expires, created_at, updated_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user. Returns `None` when the email is already taken.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn record_login(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = $2, reset_password_expires = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Consume a live reset token: store the new hash and clear the token in one
    /// statement. Returns the user id, or `None` when the token is unknown,
    /// expired, or was consumed concurrently.
    pub async fn reset_password(
        db: &PgPool,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires = NULL,
                updated_at = now()
            WHERE reset_password_token = $1
              AND reset_password_expires > now()
            RETURNING id
            "#,
        )
        .bind(token)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;
        Ok(id)
    }
}
