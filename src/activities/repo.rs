use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Activity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_for: Date,
    pub duration_minutes: Option<i32>,
    pub student_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityFields {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_for: Date,
    pub duration_minutes: Option<i32>,
    pub student_ids: Vec<Uuid>,
}

const COLUMNS: &str = "id, owner_id, title, description, scheduled_for, duration_minutes, \
                       student_ids, created_at, updated_at";

pub async fn list_by_owner(
    db: &PgPool,
    owner_id: Uuid,
    student_id: Option<Uuid>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Activity>> {
    let rows = sqlx::query_as::<_, Activity>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM activities
        WHERE owner_id = $1 AND ($2::uuid IS NULL OR $2 = ANY(student_ids))
        ORDER BY scheduled_for DESC, created_at DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(owner_id)
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Activity>> {
    let row = sqlx::query_as::<_, Activity>(&format!(
        "SELECT {COLUMNS} FROM activities WHERE id = $1 AND owner_id = $2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn create(
    conn: &mut PgConnection,
    owner_id: Uuid,
    f: &ActivityFields,
) -> anyhow::Result<Activity> {
    let row = sqlx::query_as::<_, Activity>(&format!(
        r#"
        INSERT INTO activities
            (owner_id, title, description, scheduled_for, duration_minutes, student_ids)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(owner_id)
    .bind(&f.title)
    .bind(&f.description)
    .bind(f.scheduled_for)
    .bind(f.duration_minutes)
    .bind(&f.student_ids)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn update(
    conn: &mut PgConnection,
    owner_id: Uuid,
    id: Uuid,
    f: &ActivityFields,
) -> anyhow::Result<Option<Activity>> {
    let row = sqlx::query_as::<_, Activity>(&format!(
        r#"
        UPDATE activities
        SET title = $3, description = $4, scheduled_for = $5, duration_minutes = $6,
            student_ids = $7, updated_at = now()
        WHERE id = $1 AND owner_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(owner_id)
    .bind(&f.title)
    .bind(&f.description)
    .bind(f.scheduled_for)
    .bind(f.duration_minutes)
    .bind(&f.student_ids)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM activities WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
