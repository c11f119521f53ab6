use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<Date>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub notes: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Validated, writable columns of a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFields {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<Date>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub notes: Option<String>,
}

const COLUMNS: &str = "id, owner_id, first_name, last_name, birth_date, guardian_name, \
                       guardian_phone, notes, created_at, updated_at";

pub async fn list_by_owner(
    db: &PgPool,
    owner_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Student>> {
    let rows = sqlx::query_as::<_, Student>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM students
        WHERE owner_id = $1
        ORDER BY last_name, first_name, created_at
        LIMIT $2 OFFSET $3
        "#
    ))
    .bind(owner_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query_as::<_, Student>(&format!(
        "SELECT {COLUMNS} FROM students WHERE id = $1 AND owner_id = $2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn create(db: &PgPool, owner_id: Uuid, f: &StudentFields) -> anyhow::Result<Student> {
    let row = sqlx::query_as::<_, Student>(&format!(
        r#"
        INSERT INTO students
            (owner_id, first_name, last_name, birth_date, guardian_name, guardian_phone, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(owner_id)
    .bind(&f.first_name)
    .bind(&f.last_name)
    .bind(f.birth_date)
    .bind(&f.guardian_name)
    .bind(&f.guardian_phone)
    .bind(&f.notes)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    owner_id: Uuid,
    id: Uuid,
    f: &StudentFields,
) -> anyhow::Result<Option<Student>> {
    let row = sqlx::query_as::<_, Student>(&format!(
        r#"
        UPDATE students
        SET first_name = $3, last_name = $4, birth_date = $5, guardian_name = $6,
            guardian_phone = $7, notes = $8, updated_at = now()
        WHERE id = $1 AND owner_id = $2
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(owner_id)
    .bind(&f.first_name)
    .bind(&f.last_name)
    .bind(f.birth_date)
    .bind(&f.guardian_name)
    .bind(&f.guardian_phone)
    .bind(&f.notes)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Deletes the student and drops it from the owner's activities.
pub async fn delete(db: &PgPool, owner_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let mut tx = db.begin().await?;
    let deleted = sqlx::query("DELETE FROM students WHERE id = $1 AND owner_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if deleted > 0 {
        sqlx::query(
            r#"
            UPDATE activities
            SET student_ids = array_remove(student_ids, $1), updated_at = now()
            WHERE owner_id = $2 AND $1 = ANY(student_ids)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(deleted > 0)
}

/// Share-locks the caller's students among `ids` until the surrounding
/// transaction ends and returns how many were found. A concurrent delete of any
/// of them waits for the lock holder to commit.
pub async fn lock_owned(
    conn: &mut PgConnection,
    owner_id: Uuid,
    ids: &[Uuid],
) -> anyhow::Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT id FROM students WHERE owner_id = $1 AND id = ANY($2) FOR SHARE")
            .bind(owner_id)
            .bind(ids)
            .fetch_all(&mut *conn)
            .await?;
    Ok(rows.len())
}
