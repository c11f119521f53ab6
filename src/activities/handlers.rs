use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{ActivityQuery, ActivityRequest},
    repo::{self, Activity, ActivityFields},
};
use crate::{auth::AuthUser, error::ApiError, state::AppState, students};

pub fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route(
            "/activities/:id",
            get(get_activity).put(update_activity).delete(delete_activity),
        )
}

fn not_found() -> ApiError {
    ApiError::not_found("Activity not found")
}

/// Must run inside the transaction that writes the activity: the share locks
/// keep the referenced students alive until it commits.
async fn ensure_students_owned(
    conn: &mut PgConnection,
    owner_id: Uuid,
    fields: &ActivityFields,
) -> Result<(), ApiError> {
    if fields.student_ids.is_empty() {
        return Ok(());
    }
    let owned = students::repo::lock_owned(conn, owner_id, &fields.student_ids).await?;
    if owned != fields.student_ids.len() {
        warn!(%owner_id, "activity references unknown students");
        return Err(ApiError::bad_request("Unknown student in student_ids"));
    }
    Ok(())
}

#[instrument(skip(state, auth))]
pub async fn list_activities(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(q): Query<ActivityQuery>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let (limit, offset) = q.page().clamped();
    let rows = repo::list_by_owner(&state.db, auth.id(), q.student_id, limit, offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, auth))]
pub async fn get_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Activity>, ApiError> {
    let activity = repo::get(&state.db, auth.id(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(activity))
}

#[instrument(skip(state, auth, body))]
pub async fn create_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ActivityRequest>,
) -> Result<(StatusCode, Json<Activity>), ApiError> {
    let fields = body.into_fields()?;
    let mut tx = state.db.begin().await?;
    ensure_students_owned(&mut tx, auth.id(), &fields).await?;
    let activity = repo::create(&mut tx, auth.id(), &fields).await?;
    tx.commit().await?;
    info!(activity_id = %activity.id, students = activity.student_ids.len(), "activity created");
    Ok((StatusCode::CREATED, Json(activity)))
}

#[instrument(skip(state, auth, body))]
pub async fn update_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ActivityRequest>,
) -> Result<Json<Activity>, ApiError> {
    let fields = body.into_fields()?;
    let mut tx = state.db.begin().await?;
    ensure_students_owned(&mut tx, auth.id(), &fields).await?;
    let activity = repo::update(&mut tx, auth.id(), id, &fields)
        .await?
        .ok_or_else(not_found)?;
    tx.commit().await?;
    info!(activity_id = %id, "activity updated");
    Ok(Json(activity))
}

#[instrument(skip(state, auth))]
pub async fn delete_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete(&state.db, auth.id(), id).await? {
        return Err(not_found());
    }
    info!(activity_id = %id, "activity deleted");
    Ok(StatusCode::NO_CONTENT)
}
