use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::StudentRequest,
    repo::{self, Student},
};
use crate::{auth::AuthUser, error::ApiError, pagination::Pagination, state::AppState};

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/students", get(list_students).post(create_student))
        .route(
            "/students/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
}

fn not_found() -> ApiError {
    ApiError::not_found("Student not found")
}

#[instrument(skip(state, auth))]
pub async fn list_students(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let (limit, offset) = p.clamped();
    let rows = repo::list_by_owner(&state.db, auth.id(), limit, offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state, auth))]
pub async fn get_student(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Student>, ApiError> {
    let student = repo::get(&state.db, auth.id(), id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(student))
}

#[instrument(skip(state, auth, body))]
pub async fn create_student(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StudentRequest>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let fields = body.into_fields()?;
    let student = repo::create(&state.db, auth.id(), &fields).await?;
    info!(student_id = %student.id, owner_id = %auth.id(), "student created");
    Ok((StatusCode::CREATED, Json(student)))
}

#[instrument(skip(state, auth, body))]
pub async fn update_student(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<StudentRequest>,
) -> Result<Json<Student>, ApiError> {
    let fields = body.into_fields()?;
    let student = repo::update(&state.db, auth.id(), id, &fields)
        .await?
        .ok_or_else(not_found)?;
    info!(student_id = %id, "student updated");
    Ok(Json(student))
}

#[instrument(skip(state, auth))]
pub async fn delete_student(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !repo::delete(&state.db, auth.id(), id).await? {
        return Err(not_found());
    }
    info!(student_id = %id, "student deleted");
    Ok(StatusCode::NO_CONTENT)
}
