use serde::Deserialize;
use time::Date;
use uuid::Uuid;

use super::repo::ActivityFields;
use crate::{
    error::ApiError,
    pagination::{default_limit, Pagination},
    students::dto::non_blank,
};

#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_for: Date,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
}

impl ActivityRequest {
    /// Validates the body; ownership of `student_ids` is checked by the handler.
    pub fn into_fields(self) -> Result<ActivityFields, ApiError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::bad_request("Title is required"));
        }
        if matches!(self.duration_minutes, Some(m) if m <= 0) {
            return Err(ApiError::bad_request("Duration must be positive"));
        }
        let mut student_ids = Vec::with_capacity(self.student_ids.len());
        for id in self.student_ids {
            if !student_ids.contains(&id) {
                student_ids.push(id);
            }
        }
        Ok(ActivityFields {
            title,
            description: non_blank(self.description),
            scheduled_for: self.scheduled_for,
            duration_minutes: self.duration_minutes,
            student_ids,
        })
    }
}

/// Query of `GET /activities`.
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub student_id: Option<Uuid>,
}

impl ActivityQuery {
    pub fn page(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }
}
