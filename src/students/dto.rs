use serde::Deserialize;
use time::{Date, OffsetDateTime};

use super::repo::StudentFields;
use crate::error::ApiError;

/// Body of `POST /students` and `PUT /students/:id`.
#[derive(Debug, Deserialize)]
pub struct StudentRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<Date>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Blank optional text is stored as NULL.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl StudentRequest {
    pub fn into_fields(self) -> Result<StudentFields, ApiError> {
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(ApiError::bad_request("First and last name are required"));
        }
        if let Some(born) = self.birth_date {
            if born > OffsetDateTime::now_utc().date() {
                return Err(ApiError::bad_request("Birth date cannot be in the future"));
            }
        }
        Ok(StudentFields {
            first_name,
            last_name,
            birth_date: self.birth_date,
            guardian_name: non_blank(self.guardian_name),
            guardian_phone: non_blank(self.guardian_phone),
            notes: non_blank(self.notes),
        })
    }
}
