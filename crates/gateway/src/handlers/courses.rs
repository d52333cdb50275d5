//! Course listing
//!
//! Public: registration offers the course choices before any account exists.

use axum::{extract::State, Json};
use learntrack_common::{db::models::Course, db::Repository, errors::Result};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            name: course.name,
        }
    }
}

/// List all courses
pub async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseResponse>>> {
    let courses = Repository::new(state.db.clone()).list_courses().await?;
    Ok(Json(courses.into_iter().map(Into::into).collect()))
}
