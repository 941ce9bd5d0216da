use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use super::created;
use crate::http::error::{ApiError, ApiResult};
use crate::http::types::{AppState, ListQuery};
use crate::pagination::Page;
use crate::store::enrollments::{
    self, Enrollment, EnrollmentChanges, EnrollmentFilter, NewEnrollment,
};
use crate::store::Entity;

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Enrollment>>> {
    let Query(query) = query?;
    let page = query.page_request()?;
    let filter = EnrollmentFilter {
        student_id: query.student_id,
        course_id: query.course_id,
    };
    let enrollments = state
        .run(move |conn| enrollments::list(conn, page, filter))
        .await?;
    Ok(Json(enrollments))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Enrollment>> {
    let Path(id) = id?;
    let enrollment = state.run(move |conn| enrollments::get(conn, id)).await?;
    Ok(Json(enrollment))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewEnrollment>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let enrollment = state
        .run(move |conn| enrollments::create(conn, &input))
        .await?;
    Ok(created(
        format!("/api/enrollments/{}", enrollment.enrollment_id),
        enrollment,
    ))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<EnrollmentChanges>, JsonRejection>,
) -> ApiResult<Json<Enrollment>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let enrollment = state
        .run(move |conn| enrollments::update(conn, id, &input))
        .await?;
    Ok(Json(enrollment))
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if state.run(move |conn| enrollments::delete(conn, id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(Entity::Enrollment, id))
    }
}
