use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use super::created;
use crate::http::error::{ApiError, ApiResult};
use crate::http::types::{AppState, ListQuery};
use crate::pagination::Page;
use crate::store::courses::{self, Course, CourseChanges, CourseFilter, NewCourse};
use crate::store::{DeleteCheck, Entity};

/// Supports `searchString` (title) and `departmentId`.
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Course>>> {
    let Query(query) = query?;
    let page = query.page_request()?;
    let filter = CourseFilter {
        search: query.search(),
        department_id: query.department_id,
    };
    let courses = state
        .run(move |conn| courses::list(conn, page, &filter))
        .await?;
    Ok(Json(courses))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Course>> {
    let Path(id) = id?;
    let course = state.run(move |conn| courses::get(conn, id)).await?;
    Ok(Json(course))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewCourse>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let course = state.run(move |conn| courses::create(conn, &input)).await?;
    Ok(created(format!("/api/courses/{}", course.course_id), course))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CourseChanges>, JsonRejection>,
) -> ApiResult<Json<Course>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let course = state
        .run(move |conn| courses::update(conn, id, &input))
        .await?;
    Ok(Json(course))
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if state.run(move |conn| courses::delete(conn, id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(Entity::Course, id))
    }
}

pub async fn can_delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeleteCheck>> {
    let Path(id) = id?;
    state
        .run(move |conn| courses::can_delete(conn, id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Entity::Course, id))
}
