use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use super::created;
use crate::http::error::{ApiError, ApiResult};
use crate::http::types::{AppState, ListQuery};
use crate::pagination::Page;
use crate::store::students::{self, Student, StudentInput};
use crate::store::{DeleteCheck, Entity};

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Student>>> {
    let Query(query) = query?;
    let page = query.page_request()?;
    let search = query.search();
    let students = state
        .run(move |conn| students::list(conn, page, search.as_deref()))
        .await?;
    Ok(Json(students))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Student>> {
    let Path(id) = id?;
    let student = state.run(move |conn| students::get(conn, id)).await?;
    Ok(Json(student))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<StudentInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let student = state.run(move |conn| students::create(conn, &input)).await?;
    Ok(created(format!("/api/students/{}", student.id), student))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<StudentInput>, JsonRejection>,
) -> ApiResult<Json<Student>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let student = state
        .run(move |conn| students::update(conn, id, &input))
        .await?;
    Ok(Json(student))
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if state.run(move |conn| students::delete(conn, id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(Entity::Student, id))
    }
}

pub async fn can_delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeleteCheck>> {
    let Path(id) = id?;
    state
        .run(move |conn| students::can_delete(conn, id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Entity::Student, id))
}
