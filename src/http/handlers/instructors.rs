use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use super::created;
use crate::http::error::{ApiError, ApiResult};
use crate::http::types::{AppState, ListQuery};
use crate::pagination::Page;
use crate::store::instructors::{self, Instructor, InstructorInput};
use crate::store::Entity;

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Instructor>>> {
    let Query(query) = query?;
    let page = query.page_request()?;
    let search = query.search();
    let instructors = state
        .run(move |conn| instructors::list(conn, page, search.as_deref()))
        .await?;
    Ok(Json(instructors))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Instructor>> {
    let Path(id) = id?;
    let instructor = state.run(move |conn| instructors::get(conn, id)).await?;
    Ok(Json(instructor))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<InstructorInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let instructor = state
        .run(move |conn| instructors::create(conn, &input))
        .await?;
    Ok(created(format!("/api/instructors/{}", instructor.id), instructor))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<InstructorInput>, JsonRejection>,
) -> ApiResult<Json<Instructor>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let instructor = state
        .run(move |conn| instructors::update(conn, id, &input))
        .await?;
    Ok(Json(instructor))
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if state.run(move |conn| instructors::delete(conn, id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(Entity::Instructor, id))
    }
}
