use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;

use super::created;
use crate::http::error::{ApiError, ApiResult};
use crate::http::types::{AppState, ListQuery};
use crate::pagination::Page;
use crate::store::departments::{self, Department, DepartmentInput};
use crate::store::{DeleteCheck, Entity};

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Department>>> {
    let Query(query) = query?;
    let page = query.page_request()?;
    let search = query.search();
    let departments = state
        .run(move |conn| departments::list(conn, page, search.as_deref()))
        .await?;
    Ok(Json(departments))
}

pub async fn get(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Department>> {
    let Path(id) = id?;
    let department = state.run(move |conn| departments::get(conn, id)).await?;
    Ok(Json(department))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<DepartmentInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(input) = body?;
    let department = state.run(move |conn| departments::create(conn, &input)).await?;
    Ok(created(format!("/api/departments/{}", department.department_id), department))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<DepartmentInput>, JsonRejection>,
) -> ApiResult<Json<Department>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let department = state
        .run(move |conn| departments::update(conn, id, &input))
        .await?;
    Ok(Json(department))
}

pub async fn delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    if state.run(move |conn| departments::delete(conn, id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(Entity::Department, id))
    }
}

pub async fn can_delete(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<DeleteCheck>> {
    let Path(id) = id?;
    state
        .run(move |conn| departments::can_delete(conn, id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Entity::Department, id))
}
