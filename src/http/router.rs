use axum::routing::get;
use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{core, courses, departments, enrollments, instructors, students};
use super::problem::problem_details;
use super::types::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/students", get(students::list).post(students::create))
        .route(
            "/students/:id",
            get(students::get)
                .put(students::update)
                .delete(students::delete),
        )
        .route("/students/:id/can-delete", get(students::can_delete))
        .route("/courses", get(courses::list).post(courses::create))
        .route(
            "/courses/:id",
            get(courses::get).put(courses::update).delete(courses::delete),
        )
        .route("/courses/:id/can-delete", get(courses::can_delete))
        .route("/departments", get(departments::list).post(departments::create))
        .route(
            "/departments/:id",
            get(departments::get)
                .put(departments::update)
                .delete(departments::delete),
        )
        .route("/departments/:id/can-delete", get(departments::can_delete))
        .route("/instructors", get(instructors::list).post(instructors::create))
        .route(
            "/instructors/:id",
            get(instructors::get)
                .put(instructors::update)
                .delete(instructors::delete),
        )
        .route("/enrollments", get(enrollments::list).post(enrollments::create))
        .route(
            "/enrollments/:id",
            get(enrollments::get)
                .put(enrollments::update)
                .delete(enrollments::delete),
        );

    Router::new()
        .route("/health", get(core::health))
        .nest("/api", api)
        .fallback(core::fallback)
        .layer(middleware::from_fn_with_state(state.clone(), problem_details))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
