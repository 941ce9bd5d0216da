use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::ProblemDetails;
use super::types::AppState;

/// Rewrites problem-details responses: `instance` becomes the request path,
/// and server-fault details are replaced with a generic message unless the
/// process runs in development mode.
pub async fn problem_details(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    let Some(problem) = response.extensions().get::<ProblemDetails>().cloned() else {
        return response;
    };
    let mut problem = problem.at(path);
    if !state.config().is_development() {
        problem = problem.masked();
    }

    problem.into_response()
}
