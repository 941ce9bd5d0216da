//! REST surface over the record store.

mod error;
mod handlers;
mod problem;
mod router;
mod types;

pub use error::{ApiError, ApiResult, ErrorCode, ProblemDetails};
pub use router::router;
pub use types::{AppState, ListQuery};
