use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Deserialize;

use super::error::ApiError;
use crate::config::Config;
use crate::pagination::{PageRequest, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};
use crate::store::StoreError;

#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(conn: Connection, config: Config) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs a store call on the blocking pool while holding the connection.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ApiError::internal("database connection lock poisoned"))?;
            f(&conn).map_err(ApiError::from)
        })
        .await
        .map_err(|e| ApiError::internal(format!("database task failed: {e}")))?
    }
}

/// Query string shared by the list endpoints. Filters a resource does not
/// support are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page_number: Option<i64>,
    pub page_size: Option<i64>,
    pub search_string: Option<String>,
    pub department_id: Option<i64>,
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
}

impl ListQuery {
    pub fn page_request(&self) -> Result<PageRequest, ApiError> {
        let request = PageRequest::new(
            self.page_number.unwrap_or(DEFAULT_PAGE_NUMBER),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )?;
        Ok(request)
    }

    pub fn search(&self) -> Option<String> {
        self.search_string
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_paging_uses_defaults() {
        let page = ListQuery::default().page_request().expect("defaults");
        assert_eq!((page.page_number(), page.page_size()), (1, 10));
    }

    #[test]
    fn blank_search_is_no_search() {
        let query = ListQuery {
            search_string: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.search(), None);
    }
}
