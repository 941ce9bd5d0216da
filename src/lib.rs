pub mod concurrency;
pub mod config;
pub mod dates;
pub mod db;
pub mod http;
pub mod logging;
pub mod pagination;
pub mod store;
pub mod validation;
