//! Record store: plain functions over `rusqlite::Connection`, one module per
//! entity. Every function takes the connection first and returns
//! `Result<_, StoreError>`; the HTTP layer decides how errors are rendered.

pub mod courses;
pub mod departments;
pub mod enrollments;
pub mod guard;
pub mod instructors;
pub mod students;

use std::fmt;

use serde::Serialize;

use crate::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Student,
    Course,
    Department,
    Instructor,
    Enrollment,
}

impl Entity {
    pub fn table(self) -> &'static str {
        match self {
            Entity::Student => "students",
            Entity::Course => "courses",
            Entity::Department => "departments",
            Entity::Instructor => "instructors",
            Entity::Enrollment => "enrollments",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Entity::Student => "Student",
            Entity::Course => "Course",
            Entity::Department => "Department",
            Entity::Instructor => "Instructor",
            Entity::Enrollment => "Enrollment",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// The row vanished between the read and the version-guarded write.
    #[error("{entity} with ID {id} was deleted by another user")]
    Deleted { entity: Entity, id: i64 },

    #[error("The record was modified by another user. Please refresh and try again.")]
    Conflict { entity: Entity, id: i64 },

    #[error("{message}")]
    HasDependents {
        entity: Entity,
        id: i64,
        count: i64,
        message: String,
    },

    #[error("{0}")]
    Duplicate(String),

    #[error("One or more validation errors occurred.")]
    Validation(FieldErrors),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl From<FieldErrors> for StoreError {
    fn from(errors: FieldErrors) -> Self {
        StoreError::Validation(errors)
    }
}

/// Answer for the `can-delete` probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCheck {
    pub can_delete: bool,
    pub dependent_count: i64,
}

pub(crate) fn exists(conn: &rusqlite::Connection, entity: Entity, id: i64) -> rusqlite::Result<bool> {
    use rusqlite::OptionalExtension;
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", entity.table());
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(found.is_some())
}
