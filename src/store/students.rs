use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{guard, DeleteCheck, Entity, StoreError};
use crate::concurrency::{self, RowVersion};
use crate::dates;
use crate::pagination::{like_pattern, Page, PageRequest};
use crate::validation::{FieldErrors, NAME_MAX_CHARS};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub last_name: String,
    pub first_mid_name: String,
    pub enrollment_date: NaiveDate,
    pub full_name: String,
    pub enrollment_count: i64,
    pub row_version: RowVersion,
}

/// Body of `POST /api/students` and `PUT /api/students/{id}`. `rowVersion` is
/// only read on update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_mid_name: String,
    #[serde(default, deserialize_with = "dates::deserialize_optional")]
    pub enrollment_date: Option<NaiveDate>,
    #[serde(default)]
    pub row_version: Option<RowVersion>,
}

struct Fields<'a> {
    last_name: &'a str,
    first_mid_name: &'a str,
    enrollment_date: NaiveDate,
}

impl StudentInput {
    fn validate(&self) -> Result<Fields<'_>, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.require_text("lastName", "Last name", &self.last_name, NAME_MAX_CHARS);
        errors.require_text("firstMidName", "First name", &self.first_mid_name, NAME_MAX_CHARS);
        errors.require("enrollmentDate", "Enrollment date", self.enrollment_date.as_ref());
        errors.into_result()?;
        Ok(Fields {
            last_name: self.last_name.trim(),
            first_mid_name: self.first_mid_name.trim(),
            enrollment_date: self.enrollment_date.unwrap_or_default(),
        })
    }
}

const SELECT_STUDENT: &str = "SELECT
       s.id,
       s.last_name,
       s.first_mid_name,
       s.enrollment_date,
       s.row_version,
       (SELECT COUNT(*) FROM enrollments e WHERE e.student_id = s.id) AS enrollment_count
     FROM students s";

fn row_to_student(row: &Row) -> rusqlite::Result<Student> {
    let last_name: String = row.get(1)?;
    let first_mid_name: String = row.get(2)?;
    Ok(Student {
        id: row.get(0)?,
        full_name: format!("{}, {}", last_name, first_mid_name),
        last_name,
        first_mid_name,
        enrollment_date: row.get(3)?,
        row_version: row.get(4)?,
        enrollment_count: row.get(5)?,
    })
}

pub fn list(
    conn: &Connection,
    page: PageRequest,
    search: Option<&str>,
) -> Result<Page<Student>, StoreError> {
    let pattern = like_pattern(search);
    let filter = "WHERE (?1 IS NULL OR s.last_name LIKE ?1 ESCAPE '\\' OR s.first_mid_name LIKE ?1 ESCAPE '\\')";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM students s {}", filter),
        [&pattern],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} {} ORDER BY s.last_name, s.first_mid_name, s.id LIMIT ?2 OFFSET ?3",
        SELECT_STUDENT, filter
    ))?;
    let students = stmt
        .query_map((&pattern, page.limit(), page.offset()), row_to_student)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(students, total, page))
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Student>, StoreError> {
    let student = conn
        .query_row(
            &format!("{} WHERE s.id = ?", SELECT_STUDENT),
            [id],
            row_to_student,
        )
        .optional()?;
    Ok(student)
}

pub fn get(conn: &Connection, id: i64) -> Result<Student, StoreError> {
    find(conn, id)?.ok_or(StoreError::NotFound {
        entity: Entity::Student,
        id,
    })
}

pub fn create(conn: &Connection, input: &StudentInput) -> Result<Student, StoreError> {
    let fields = input.validate()?;

    let tx = conn.unchecked_transaction()?;
    let version = concurrency::next_row_version(&tx)?;
    tx.execute(
        "INSERT INTO students(last_name, first_mid_name, enrollment_date, row_version)
         VALUES(?, ?, ?, ?)",
        (
            fields.last_name,
            fields.first_mid_name,
            fields.enrollment_date,
            version,
        ),
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(
        student_id = id,
        last_name = fields.last_name,
        first_name = fields.first_mid_name,
        "created student"
    );
    get(conn, id)
}

pub fn update(conn: &Connection, id: i64, input: &StudentInput) -> Result<Student, StoreError> {
    let fields = input.validate()?;

    let tx = conn.unchecked_transaction()?;
    let expected = concurrency::expected_row_version(&tx, Entity::Student, id, input.row_version)?;
    let fresh = concurrency::next_row_version(&tx)?;
    let changed = tx.execute(
        "UPDATE students
         SET last_name = ?, first_mid_name = ?, enrollment_date = ?, row_version = ?
         WHERE id = ? AND row_version = ?",
        (
            fields.last_name,
            fields.first_mid_name,
            fields.enrollment_date,
            fresh,
            id,
            expected,
        ),
    )?;
    concurrency::confirm_update(&tx, Entity::Student, id, changed)?;
    tx.commit()?;

    tracing::info!(student_id = id, "updated student");
    get(conn, id)
}

/// Deletes a student with no enrollments. `Ok(false)` if there was no such
/// student.
pub fn delete(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let Some(student) = find(conn, id)? else {
        return Ok(false);
    };

    let tx = conn.unchecked_transaction()?;
    guard::ensure_no_dependents(&tx, Entity::Student, id, &student.full_name)?;
    tx.execute("DELETE FROM students WHERE id = ?", [id])?;
    tx.commit()?;

    tracing::info!(student_id = id, full_name = %student.full_name, "deleted student");
    Ok(true)
}

pub fn can_delete(conn: &Connection, id: i64) -> Result<Option<DeleteCheck>, StoreError> {
    guard::check(conn, Entity::Student, id)
}
