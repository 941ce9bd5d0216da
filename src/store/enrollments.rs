use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{exists, Entity, StoreError};
use crate::concurrency::{self, RowVersion};
use crate::pagination::{Page, PageRequest};
use crate::validation::FieldErrors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            _ => Err(()),
        }
    }
}

impl ToSql for Grade {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Text(self.as_str().as_bytes())))
    }
}

impl FromSql for Grade {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|_| FromSqlError::InvalidType)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub enrollment_id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub student_id: i64,
    pub student_name: String,
    pub grade: Option<Grade>,
    pub row_version: RowVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEnrollment {
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub student_id: Option<i64>,
    #[serde(default)]
    pub grade: Option<String>,
}

/// Only the grade of an enrollment can change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentChanges {
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub row_version: Option<RowVersion>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnrollmentFilter {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
}

/// Blank means "no grade yet".
fn parse_grade(errors: &mut FieldErrors, raw: Option<&str>) -> Option<Grade> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse() {
        Ok(grade) => Some(grade),
        Err(()) => {
            errors.add("grade", "Grade must be one of A, B, C, D or F");
            None
        }
    }
}

const SELECT_ENROLLMENT: &str = "SELECT
       e.id,
       e.course_id,
       COALESCE(c.title, 'Unknown'),
       e.student_id,
       COALESCE(s.last_name || ', ' || s.first_mid_name, 'Unknown'),
       e.grade,
       e.row_version
     FROM enrollments e
     LEFT JOIN courses c ON c.id = e.course_id
     LEFT JOIN students s ON s.id = e.student_id";

fn row_to_enrollment(row: &Row) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        enrollment_id: row.get(0)?,
        course_id: row.get(1)?,
        course_title: row.get(2)?,
        student_id: row.get(3)?,
        student_name: row.get(4)?,
        grade: row.get(5)?,
        row_version: row.get(6)?,
    })
}

pub fn list(
    conn: &Connection,
    page: PageRequest,
    filter: EnrollmentFilter,
) -> Result<Page<Enrollment>, StoreError> {
    let clause = "WHERE (?1 IS NULL OR e.student_id = ?1) AND (?2 IS NULL OR e.course_id = ?2)";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM enrollments e {}", clause),
        (filter.student_id, filter.course_id),
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} {} ORDER BY e.id LIMIT ?3 OFFSET ?4",
        SELECT_ENROLLMENT, clause
    ))?;
    let enrollments = stmt
        .query_map(
            (
                filter.student_id,
                filter.course_id,
                page.limit(),
                page.offset(),
            ),
            row_to_enrollment,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(enrollments, total, page))
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Enrollment>, StoreError> {
    let enrollment = conn
        .query_row(
            &format!("{} WHERE e.id = ?", SELECT_ENROLLMENT),
            [id],
            row_to_enrollment,
        )
        .optional()?;
    Ok(enrollment)
}

pub fn get(conn: &Connection, id: i64) -> Result<Enrollment, StoreError> {
    find(conn, id)?.ok_or(StoreError::NotFound {
        entity: Entity::Enrollment,
        id,
    })
}

pub fn create(conn: &Connection, input: &NewEnrollment) -> Result<Enrollment, StoreError> {
    let tx = conn.unchecked_transaction()?;

    let mut errors = FieldErrors::new();
    match input.course_id {
        None => errors.add("courseId", "Course is required"),
        Some(id) => {
            if !exists(&tx, Entity::Course, id)? {
                errors.add("courseId", format!("Course with ID {id} does not exist"));
            }
        }
    }
    match input.student_id {
        None => errors.add("studentId", "Student is required"),
        Some(id) => {
            if !exists(&tx, Entity::Student, id)? {
                errors.add("studentId", format!("Student with ID {id} does not exist"));
            }
        }
    }
    let grade = parse_grade(&mut errors, input.grade.as_deref());
    errors.into_result()?;
    let course_id = input.course_id.unwrap_or_default();
    let student_id = input.student_id.unwrap_or_default();

    let already: Option<i64> = tx
        .query_row(
            "SELECT id FROM enrollments WHERE student_id = ? AND course_id = ?",
            (student_id, course_id),
            |r| r.get(0),
        )
        .optional()?;
    if let Some(existing) = already {
        return Err(StoreError::Duplicate(format!(
            "Student {student_id} is already enrolled in course {course_id} (enrollment {existing})"
        )));
    }

    let version = concurrency::next_row_version(&tx)?;
    tx.execute(
        "INSERT INTO enrollments(course_id, student_id, grade, row_version) VALUES(?, ?, ?, ?)",
        (course_id, student_id, grade, version),
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(enrollment_id = id, student_id, course_id, "created enrollment");
    get(conn, id)
}

pub fn update(
    conn: &Connection,
    id: i64,
    input: &EnrollmentChanges,
) -> Result<Enrollment, StoreError> {
    let mut errors = FieldErrors::new();
    let grade = parse_grade(&mut errors, input.grade.as_deref());
    errors.into_result()?;

    let tx = conn.unchecked_transaction()?;
    let expected =
        concurrency::expected_row_version(&tx, Entity::Enrollment, id, input.row_version)?;
    let fresh = concurrency::next_row_version(&tx)?;
    let changed = tx.execute(
        "UPDATE enrollments SET grade = ?, row_version = ? WHERE id = ? AND row_version = ?",
        (grade, fresh, id, expected),
    )?;
    concurrency::confirm_update(&tx, Entity::Enrollment, id, changed)?;
    tx.commit()?;

    tracing::info!(enrollment_id = id, grade = ?grade, "updated enrollment");
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let changed = conn.execute("DELETE FROM enrollments WHERE id = ?", [id])?;
    if changed > 0 {
        tracing::info!(enrollment_id = id, "deleted enrollment");
    }
    Ok(changed > 0)
}
