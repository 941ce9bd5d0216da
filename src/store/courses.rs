use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{exists, guard, DeleteCheck, Entity, StoreError};
use crate::concurrency::{self, RowVersion};
use crate::pagination::{like_pattern, Page, PageRequest};
use crate::validation::FieldErrors;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: i64,
    pub course_number: i64,
    pub title: String,
    pub credits: i64,
    pub department_id: i64,
    pub department_name: String,
    pub enrollment_count: i64,
    pub row_version: RowVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    #[serde(default)]
    pub course_number: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub credits: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
}

/// The course number is the key and cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseChanges {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub credits: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub row_version: Option<RowVersion>,
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub search: Option<String>,
    pub department_id: Option<i64>,
}

struct Fields<'a> {
    title: &'a str,
    credits: i64,
    department_id: i64,
}

fn validate_common<'a>(
    conn: &Connection,
    errors: &mut FieldErrors,
    title: &'a str,
    credits: Option<i64>,
    department_id: Option<i64>,
) -> Result<Fields<'a>, StoreError> {
    errors.require_text_between("title", "Title", title, TITLE_MIN_CHARS, TITLE_MAX_CHARS);
    errors.require_range("credits", "Credits", credits, 0, 5);
    match department_id {
        None => errors.add("departmentId", "Department is required"),
        Some(d) => {
            if !exists(conn, Entity::Department, d)? {
                errors.add("departmentId", format!("Department with ID {d} does not exist"));
            }
        }
    }
    Ok(Fields {
        title: title.trim(),
        credits: credits.unwrap_or_default(),
        department_id: department_id.unwrap_or_default(),
    })
}

const SELECT_COURSE: &str = "SELECT
       c.id,
       c.title,
       c.credits,
       c.department_id,
       COALESCE(d.name, 'Unknown') AS department_name,
       c.row_version,
       (SELECT COUNT(*) FROM enrollments e WHERE e.course_id = c.id) AS enrollment_count
     FROM courses c
     LEFT JOIN departments d ON d.id = c.department_id";

fn row_to_course(row: &Row) -> rusqlite::Result<Course> {
    let id: i64 = row.get(0)?;
    Ok(Course {
        course_id: id,
        course_number: id,
        title: row.get(1)?,
        credits: row.get(2)?,
        department_id: row.get(3)?,
        department_name: row.get(4)?,
        row_version: row.get(5)?,
        enrollment_count: row.get(6)?,
    })
}

pub fn list(
    conn: &Connection,
    page: PageRequest,
    filter: &CourseFilter,
) -> Result<Page<Course>, StoreError> {
    let pattern = like_pattern(filter.search.as_deref());
    let clause = "WHERE (?1 IS NULL OR c.title LIKE ?1 ESCAPE '\\')
                    AND (?2 IS NULL OR c.department_id = ?2)";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM courses c {}", clause),
        (&pattern, filter.department_id),
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} {} ORDER BY c.id LIMIT ?3 OFFSET ?4",
        SELECT_COURSE, clause
    ))?;
    let courses = stmt
        .query_map(
            (&pattern, filter.department_id, page.limit(), page.offset()),
            row_to_course,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(courses, total, page))
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Course>, StoreError> {
    let course = conn
        .query_row(&format!("{} WHERE c.id = ?", SELECT_COURSE), [id], row_to_course)
        .optional()?;
    Ok(course)
}

pub fn get(conn: &Connection, id: i64) -> Result<Course, StoreError> {
    find(conn, id)?.ok_or(StoreError::NotFound {
        entity: Entity::Course,
        id,
    })
}

pub fn create(conn: &Connection, input: &NewCourse) -> Result<Course, StoreError> {
    let tx = conn.unchecked_transaction()?;

    let mut errors = FieldErrors::new();
    errors.require_range("courseNumber", "Course number", input.course_number, 1, 9999);
    let fields = validate_common(
        &tx,
        &mut errors,
        &input.title,
        input.credits,
        input.department_id,
    )?;
    errors.into_result()?;
    let course_number = input.course_number.unwrap_or_default();

    if exists(&tx, Entity::Course, course_number)? {
        return Err(StoreError::Duplicate(format!(
            "Course number {course_number} already exists"
        )));
    }

    let version = concurrency::next_row_version(&tx)?;
    tx.execute(
        "INSERT INTO courses(id, title, credits, department_id, row_version)
         VALUES(?, ?, ?, ?, ?)",
        (
            course_number,
            fields.title,
            fields.credits,
            fields.department_id,
            version,
        ),
    )?;
    tx.commit()?;

    tracing::info!(course_id = course_number, title = fields.title, "created course");
    get(conn, course_number)
}

pub fn update(conn: &Connection, id: i64, input: &CourseChanges) -> Result<Course, StoreError> {
    let tx = conn.unchecked_transaction()?;

    let mut errors = FieldErrors::new();
    let fields = validate_common(
        &tx,
        &mut errors,
        &input.title,
        input.credits,
        input.department_id,
    )?;
    errors.into_result()?;

    let expected = concurrency::expected_row_version(&tx, Entity::Course, id, input.row_version)?;
    let fresh = concurrency::next_row_version(&tx)?;
    let changed = tx.execute(
        "UPDATE courses
         SET title = ?, credits = ?, department_id = ?, row_version = ?
         WHERE id = ? AND row_version = ?",
        (
            fields.title,
            fields.credits,
            fields.department_id,
            fresh,
            id,
            expected,
        ),
    )?;
    concurrency::confirm_update(&tx, Entity::Course, id, changed)?;
    tx.commit()?;

    tracing::info!(course_id = id, "updated course");
    get(conn, id)
}

/// Deletes a course with no enrollments, dropping its instructor
/// assignments along with it.
pub fn delete(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let Some(course) = find(conn, id)? else {
        return Ok(false);
    };

    let tx = conn.unchecked_transaction()?;
    guard::ensure_no_dependents(&tx, Entity::Course, id, &course.title)?;
    tx.execute("DELETE FROM course_assignments WHERE course_id = ?", [id])?;
    tx.execute("DELETE FROM courses WHERE id = ?", [id])?;
    tx.commit()?;

    tracing::info!(course_id = id, title = %course.title, "deleted course");
    Ok(true)
}

pub fn can_delete(conn: &Connection, id: i64) -> Result<Option<DeleteCheck>, StoreError> {
    guard::check(conn, Entity::Course, id)
}
