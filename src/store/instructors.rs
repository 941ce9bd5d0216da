use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{exists, Entity, StoreError};
use crate::concurrency::{self, RowVersion};
use crate::dates;
use crate::pagination::{like_pattern, Page, PageRequest};
use crate::validation::{clean_optional, FieldErrors, NAME_MAX_CHARS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignment {
    pub course_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: i64,
    pub last_name: String,
    pub first_mid_name: String,
    pub hire_date: NaiveDate,
    pub office_location: Option<String>,
    pub full_name: String,
    pub course_assignments: Vec<CourseAssignment>,
    pub row_version: RowVersion,
}

/// `courseIds`, when present, replaces the instructor's assignments.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorInput {
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_mid_name: String,
    #[serde(default, deserialize_with = "dates::deserialize_optional")]
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub office_location: Option<String>,
    #[serde(default)]
    pub course_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub row_version: Option<RowVersion>,
}

struct Fields<'a> {
    last_name: &'a str,
    first_mid_name: &'a str,
    hire_date: NaiveDate,
    office_location: Option<String>,
}

impl InstructorInput {
    fn validate(&self, conn: &Connection) -> Result<Fields<'_>, StoreError> {
        let mut errors = FieldErrors::new();
        errors.require_text("lastName", "Last name", &self.last_name, NAME_MAX_CHARS);
        errors.require_text("firstMidName", "First name", &self.first_mid_name, NAME_MAX_CHARS);
        errors.require("hireDate", "Hire date", self.hire_date.as_ref());
        errors.optional_text(
            "officeLocation",
            "Office location",
            self.office_location.as_deref(),
            NAME_MAX_CHARS,
        );
        for course_id in self.course_ids.iter().flatten() {
            if !exists(conn, Entity::Course, *course_id)? {
                errors.add("courseIds", format!("Course {course_id} does not exist"));
            }
        }
        errors.into_result()?;
        Ok(Fields {
            last_name: self.last_name.trim(),
            first_mid_name: self.first_mid_name.trim(),
            hire_date: self.hire_date.unwrap_or_default(),
            office_location: clean_optional(self.office_location.as_deref()),
        })
    }
}

const SELECT_INSTRUCTOR: &str = "SELECT
       i.id,
       i.last_name,
       i.first_mid_name,
       i.hire_date,
       i.office_location,
       i.row_version
     FROM instructors i";

fn row_to_instructor(row: &Row) -> rusqlite::Result<Instructor> {
    let last_name: String = row.get(1)?;
    let first_mid_name: String = row.get(2)?;
    Ok(Instructor {
        id: row.get(0)?,
        full_name: format!("{}, {}", last_name, first_mid_name),
        last_name,
        first_mid_name,
        hire_date: row.get(3)?,
        office_location: row.get(4)?,
        course_assignments: Vec::new(),
        row_version: row.get(5)?,
    })
}

fn load_assignments(conn: &Connection, instructor: &mut Instructor) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT c.id, c.title
         FROM course_assignments ca
         JOIN courses c ON c.id = ca.course_id
         WHERE ca.instructor_id = ?
         ORDER BY c.id",
    )?;
    instructor.course_assignments = stmt
        .query_map([instructor.id], |row| {
            Ok(CourseAssignment {
                course_id: row.get(0)?,
                title: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(())
}

fn replace_assignments(conn: &Connection, instructor_id: i64, course_ids: &[i64]) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM course_assignments WHERE instructor_id = ?",
        [instructor_id],
    )?;
    for course_id in course_ids {
        conn.execute(
            "INSERT OR IGNORE INTO course_assignments(instructor_id, course_id) VALUES(?, ?)",
            (instructor_id, course_id),
        )?;
    }
    Ok(())
}

pub fn list(
    conn: &Connection,
    page: PageRequest,
    search: Option<&str>,
) -> Result<Page<Instructor>, StoreError> {
    let pattern = like_pattern(search);
    let filter = "WHERE (?1 IS NULL OR i.last_name LIKE ?1 ESCAPE '\\' OR i.first_mid_name LIKE ?1 ESCAPE '\\')";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM instructors i {}", filter),
        [&pattern],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} {} ORDER BY i.last_name, i.first_mid_name, i.id LIMIT ?2 OFFSET ?3",
        SELECT_INSTRUCTOR, filter
    ))?;
    let mut instructors = stmt
        .query_map((&pattern, page.limit(), page.offset()), row_to_instructor)?
        .collect::<Result<Vec<_>, _>>()?;
    for instructor in &mut instructors {
        load_assignments(conn, instructor)?;
    }

    Ok(Page::new(instructors, total, page))
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Instructor>, StoreError> {
    let instructor = conn
        .query_row(
            &format!("{} WHERE i.id = ?", SELECT_INSTRUCTOR),
            [id],
            row_to_instructor,
        )
        .optional()?;
    let Some(mut instructor) = instructor else {
        return Ok(None);
    };
    load_assignments(conn, &mut instructor)?;
    Ok(Some(instructor))
}

pub fn get(conn: &Connection, id: i64) -> Result<Instructor, StoreError> {
    find(conn, id)?.ok_or(StoreError::NotFound {
        entity: Entity::Instructor,
        id,
    })
}

pub fn create(conn: &Connection, input: &InstructorInput) -> Result<Instructor, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let fields = input.validate(&tx)?;
    let version = concurrency::next_row_version(&tx)?;
    tx.execute(
        "INSERT INTO instructors(last_name, first_mid_name, hire_date, office_location, row_version)
         VALUES(?, ?, ?, ?, ?)",
        (
            fields.last_name,
            fields.first_mid_name,
            fields.hire_date,
            fields.office_location.as_deref(),
            version,
        ),
    )?;
    let id = tx.last_insert_rowid();
    if let Some(course_ids) = &input.course_ids {
        replace_assignments(&tx, id, course_ids)?;
    }
    tx.commit()?;

    tracing::info!(instructor_id = id, last_name = fields.last_name, "created instructor");
    get(conn, id)
}

pub fn update(
    conn: &Connection,
    id: i64,
    input: &InstructorInput,
) -> Result<Instructor, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let fields = input.validate(&tx)?;
    let expected =
        concurrency::expected_row_version(&tx, Entity::Instructor, id, input.row_version)?;
    let fresh = concurrency::next_row_version(&tx)?;
    let changed = tx.execute(
        "UPDATE instructors
         SET last_name = ?, first_mid_name = ?, hire_date = ?, office_location = ?, row_version = ?
         WHERE id = ? AND row_version = ?",
        (
            fields.last_name,
            fields.first_mid_name,
            fields.hire_date,
            fields.office_location.as_deref(),
            fresh,
            id,
            expected,
        ),
    )?;
    concurrency::confirm_update(&tx, Entity::Instructor, id, changed)?;
    if let Some(course_ids) = &input.course_ids {
        replace_assignments(&tx, id, course_ids)?;
    }
    tx.commit()?;

    tracing::info!(instructor_id = id, "updated instructor");
    get(conn, id)
}

/// Instructors are never blocked by dependents: their course assignments are
/// removed and any department they administer is left without an
/// administrator (which bumps that department's row version).
pub fn delete(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    if !exists(conn, Entity::Instructor, id)? {
        return Ok(false);
    }

    let tx = conn.unchecked_transaction()?;
    let mut stmt = tx.prepare("SELECT id FROM departments WHERE instructor_id = ?")?;
    let department_ids = stmt
        .query_map([id], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);
    for department_id in &department_ids {
        let fresh = concurrency::next_row_version(&tx)?;
        tx.execute(
            "UPDATE departments SET instructor_id = NULL, row_version = ? WHERE id = ?",
            (fresh, department_id),
        )?;
    }
    tx.execute("DELETE FROM course_assignments WHERE instructor_id = ?", [id])?;
    tx.execute("DELETE FROM instructors WHERE id = ?", [id])?;
    tx.commit()?;

    tracing::info!(
        instructor_id = id,
        departments_cleared = department_ids.len(),
        "deleted instructor"
    );
    Ok(true)
}
