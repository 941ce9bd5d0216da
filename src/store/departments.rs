use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{exists, guard, DeleteCheck, Entity, StoreError};
use crate::concurrency::{self, RowVersion};
use crate::dates;
use crate::pagination::{like_pattern, Page, PageRequest};
use crate::validation::{FieldErrors, NAME_MAX_CHARS};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub department_id: i64,
    pub name: String,
    pub budget: f64,
    pub start_date: NaiveDate,
    pub instructor_id: Option<i64>,
    pub administrator_name: Option<String>,
    pub course_count: i64,
    pub row_version: RowVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "dates::deserialize_optional")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub instructor_id: Option<i64>,
    #[serde(default)]
    pub row_version: Option<RowVersion>,
}

struct Fields<'a> {
    name: &'a str,
    budget: f64,
    start_date: NaiveDate,
    instructor_id: Option<i64>,
}

impl DepartmentInput {
    fn validate(&self, conn: &Connection) -> Result<Fields<'_>, StoreError> {
        let mut errors = FieldErrors::new();
        errors.require_text_between("name", "Name", &self.name, 3, NAME_MAX_CHARS);
        match self.budget {
            None => errors.add("budget", "Budget is required"),
            Some(b) if !b.is_finite() || b < 0.0 => {
                errors.add("budget", "Budget must be a non-negative amount")
            }
            Some(_) => {}
        }
        errors.require("startDate", "Start date", self.start_date.as_ref());
        if let Some(instructor_id) = self.instructor_id {
            if !exists(conn, Entity::Instructor, instructor_id)? {
                errors.add(
                    "instructorId",
                    format!("Instructor with ID {instructor_id} does not exist"),
                );
            }
        }
        errors.into_result()?;
        Ok(Fields {
            name: self.name.trim(),
            budget: self.budget.unwrap_or_default(),
            start_date: self.start_date.unwrap_or_default(),
            instructor_id: self.instructor_id,
        })
    }
}

const SELECT_DEPARTMENT: &str = "SELECT
       d.id,
       d.name,
       d.budget,
       d.start_date,
       d.instructor_id,
       CASE WHEN i.id IS NULL THEN NULL ELSE i.last_name || ', ' || i.first_mid_name END,
       d.row_version,
       (SELECT COUNT(*) FROM courses c WHERE c.department_id = d.id) AS course_count
     FROM departments d
     LEFT JOIN instructors i ON i.id = d.instructor_id";

fn row_to_department(row: &Row) -> rusqlite::Result<Department> {
    Ok(Department {
        department_id: row.get(0)?,
        name: row.get(1)?,
        budget: row.get(2)?,
        start_date: row.get(3)?,
        instructor_id: row.get(4)?,
        administrator_name: row.get(5)?,
        row_version: row.get(6)?,
        course_count: row.get(7)?,
    })
}

pub fn list(
    conn: &Connection,
    page: PageRequest,
    search: Option<&str>,
) -> Result<Page<Department>, StoreError> {
    let pattern = like_pattern(search);
    let filter = "WHERE (?1 IS NULL OR d.name LIKE ?1 ESCAPE '\\')";

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM departments d {}", filter),
        [&pattern],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "{} {} ORDER BY d.name, d.id LIMIT ?2 OFFSET ?3",
        SELECT_DEPARTMENT, filter
    ))?;
    let departments = stmt
        .query_map((&pattern, page.limit(), page.offset()), row_to_department)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(departments, total, page))
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Department>, StoreError> {
    let department = conn
        .query_row(
            &format!("{} WHERE d.id = ?", SELECT_DEPARTMENT),
            [id],
            row_to_department,
        )
        .optional()?;
    Ok(department)
}

pub fn get(conn: &Connection, id: i64) -> Result<Department, StoreError> {
    find(conn, id)?.ok_or(StoreError::NotFound {
        entity: Entity::Department,
        id,
    })
}

pub fn create(conn: &Connection, input: &DepartmentInput) -> Result<Department, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let fields = input.validate(&tx)?;
    let version = concurrency::next_row_version(&tx)?;
    tx.execute(
        "INSERT INTO departments(name, budget, start_date, instructor_id, row_version)
         VALUES(?, ?, ?, ?, ?)",
        (
            fields.name,
            fields.budget,
            fields.start_date,
            fields.instructor_id,
            version,
        ),
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;

    tracing::info!(department_id = id, name = fields.name, "created department");
    get(conn, id)
}

pub fn update(
    conn: &Connection,
    id: i64,
    input: &DepartmentInput,
) -> Result<Department, StoreError> {
    let tx = conn.unchecked_transaction()?;
    let fields = input.validate(&tx)?;
    let expected =
        concurrency::expected_row_version(&tx, Entity::Department, id, input.row_version)?;
    let fresh = concurrency::next_row_version(&tx)?;
    let changed = tx.execute(
        "UPDATE departments
         SET name = ?, budget = ?, start_date = ?, instructor_id = ?, row_version = ?
         WHERE id = ? AND row_version = ?",
        (
            fields.name,
            fields.budget,
            fields.start_date,
            fields.instructor_id,
            fresh,
            id,
            expected,
        ),
    )?;
    concurrency::confirm_update(&tx, Entity::Department, id, changed)?;
    tx.commit()?;

    tracing::info!(department_id = id, "updated department");
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    let Some(department) = find(conn, id)? else {
        return Ok(false);
    };

    let tx = conn.unchecked_transaction()?;
    guard::ensure_no_dependents(&tx, Entity::Department, id, &department.name)?;
    tx.execute("DELETE FROM departments WHERE id = ?", [id])?;
    tx.commit()?;

    tracing::info!(department_id = id, name = %department.name, "deleted department");
    Ok(true)
}

pub fn can_delete(conn: &Connection, id: i64) -> Result<Option<DeleteCheck>, StoreError> {
    guard::check(conn, Entity::Department, id)
}
