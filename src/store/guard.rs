//! Dependent-row guard for deletes.
//!
//! Parents are never cascaded: a student with enrollments, a department with
//! courses or a course with enrollments must be emptied by the caller first.

use rusqlite::Connection;

use super::{DeleteCheck, Entity, StoreError};

/// Child table and foreign-key column counted for each guarded parent.
fn dependents_of(entity: Entity) -> Option<(&'static str, &'static str)> {
    match entity {
        Entity::Student => Some(("enrollments", "student_id")),
        Entity::Department => Some(("courses", "department_id")),
        Entity::Course => Some(("enrollments", "course_id")),
        Entity::Instructor | Entity::Enrollment => None,
    }
}

pub fn count_dependents(conn: &Connection, entity: Entity, id: i64) -> rusqlite::Result<i64> {
    let Some((table, column)) = dependents_of(entity) else {
        return Ok(0);
    };
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column);
    conn.query_row(&sql, [id], |r| r.get(0))
}

/// Fails with [`StoreError::HasDependents`] when `id` still has children.
/// `display_name` is the human name used in the message.
pub fn ensure_no_dependents(
    conn: &Connection,
    entity: Entity,
    id: i64,
    display_name: &str,
) -> Result<(), StoreError> {
    let count = count_dependents(conn, entity, id)?;
    if count == 0 {
        return Ok(());
    }
    let message = match entity {
        Entity::Student => format!(
            "Cannot delete student {display_name} because they have {count} enrollment(s). Remove enrollments first."
        ),
        Entity::Department => format!(
            "Cannot delete department {display_name} because it has {count} course(s). Reassign or remove the courses first."
        ),
        Entity::Course => format!(
            "Cannot delete course {display_name} because it has {count} enrollment(s). Remove enrollments first."
        ),
        Entity::Instructor | Entity::Enrollment => {
            format!("Cannot delete {entity} {display_name}: {count} dependent row(s) exist.")
        }
    };
    tracing::warn!(entity = %entity, id, count, "delete refused, dependents exist");
    Err(StoreError::HasDependents {
        entity,
        id,
        count,
        message,
    })
}

/// `None` if the parent does not exist.
pub fn check(conn: &Connection, entity: Entity, id: i64) -> Result<Option<DeleteCheck>, StoreError> {
    if !super::exists(conn, entity, id)? {
        return Ok(None);
    }
    let dependent_count = count_dependents(conn, entity, id)?;
    Ok(Some(DeleteCheck {
        can_delete: dependent_count == 0,
        dependent_count,
    }))
}
