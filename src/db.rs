use rusqlite::Connection;
use std::path::Path;

use crate::concurrency::next_row_version;

pub const DB_FILE_NAME: &str = "registrar.sqlite3";

/// Tables whose rows carry a `row_version` token.
const VERSIONED_TABLES: [&str; 5] = [
    "instructors",
    "departments",
    "courses",
    "students",
    "enrollments",
];

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;
    tracing::info!(path = %db_path.display(), "database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS row_version_counter(
            id INTEGER PRIMARY KEY CHECK (id = 1),
            value INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO row_version_counter(id, value) VALUES(1, 0)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructors(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            last_name TEXT NOT NULL,
            first_mid_name TEXT NOT NULL,
            hire_date TEXT NOT NULL,
            office_location TEXT,
            row_version BLOB NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS departments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            budget REAL NOT NULL,
            start_date TEXT NOT NULL,
            instructor_id INTEGER,
            row_version BLOB NOT NULL,
            FOREIGN KEY(instructor_id) REFERENCES instructors(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_departments_instructor ON departments(instructor_id)",
        [],
    )?;

    // Course ids are the catalogue course numbers, supplied by the client.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            credits INTEGER NOT NULL,
            department_id INTEGER NOT NULL,
            row_version BLOB NOT NULL,
            FOREIGN KEY(department_id) REFERENCES departments(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_department ON courses(department_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_assignments(
            instructor_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            PRIMARY KEY(instructor_id, course_id),
            FOREIGN KEY(instructor_id) REFERENCES instructors(id),
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_assignments_course ON course_assignments(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            last_name TEXT NOT NULL,
            first_mid_name TEXT NOT NULL,
            enrollment_date TEXT NOT NULL,
            row_version BLOB NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_name ON students(last_name, first_mid_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            student_id INTEGER NOT NULL,
            grade TEXT,
            row_version BLOB NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id),
            FOREIGN KEY(student_id) REFERENCES students(id),
            UNIQUE(student_id, course_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id)",
        [],
    )?;

    // Databases created before row versions existed get the column added and
    // every row stamped with its own token.
    for table in VERSIONED_TABLES {
        ensure_row_version(conn, table)?;
    }

    Ok(())
}

fn ensure_row_version(conn: &Connection, table: &str) -> anyhow::Result<()> {
    if table_has_column(conn, table, "row_version")? {
        return Ok(());
    }

    conn.execute(
        &format!("ALTER TABLE {} ADD COLUMN row_version BLOB", table),
        [],
    )?;

    let mut stmt = conn.prepare(&format!("SELECT id FROM {} ORDER BY id", table))?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    let update = format!("UPDATE {} SET row_version = ? WHERE id = ?", table);
    for id in ids {
        let version = next_row_version(conn)?;
        conn.execute(&update, (version, id))?;
    }

    tracing::info!(table, "backfilled row_version column");
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
