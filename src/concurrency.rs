//! Row version tokens for optimistic concurrency.
//!
//! Every mutable row carries an 8-byte `row_version` drawn from a
//! database-wide counter, so a token is never reused for the same row. Clients
//! see the token as base64 and hand it back on update; the update statement
//! only matches when the stored token is still the one the client read.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::store::{Entity, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowVersion([u8; 8]);

#[derive(Debug, thiserror::Error)]
pub enum RowVersionError {
    #[error("row version is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("row version must be 8 bytes, got {0}")]
    Length(usize),
}

impl RowVersion {
    pub fn from_counter(value: i64) -> Self {
        Self(value.to_be_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn from_base64(s: &str) -> Result<Self, RowVersionError> {
        let bytes = STANDARD.decode(s.trim())?;
        let arr: [u8; 8] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| RowVersionError::Length(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for RowVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl Serialize for RowVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for RowVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RowVersion::from_base64(&s).map_err(serde::de::Error::custom)
    }
}

impl ToSql for RowVersion {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&self.0)))
    }
}

impl FromSql for RowVersion {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let blob = value.as_blob()?;
        let arr: [u8; 8] = blob.try_into().map_err(|_| FromSqlError::InvalidBlobSize {
            expected_size: 8,
            blob_size: blob.len(),
        })?;
        Ok(Self(arr))
    }
}

/// Draws the next token from the counter row. Call inside the transaction
/// that writes the row so an aborted write does not consume a value.
pub fn next_row_version(conn: &Connection) -> rusqlite::Result<RowVersion> {
    conn.execute(
        "UPDATE row_version_counter SET value = value + 1 WHERE id = 1",
        [],
    )?;
    let value: i64 = conn.query_row(
        "SELECT value FROM row_version_counter WHERE id = 1",
        [],
        |r| r.get(0),
    )?;
    Ok(RowVersion::from_counter(value))
}

/// Stored token for a row, `None` if the row does not exist.
pub fn current_row_version(
    conn: &Connection,
    entity: Entity,
    id: i64,
) -> rusqlite::Result<Option<RowVersion>> {
    let sql = format!("SELECT row_version FROM {} WHERE id = ?", entity.table());
    conn.query_row(&sql, [id], |r| r.get(0)).optional()
}

/// Loads the stored token and picks the token the update must match: the
/// caller's if one was sent, otherwise the stored one.
pub fn expected_row_version(
    conn: &Connection,
    entity: Entity,
    id: i64,
    client: Option<RowVersion>,
) -> Result<RowVersion, StoreError> {
    let stored =
        current_row_version(conn, entity, id)?.ok_or(StoreError::NotFound { entity, id })?;
    Ok(client.unwrap_or(stored))
}

/// Interprets the affected-row count of a version-guarded `UPDATE`.
pub fn confirm_update(
    conn: &Connection,
    entity: Entity,
    id: i64,
    changed: usize,
) -> Result<(), StoreError> {
    if changed > 0 {
        return Ok(());
    }
    match current_row_version(conn, entity, id)? {
        None => Err(StoreError::Deleted { entity, id }),
        Some(_) => {
            tracing::warn!(entity = %entity, id, "concurrency conflict on update");
            Err(StoreError::Conflict { entity, id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_form_is_stable() {
        let v = RowVersion::from_counter(1);
        assert_eq!(v.to_base64(), "AAAAAAAAAAE=");
        assert_eq!(RowVersion::from_base64("AAAAAAAAAAE=").expect("decode"), v);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = RowVersion::from_base64("AAAA").expect_err("3 bytes");
        assert!(matches!(err, RowVersionError::Length(3)));
        assert!(RowVersion::from_base64("not base64!").is_err());
    }

    #[test]
    fn counter_never_repeats() {
        let conn = Connection::open_in_memory().expect("open");
        crate::db::init_schema(&conn).expect("schema");
        let a = next_row_version(&conn).expect("a");
        let b = next_row_version(&conn).expect("b");
        assert_ne!(a, b);
        assert!(b.as_bytes() > a.as_bytes());
    }
}
