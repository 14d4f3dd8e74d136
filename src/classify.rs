//! Storage error classification
//!
//! Maps a raw `rusqlite::Error` to exactly one [`ErrorCategory`]. The checks run
//! in a fixed order and the first match wins:
//!
//! 1. `SQLITE_CONSTRAINT`, narrowed by message: `FOREIGN KEY`, `UNIQUE`,
//!    `PRIMARY KEY`, otherwise the generic constraint category
//! 2. engine faults by code: busy, locked, I/O, corrupt
//! 3. generic `SQLITE_ERROR` whose message describes malformed SQL
//! 4. everything else
//!
//! Constraint categories are expected findings, never critical.

use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    ForeignKeyViolation,
    UniqueConstraintViolation,
    PrimaryKeyViolation,
    SyntaxError,
    BusyError,
    LockedError,
    IoError,
    CorruptError,
    /// Constraint failure not covered by the specific constraint categories (NOT NULL, CHECK)
    ConstraintViolation,
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            ErrorCategory::UniqueConstraintViolation => "UNIQUE_CONSTRAINT_VIOLATION",
            ErrorCategory::PrimaryKeyViolation => "PRIMARY_KEY_VIOLATION",
            ErrorCategory::SyntaxError => "SYNTAX_ERROR",
            ErrorCategory::BusyError => "BUSY_ERROR",
            ErrorCategory::LockedError => "LOCKED_ERROR",
            ErrorCategory::IoError => "IO_ERROR",
            ErrorCategory::CorruptError => "CORRUPT_ERROR",
            ErrorCategory::ConstraintViolation => "CONSTRAINT_VIOLATION",
            ErrorCategory::Other => "OTHER_ERROR",
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            ErrorCategory::ForeignKeyViolation
                | ErrorCategory::UniqueConstraintViolation
                | ErrorCategory::PrimaryKeyViolation
                | ErrorCategory::ConstraintViolation
        )
    }

    /// Engine faults in this set abort the pass regardless of the raw code.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            ErrorCategory::SyntaxError
                | ErrorCategory::BusyError
                | ErrorCategory::LockedError
                | ErrorCategory::IoError
                | ErrorCategory::CorruptError
        )
    }

    /// Contention errors; a fresh pass may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::BusyError | ErrorCategory::LockedError)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a storage error.
pub fn classify(err: &rusqlite::Error) -> ErrorCategory {
    match err {
        rusqlite::Error::SqlInputError { error, msg, .. } => classify_code(error.code, msg),
        _ => match err.sqlite_error_code() {
            Some(code) => classify_code(code, &err.to_string()),
            None => ErrorCategory::Other,
        },
    }
}

/// Primary result code, including statements rejected at prepare time.
fn primary_code(err: &rusqlite::Error) -> Option<ErrorCode> {
    match err {
        rusqlite::Error::SqlInputError { error, .. } => Some(error.code),
        _ => err.sqlite_error_code(),
    }
}

/// Classify from an already-extracted primary code and message.
pub fn classify_code(code: ErrorCode, message: &str) -> ErrorCategory {
    match code {
        ErrorCode::ConstraintViolation => {
            if message.contains("FOREIGN KEY") {
                ErrorCategory::ForeignKeyViolation
            } else if message.contains("UNIQUE") {
                ErrorCategory::UniqueConstraintViolation
            } else if message.contains("PRIMARY KEY") {
                ErrorCategory::PrimaryKeyViolation
            } else {
                ErrorCategory::ConstraintViolation
            }
        }
        ErrorCode::DatabaseBusy => ErrorCategory::BusyError,
        ErrorCode::DatabaseLocked => ErrorCategory::LockedError,
        ErrorCode::SystemIoFailure => ErrorCategory::IoError,
        ErrorCode::DatabaseCorrupt => ErrorCategory::CorruptError,
        ErrorCode::Unknown if is_malformed_sql(message) => ErrorCategory::SyntaxError,
        _ => ErrorCategory::Other,
    }
}

fn is_malformed_sql(message: &str) -> bool {
    message.contains("syntax error")
        || (message.contains("values for") && message.contains("columns"))
        || message.contains("no such table")
        || message.contains("no such column")
}

/// Faults that make continuing the pass pointless: malformed SQL, contention,
/// I/O, corruption, a store that cannot be opened, or a full disk.
pub fn is_critical_error(err: &rusqlite::Error) -> bool {
    if classify(err).is_critical() {
        return true;
    }
    matches!(
        primary_code(err),
        Some(ErrorCode::CannotOpen) | Some(ErrorCode::DiskFull)
    )
}

/// Critical errors plus a schema changed underneath a prepared statement.
pub fn should_abort(err: &rusqlite::Error) -> bool {
    is_critical_error(err) || primary_code(err) == Some(ErrorCode::SchemaChanged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{Connection, ffi};

    fn failure(code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), Some(message.to_string()))
    }

    #[test]
    fn test_constraint_messages_select_subtype() {
        let fk = failure(ffi::SQLITE_CONSTRAINT, "FOREIGN KEY constraint failed");
        assert_eq!(classify(&fk), ErrorCategory::ForeignKeyViolation);

        let unique = failure(ffi::SQLITE_CONSTRAINT, "UNIQUE constraint failed: services.host");
        assert_eq!(classify(&unique), ErrorCategory::UniqueConstraintViolation);

        let pk = failure(ffi::SQLITE_CONSTRAINT, "PRIMARY KEY must be unique");
        assert_eq!(classify(&pk), ErrorCategory::PrimaryKeyViolation);

        let not_null = failure(ffi::SQLITE_CONSTRAINT, "NOT NULL constraint failed: services.host");
        assert_eq!(classify(&not_null), ErrorCategory::ConstraintViolation);
    }

    #[test]
    fn test_code_wins_over_message() {
        // A busy error mentioning UNIQUE is still a busy error
        let busy = failure(ffi::SQLITE_BUSY, "UNIQUE lookup timed out");
        assert_eq!(classify(&busy), ErrorCategory::BusyError);

        // A syntax-looking message under a constraint code stays a constraint
        let odd = failure(ffi::SQLITE_CONSTRAINT, "CHECK near syntax error");
        assert_eq!(classify(&odd), ErrorCategory::ConstraintViolation);
    }

    #[test]
    fn test_engine_fault_codes() {
        assert_eq!(classify(&failure(ffi::SQLITE_LOCKED, "locked")), ErrorCategory::LockedError);
        assert_eq!(classify(&failure(ffi::SQLITE_IOERR, "disk I/O error")), ErrorCategory::IoError);
        assert_eq!(
            classify(&failure(ffi::SQLITE_CORRUPT, "malformed")),
            ErrorCategory::CorruptError
        );
        assert_eq!(classify(&failure(ffi::SQLITE_FULL, "full")), ErrorCategory::Other);
    }

    #[test]
    fn test_non_sqlite_error_is_other() {
        let err = rusqlite::Error::QueryReturnedNoRows;
        assert_eq!(classify(&err), ErrorCategory::Other);
        assert!(!is_critical_error(&err));
        assert!(!should_abort(&err));
    }

    #[test]
    fn test_real_engine_errors() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id TEXT PRIMARY KEY);
             CREATE TABLE child (id TEXT PRIMARY KEY, parent_id TEXT NOT NULL REFERENCES parent(id));
             INSERT INTO parent (id) VALUES ('p');",
        )
        .unwrap();

        let syntax = conn.execute("SELEC * FROM parent", []).unwrap_err();
        assert!(matches!(syntax, rusqlite::Error::SqlInputError { .. }));
        assert_eq!(classify(&syntax), ErrorCategory::SyntaxError);
        assert!(is_critical_error(&syntax));
        assert!(should_abort(&syntax));

        let missing = conn.prepare("SELECT * FROM nowhere").unwrap_err();
        assert_eq!(classify(&missing), ErrorCategory::SyntaxError);

        let dup = conn.execute("INSERT INTO parent (id) VALUES ('p')", []).unwrap_err();
        assert_eq!(classify(&dup), ErrorCategory::UniqueConstraintViolation);
        assert!(!is_critical_error(&dup));

        let dangling = conn
            .execute("INSERT INTO child (id, parent_id) VALUES ('c', 'ghost')", [])
            .unwrap_err();
        assert_eq!(classify(&dangling), ErrorCategory::ForeignKeyViolation);

        let null = conn
            .execute("INSERT INTO child (id, parent_id) VALUES ('c', NULL)", [])
            .unwrap_err();
        assert_eq!(classify(&null), ErrorCategory::ConstraintViolation);
    }

    #[test]
    fn test_critical_and_abort_predicates() {
        assert!(is_critical_error(&failure(ffi::SQLITE_CANTOPEN, "unable to open database file")));
        assert!(is_critical_error(&failure(ffi::SQLITE_FULL, "database or disk is full")));
        assert!(!is_critical_error(&failure(ffi::SQLITE_SCHEMA, "database schema has changed")));
        assert!(should_abort(&failure(ffi::SQLITE_SCHEMA, "database schema has changed")));

        for category in [
            ErrorCategory::ForeignKeyViolation,
            ErrorCategory::UniqueConstraintViolation,
            ErrorCategory::PrimaryKeyViolation,
            ErrorCategory::ConstraintViolation,
        ] {
            assert!(category.is_constraint());
            assert!(!category.is_critical());
        }
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCategory::BusyError.is_retryable());
        assert!(ErrorCategory::LockedError.is_retryable());
        assert!(!ErrorCategory::CorruptError.is_retryable());
    }
}
