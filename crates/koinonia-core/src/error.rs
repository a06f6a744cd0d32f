//! Error types for the koinonia backend

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the koinonia backend
///
/// Absence is not an error: store reads return `Ok(None)` and deletes return
/// `Ok(false)` for missing ids. Errors are reserved for transport failures,
/// uniqueness conflicts, and guard rejections.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("{0} already exists")]
    AlreadyExists(&'static str),

    #[error("Group {group_id} must keep at least one leader")]
    LastLeader { group_id: i64 },

    #[error("Organization {organization_id} must keep at least one admin")]
    LastAdmin { organization_id: i64 },

    #[error("User {user_id} is already praying for request {prayer_request_id}")]
    AlreadyPraying {
        prayer_request_id: i64,
        user_id: i64,
    },

    #[error("Password reset token is invalid, used, or expired")]
    InvalidToken,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Map a sqlx write failure, turning unique-constraint violations into
    /// [`Error::AlreadyExists`] so both backends report conflicts the same way.
    pub fn from_write(entity: &'static str, e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
                return Error::AlreadyExists(entity);
            }
        }
        e.into()
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Database(e.to_string())
    }
}
