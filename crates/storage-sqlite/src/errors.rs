//! Error bridging between Diesel and the storage-agnostic core types.

use diesel::result::Error as DieselError;
use thiserror::Error;

use coinfolio_core::errors::{Error, StorageError};

/// Errors internal to the SQLite backend.
///
/// These wrap Diesel and r2d2 types so `?` works inside this crate; they are
/// converted into `coinfolio_core::Error` at the crate boundary. A job that
/// already produced a core error travels through unchanged.
#[derive(Error, Debug)]
pub enum SqliteStorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error(transparent)]
    Core(Box<Error>),
}

impl From<Error> for SqliteStorageError {
    fn from(err: Error) -> Self {
        SqliteStorageError::Core(Box::new(err))
    }
}

impl From<SqliteStorageError> for Error {
    fn from(err: SqliteStorageError) -> Self {
        match err {
            SqliteStorageError::ConnectionFailed(e) => {
                Error::Storage(StorageError::OpenFailed(e.to_string()))
            }
            SqliteStorageError::PoolError(e) => {
                Error::Storage(StorageError::OpenFailed(e.to_string()))
            }
            SqliteStorageError::QueryFailed(e) => {
                Error::Storage(StorageError::Internal(e.to_string()))
            }
            SqliteStorageError::MigrationFailed(e) => Error::Storage(StorageError::OpenFailed(e)),
            SqliteStorageError::Core(e) => *e,
        }
    }
}
