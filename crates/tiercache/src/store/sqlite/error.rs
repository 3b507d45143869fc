//! SQLite error mapping.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` to `StoreError`.

use tiercache_core::storage::StoreError;

/// Maps a rusqlite error to a StoreError.
///
/// - Open failures and busy/locked databases → `StoreError::ConnectionFailed`
/// - Column conversion failures → `StoreError::Serialization`
/// - All other errors → `StoreError::QueryFailed`
fn map_rusqlite_error(err: &rusqlite::Error, table: &str) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if matches!(
                sqlite_err.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            StoreError::ConnectionFailed(format!("{table}: {err}"))
        }

        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            StoreError::Serialization(format!("{table}: {err}"))
        }

        _ => StoreError::QueryFailed(format!("{table}: {err}")),
    }
}

/// Maps a tokio_rusqlite error to a StoreError.
///
/// This is the entry point for error mapping in async code. It extracts the
/// inner `rusqlite::Error` if present.
pub fn map_tokio_rusqlite_error(err: tokio_rusqlite::Error, table: &str) -> StoreError {
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => map_rusqlite_error(rusqlite_err, table),
        tokio_rusqlite::Error::ConnectionClosed | tokio_rusqlite::Error::Close(_) => {
            StoreError::ConnectionFailed("Connection closed unexpectedly".to_string())
        }
        _ => StoreError::QueryFailed(format!("{table}: {err}")),
    }
}
