//! Convenience result type alias for VolHub.

use crate::error::AppError;

/// A specialized `Result` type for VolHub operations.
///
/// Every mutation dispatched against the remote store resolves to an
/// `AppResult<()>`; the error kinds it can carry are listed on
/// [`crate::error::ErrorKind`].
pub type AppResult<T> = Result<T, AppError>;
