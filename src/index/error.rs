//! Errors that end an indexing run.
//!
//! Failures of a single course, module item or file are logged and skipped
//! inside the builder; only these reach the caller.

use thiserror::Error;

use crate::download::FetchError;
use crate::persist::PersistError;

/// Unrecoverable indexing failures.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The course list itself could not be fetched.
    #[error("could not fetch the course list: {0}")]
    CourseList(#[source] FetchError),

    /// The index file could not be written.
    #[error("could not save the index: {0}")]
    Persist(#[source] PersistError),
}
