//! Record lookup errors

use chrono::NaiveDate;
use thiserror::Error;

pub type RecordsResult<T> = Result<T, RecordsError>;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordsError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid date range: {from} is after {to}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },

    #[error("Record source unavailable: {message}")]
    Unavailable { message: String },
}

impl RecordsError {
    pub fn not_found<S: Into<String>>(kind: &'static str, id: S) -> Self {
        RecordsError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
