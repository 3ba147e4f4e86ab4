//! Student store error types.

use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the student store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No student with the given id.
    #[error("student not found: {0}")]
    StudentNotFound(Uuid),

    /// No exam with the given id.
    #[error("exam not found: {0}")]
    ExamNotFound(Uuid),

    /// Another student already uses this student number.
    #[error("student number already in use: {0}")]
    DuplicateStudentNo(String),

    /// Another student already uses this email address.
    #[error("email already in use: {0}")]
    DuplicateEmail(String),

    /// Exam weights must not be negative.
    #[error("exam {exam} has negative weight {weight}")]
    NegativeWeight { exam: Uuid, weight: Decimal },

    /// The data file could not be read or written.
    #[error("failed to access data file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data file is not valid JSON for the store layout.
    #[error("failed to parse data file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The store contents could not be encoded for the data file.
    #[error("failed to encode data file {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_failure_is_not_reported_as_parse() {
        let source = serde_json::from_str::<u8>("x").unwrap_err();
        let err = StoreError::Serialize {
            path: PathBuf::from("class.json"),
            source,
        };
        assert!(err.to_string().starts_with("failed to encode data file class.json"));
    }

    #[test]
    fn test_negative_weight_message() {
        let err = StoreError::NegativeWeight {
            exam: Uuid::nil(),
            weight: Decimal::new(-5, 1),
        };
        assert_eq!(
            err.to_string(),
            "exam 00000000-0000-0000-0000-000000000000 has negative weight -0.5"
        );
    }
}
