// ⚠️ Error Kinds - Validation, lookup and storage failures
// Every core operation returns one of these; nothing panics on bad input.

use std::fmt;

// ============================================================================
// VALIDATION ERROR
// ============================================================================

/// Rejected loan input. Carries the exact message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// STORAGE ERROR
// ============================================================================

#[derive(Debug)]
pub enum StorageError {
    /// The SQLite backend failed
    Sqlite(rusqlite::Error),

    /// The stored blob under `key` is not a valid loan collection
    Corrupt {
        key: String,
        source: serde_json::Error,
    },

    /// The collection could not be serialized
    Serialize(serde_json::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Sqlite(e) => write!(f, "Storage backend error: {}", e),
            StorageError::Corrupt { key, source } => {
                write!(f, "Stored data under '{}' is corrupt: {}", key, source)
            }
            StorageError::Serialize(e) => write!(f, "Failed to serialize loans: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Sqlite(e) => Some(e),
            StorageError::Corrupt { source, .. } => Some(source),
            StorageError::Serialize(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e)
    }
}

// ============================================================================
// LOAN ERROR
// ============================================================================

/// Error returned by every `LoanService` operation.
#[derive(Debug)]
pub enum LoanError {
    Validation(ValidationError),
    NotFound { id: String },
    Storage(StorageError),
}

impl LoanError {
    pub fn not_found(id: &str) -> Self {
        LoanError::NotFound { id: id.to_string() }
    }

    /// True for errors the caller is expected to show and move on from
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, LoanError::Storage(_))
    }
}

impl fmt::Display for LoanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoanError::Validation(e) => write!(f, "{}", e),
            LoanError::NotFound { id } => write!(f, "Loan with id {} not found", id),
            LoanError::Storage(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LoanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoanError::Validation(e) => Some(e),
            LoanError::NotFound { .. } => None,
            LoanError::Storage(e) => Some(e),
        }
    }
}

impl From<ValidationError> for LoanError {
    fn from(e: ValidationError) -> Self {
        LoanError::Validation(e)
    }
}

impl From<StorageError> for LoanError {
    fn from(e: StorageError) -> Self {
        LoanError::Storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_id() {
        let err = LoanError::not_found("abc-123");
        assert_eq!(err.to_string(), "Loan with id abc-123 not found");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err: LoanError = ValidationError::new("Amount must be greater than 0").into();
        assert_eq!(err.to_string(), "Amount must be greater than 0");
    }

    #[test]
    fn test_corrupt_storage_is_not_recoverable() {
        let source = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let err: LoanError = StorageError::Corrupt {
            key: "tredgate_loans".to_string(),
            source,
        }
        .into();

        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("tredgate_loans"));
    }
}
