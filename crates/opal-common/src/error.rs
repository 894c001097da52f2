//! Error types for OpalDB.

use crate::types::TypeId;
use thiserror::Error;

/// Result type alias using OpalError.
pub type Result<T> = std::result::Result<T, OpalError>;

/// Errors that can occur in OpalDB operations.
#[derive(Debug, Error)]
pub enum OpalError {
    // Type errors
    #[error("Type mismatch: {left} is not comparable to {right}")]
    TypeMismatch { left: TypeId, right: TypeId },

    #[error("{from} is not coercible to {to}")]
    NotCoercible { from: TypeId, to: TypeId },

    #[error("Unsupported type: {0}")]
    UnsupportedType(TypeId),

    #[error("Operation {op} not supported for {type_id}")]
    UnsupportedOperation { type_id: TypeId, op: &'static str },

    // Value errors
    #[error("Null value not allowed")]
    NullNotAllowed,

    #[error("Value out of range for {target}")]
    ValueOutOfRange { target: TypeId },

    #[error("Invalid {target} literal: {input}")]
    InvalidFormat { target: TypeId, input: String },

    // Memory errors
    #[error("Variable-length pool exhausted, unable to allocate {size} bytes")]
    PoolExhausted { size: usize },

    // Serialization errors
    #[error("Serialized value truncated: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_display() {
        let err = OpalError::TypeMismatch {
            left: TypeId::Integer,
            right: TypeId::Varchar,
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch: INTEGER is not comparable to VARCHAR"
        );
    }

    #[test]
    fn test_not_coercible_display() {
        let err = OpalError::NotCoercible {
            from: TypeId::Timestamp,
            to: TypeId::Boolean,
        };
        assert_eq!(err.to_string(), "TIMESTAMP is not coercible to BOOLEAN");
    }

    #[test]
    fn test_unsupported_type_display() {
        let err = OpalError::UnsupportedType(TypeId::Invalid);
        assert_eq!(err.to_string(), "Unsupported type: INVALID");
    }

    #[test]
    fn test_unsupported_operation_display() {
        let err = OpalError::UnsupportedOperation {
            type_id: TypeId::Array,
            op: "compare",
        };
        assert_eq!(err.to_string(), "Operation compare not supported for ARRAY");
    }

    #[test]
    fn test_value_errors_display() {
        let err = OpalError::NullNotAllowed;
        assert_eq!(err.to_string(), "Null value not allowed");

        let err = OpalError::ValueOutOfRange {
            target: TypeId::TinyInt,
        };
        assert_eq!(err.to_string(), "Value out of range for TINYINT");

        let err = OpalError::InvalidFormat {
            target: TypeId::Integer,
            input: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid INTEGER literal: abc");
    }

    #[test]
    fn test_pool_exhausted_display() {
        let err = OpalError::PoolExhausted { size: 128 };
        assert_eq!(
            err.to_string(),
            "Variable-length pool exhausted, unable to allocate 128 bytes"
        );
    }

    #[test]
    fn test_truncated_display() {
        let err = OpalError::Truncated { need: 8, have: 3 };
        assert_eq!(
            err.to_string(),
            "Serialized value truncated: need 8 bytes, have 3"
        );
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(OpalError::NullNotAllowed)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OpalError>();
    }
}
