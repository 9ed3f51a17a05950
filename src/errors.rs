// Library Service
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Domain error taxonomy shared by the driver and both transport adapters.
//!
//! Every failure that can escape the driver is a `DomainError` carrying one of
//! a closed set of kinds.  The kind alone determines the category, the HTTP
//! status, the gRPC status and the retryability of the failure, so the
//! mappings below are total functions and the transports contain no mapping
//! logic of their own.
//!
//! Storage and system failures never expose backend error text to callers:
//! the raw detail is logged here, at conversion time, and the caller sees a
//! generic message plus the machine-readable code.

use crate::db::DbError;
use crate::model::ModelError;
use std::collections::BTreeMap;
use std::fmt;

/// Machine-readable discriminator of a domain error.
///
/// The set is closed: transports map over it exhaustively and tests verify
/// that the mappings are total.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Generic validation failure not covered by a more specific kind.
    ValidationError,

    /// A mandatory field was absent or empty.
    RequiredFieldMissing,

    /// A field value does not match the expected format.
    InvalidFormat,

    /// A field value violates a length constraint.
    InvalidLength,

    /// A field value is outside the accepted range.
    InvalidValue,

    /// A referenced entity does not exist.
    ResourceNotFound,

    /// An entity with the same unique attribute already exists.
    ResourceAlreadyExists,

    /// A domain rule was violated.
    BusinessRuleViolation,

    /// The requested operation is not allowed in the current state.
    OperationNotAllowed,

    /// The operation lost a race against a concurrent conflicting operation.
    Conflict,

    /// Catch-all for unexpected database failures.
    StorageError,

    /// A database constraint was violated.
    IntegrityViolation,

    /// The database could not be reached.
    ConnectionError,

    /// A transaction could not be committed.
    TransactionError,

    /// Catch-all for unexpected non-database failures.
    InternalError,

    /// The service cannot currently handle requests.
    ServiceUnavailable,

    /// The operation exceeded its time budget.
    Timeout,

    /// The caller exceeded its request quota.
    RateLimitExceeded,
}

/// All the error kinds, in declaration order.  Used to verify mapping totality.
pub const ALL_ERROR_KINDS: [ErrorKind; 18] = [
    ErrorKind::ValidationError,
    ErrorKind::RequiredFieldMissing,
    ErrorKind::InvalidFormat,
    ErrorKind::InvalidLength,
    ErrorKind::InvalidValue,
    ErrorKind::ResourceNotFound,
    ErrorKind::ResourceAlreadyExists,
    ErrorKind::BusinessRuleViolation,
    ErrorKind::OperationNotAllowed,
    ErrorKind::Conflict,
    ErrorKind::StorageError,
    ErrorKind::IntegrityViolation,
    ErrorKind::ConnectionError,
    ErrorKind::TransactionError,
    ErrorKind::InternalError,
    ErrorKind::ServiceUnavailable,
    ErrorKind::Timeout,
    ErrorKind::RateLimitExceeded,
];

/// Coarse grouping of error kinds, used for logging severity and for the
/// decision of whether raw failure detail may reach the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorCategory {
    /// Input data failed validation.
    Validation,

    /// The request was well-formed but a domain rule rejected it.
    BusinessLogic,

    /// The persistence layer failed.
    Storage,

    /// The service itself failed.
    System,
}

impl ErrorCategory {
    /// Returns the category name used in serialized error responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::BusinessLogic => "business_logic",
            ErrorCategory::Storage => "storage",
            ErrorCategory::System => "system",
        }
    }
}

impl ErrorKind {
    /// Returns the stable machine-readable code for this kind.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::RequiredFieldMissing => "REQUIRED_FIELD_MISSING",
            ErrorKind::InvalidFormat => "INVALID_FORMAT",
            ErrorKind::InvalidLength => "INVALID_LENGTH",
            ErrorKind::InvalidValue => "INVALID_VALUE",
            ErrorKind::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorKind::ResourceAlreadyExists => "RESOURCE_ALREADY_EXISTS",
            ErrorKind::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            ErrorKind::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::StorageError => "STORAGE_ERROR",
            ErrorKind::IntegrityViolation => "INTEGRITY_VIOLATION",
            ErrorKind::ConnectionError => "CONNECTION_ERROR",
            ErrorKind::TransactionError => "TRANSACTION_ERROR",
            ErrorKind::InternalError => "INTERNAL_ERROR",
            ErrorKind::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }

    /// Returns the category this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::ValidationError
            | ErrorKind::RequiredFieldMissing
            | ErrorKind::InvalidFormat
            | ErrorKind::InvalidLength
            | ErrorKind::InvalidValue => ErrorCategory::Validation,

            ErrorKind::ResourceNotFound
            | ErrorKind::ResourceAlreadyExists
            | ErrorKind::BusinessRuleViolation
            | ErrorKind::OperationNotAllowed
            | ErrorKind::Conflict => ErrorCategory::BusinessLogic,

            ErrorKind::StorageError
            | ErrorKind::IntegrityViolation
            | ErrorKind::ConnectionError
            | ErrorKind::TransactionError => ErrorCategory::Storage,

            ErrorKind::InternalError
            | ErrorKind::ServiceUnavailable
            | ErrorKind::Timeout
            | ErrorKind::RateLimitExceeded => ErrorCategory::System,
        }
    }

    /// Returns the HTTP status this kind maps to.
    pub fn http_status(&self) -> http::StatusCode {
        match self {
            ErrorKind::ValidationError
            | ErrorKind::RequiredFieldMissing
            | ErrorKind::InvalidFormat
            | ErrorKind::InvalidLength
            | ErrorKind::InvalidValue => http::StatusCode::BAD_REQUEST,

            ErrorKind::ResourceNotFound => http::StatusCode::NOT_FOUND,
            ErrorKind::ResourceAlreadyExists | ErrorKind::Conflict => http::StatusCode::CONFLICT,
            ErrorKind::BusinessRuleViolation => http::StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::OperationNotAllowed => http::StatusCode::FORBIDDEN,

            ErrorKind::StorageError
            | ErrorKind::IntegrityViolation
            | ErrorKind::TransactionError
            | ErrorKind::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,

            ErrorKind::ConnectionError | ErrorKind::ServiceUnavailable => {
                http::StatusCode::SERVICE_UNAVAILABLE
            }
            ErrorKind::Timeout => http::StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::RateLimitExceeded => http::StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Returns the gRPC status this kind maps to.
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            ErrorKind::ValidationError
            | ErrorKind::RequiredFieldMissing
            | ErrorKind::InvalidFormat
            | ErrorKind::InvalidLength
            | ErrorKind::InvalidValue => tonic::Code::InvalidArgument,

            ErrorKind::ResourceNotFound => tonic::Code::NotFound,
            ErrorKind::ResourceAlreadyExists => tonic::Code::AlreadyExists,
            ErrorKind::BusinessRuleViolation | ErrorKind::OperationNotAllowed => {
                tonic::Code::FailedPrecondition
            }
            ErrorKind::Conflict => tonic::Code::Aborted,

            ErrorKind::StorageError
            | ErrorKind::IntegrityViolation
            | ErrorKind::TransactionError
            | ErrorKind::InternalError => tonic::Code::Internal,

            ErrorKind::ConnectionError | ErrorKind::ServiceUnavailable => tonic::Code::Unavailable,
            ErrorKind::Timeout => tonic::Code::DeadlineExceeded,
            ErrorKind::RateLimitExceeded => tonic::Code::ResourceExhausted,
        }
    }

    /// Tells whether a caller may reasonably retry an operation that failed
    /// with this kind.  This is advisory: the service never retries anything
    /// internally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ServiceUnavailable
                | ErrorKind::Timeout
                | ErrorKind::RateLimitExceeded
                | ErrorKind::Conflict
        )
    }
}

/// A domain failure: the only error type that crosses the driver boundary.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    /// Machine-readable discriminator.
    pub kind: ErrorKind,

    /// Human-readable description of the failure.
    pub message: String,

    /// Name of the offending field, when the failure concerns a single field.
    pub field: Option<String>,

    /// Structured diagnostic details, serialized verbatim in responses.
    pub details: BTreeMap<String, String>,

    /// Message of the underlying fault, if this error wraps one.  Retained
    /// for server-side logs only; never serialized in responses.
    pub cause: Option<String>,
}

/// Result type for driver operations.
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Creates an error of `kind` with a plain `message` and no details.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self { kind, message: message.into(), field: None, details: BTreeMap::new(), cause: None }
    }

    /// Attaches a detail entry to the error.
    pub fn with_detail<K: Into<String>, V: fmt::Display>(mut self, key: K, value: V) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// Attaches the name of the offending field to the error.
    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Creates a `resource_not_found` error for the entity `resource_type`
    /// with the given `resource_id`.
    pub fn not_found(resource_type: &str, resource_id: i64) -> Self {
        Self::new(
            ErrorKind::ResourceNotFound,
            format!("{} with ID {} not found", resource_type, resource_id),
        )
        .with_detail("resource_type", resource_type)
        .with_detail("resource_id", resource_id)
    }

    /// Creates a `resource_already_exists` error for the entity
    /// `resource_type` whose unique `identifier` already holds `value`.
    pub fn already_exists(resource_type: &str, identifier: &str, value: &str) -> Self {
        Self::new(
            ErrorKind::ResourceAlreadyExists,
            format!("{} with {} '{}' already exists", resource_type, identifier, value),
        )
        .with_detail("resource_type", resource_type)
        .with_detail("identifier", identifier)
        .with_detail("value", value)
    }

    /// Creates a `conflict` error with a plain message.
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Creates an `operation_not_allowed` error for `operation`, explaining
    /// the `reason` it was rejected.
    pub fn operation_not_allowed(operation: &str, reason: &str) -> Self {
        Self::new(
            ErrorKind::OperationNotAllowed,
            format!("Operation '{}' is not allowed: {}", operation, reason),
        )
        .with_detail("operation", operation)
        .with_detail("reason", reason)
    }

    /// Creates a `timeout` error for `operation`.
    pub fn timeout(operation: &str) -> Self {
        Self::new(ErrorKind::Timeout, format!("Operation '{}' timed out", operation))
            .with_detail("operation", operation)
    }

    /// Logs this error at the severity its category demands, tagged with the
    /// `operation` that produced it.
    pub fn log(&self, operation: &str) {
        match self.kind.category() {
            ErrorCategory::Validation | ErrorCategory::BusinessLogic => {
                log::debug!("{} failed: {} ({})", operation, self.message, self.kind.code());
            }
            ErrorCategory::Storage | ErrorCategory::System => {
                log::error!(
                    "{} failed: {} ({}){}",
                    operation,
                    self.message,
                    self.kind.code(),
                    match &self.cause {
                        Some(cause) => format!("; cause: {}", cause),
                        None => String::new(),
                    }
                );
            }
        }
    }
}

impl From<ModelError> for DomainError {
    fn from(e: ModelError) -> Self {
        let mut error = DomainError::new(e.kind, e.message);
        error.field = Some(e.field);
        if let Some(value) = e.value {
            error.details.insert("value".to_owned(), value);
        }
        error
    }
}

impl From<DbError> for DomainError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::AlreadyExists => {
                DomainError::new(ErrorKind::ResourceAlreadyExists, "Entity already exists")
            }
            DbError::BackendError(raw) => {
                log::error!("Database error: {}", raw);
                let mut error =
                    DomainError::new(ErrorKind::StorageError, "Database operation failed");
                error.cause = Some(raw);
                error
            }
            DbError::DataIntegrityError(raw) => {
                log::error!("Data integrity error: {}", raw);
                let mut error =
                    DomainError::new(ErrorKind::IntegrityViolation, "Database constraint violated");
                error.cause = Some(raw);
                error
            }
            DbError::NotFound => DomainError::new(ErrorKind::ResourceNotFound, "Entity not found"),
            DbError::Unavailable => {
                log::error!("Database unavailable");
                DomainError::new(ErrorKind::ConnectionError, "Database unavailable")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_total() {
        let mut codes = std::collections::HashSet::new();
        for kind in ALL_ERROR_KINDS {
            assert!(codes.insert(kind.code()), "Duplicate code {}", kind.code());
        }
        assert_eq!(18, codes.len());
    }

    #[test]
    fn test_every_kind_has_one_http_and_one_grpc_status() {
        // The match statements are exhaustive so this cannot panic; the
        // assertions below pin the mappings that callers depend on.
        for kind in ALL_ERROR_KINDS {
            let _ = kind.http_status();
            let _ = kind.grpc_code();
            let _ = kind.category();
        }

        assert_eq!(http::StatusCode::NOT_FOUND, ErrorKind::ResourceNotFound.http_status());
        assert_eq!(tonic::Code::NotFound, ErrorKind::ResourceNotFound.grpc_code());
        assert_eq!(http::StatusCode::CONFLICT, ErrorKind::Conflict.http_status());
        assert_eq!(tonic::Code::Aborted, ErrorKind::Conflict.grpc_code());
        assert_eq!(
            http::StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::BusinessRuleViolation.http_status()
        );
        assert_eq!(http::StatusCode::FORBIDDEN, ErrorKind::OperationNotAllowed.http_status());
        assert_eq!(
            tonic::Code::FailedPrecondition,
            ErrorKind::OperationNotAllowed.grpc_code()
        );
        assert_eq!(http::StatusCode::GATEWAY_TIMEOUT, ErrorKind::Timeout.http_status());
        assert_eq!(tonic::Code::ResourceExhausted, ErrorKind::RateLimitExceeded.grpc_code());
    }

    #[test]
    fn test_retryable_set() {
        let retryable: Vec<ErrorKind> =
            ALL_ERROR_KINDS.into_iter().filter(ErrorKind::is_retryable).collect();
        assert_eq!(
            vec![
                ErrorKind::Conflict,
                ErrorKind::ServiceUnavailable,
                ErrorKind::Timeout,
                ErrorKind::RateLimitExceeded,
            ],
            retryable
        );
    }

    #[test]
    fn test_not_found_details() {
        let e = DomainError::not_found("Book", 42);
        assert_eq!(ErrorKind::ResourceNotFound, e.kind);
        assert_eq!("Book with ID 42 not found", e.message);
        assert_eq!("Book", e.details["resource_type"]);
        assert_eq!("42", e.details["resource_id"]);
    }

    #[test]
    fn test_storage_errors_hide_backend_text() {
        let e = DomainError::from(DbError::BackendError("secret table is broken".to_owned()));
        assert_eq!(ErrorKind::StorageError, e.kind);
        assert_eq!("Database operation failed", e.message);
        assert_eq!(Some("secret table is broken".to_owned()), e.cause);
    }
}
