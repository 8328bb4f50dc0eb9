use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("package manager '{name}' not found")]
    ManagerNotFound { name: String },

    #[error("package manager '{name}' not available")]
    ManagerNotAvailable { name: String },

    #[error("package manager '{name}' already registered")]
    AlreadyRegistered { name: String },

    #[error("project not found: {}", .path.display())]
    ProjectNotFound { path: PathBuf },

    #[error("package not found: {name}")]
    PackageNotFound { name: String },

    #[error("validation error for field '{field}' with value '{value}': {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{backend} {operation}: {source}")]
    Operation {
        backend: String,
        operation: &'static str,
        source: Box<BackendError>,
    },

    #[error("{operation} failed for {}", describe_failures(.failures))]
    Combined {
        operation: &'static str,
        failures: Vec<ManagerFailure>,
    },

    #[error("`{program}` exited with {}: {stderr}", describe_exit(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("IO error ({kind}): {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("failed to parse {context}: {details}")]
    Parse {
        context: &'static str,
        details: String,
    },

    #[error("Operation not supported by this backend: {operation}")]
    Unsupported { operation: &'static str },

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out")]
    Timeout,
}

/// One failed target of a best-effort "for all" write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerFailure {
    pub manager: String,
    pub error: BackendError,
}

fn describe_failures(failures: &[ManagerFailure]) -> String {
    let mut out = String::new();
    for (index, failure) in failures.iter().enumerate() {
        if index > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{} ({})", failure.manager, failure.error);
    }
    out
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(
        || "no exit code".to_string(),
        |code| format!("exit code {code}"),
    )
}

impl BackendError {
    pub fn operation(
        backend: impl Into<String>,
        operation: &'static str,
        source: BackendError,
    ) -> Self {
        Self::Operation {
            backend: backend.into(),
            operation,
            source: Box::new(source),
        }
    }

    pub fn validation(field: &'static str, value: impl Into<String>, reason: &'static str) -> Self {
        Self::Validation {
            field,
            value: value.into(),
            reason,
        }
    }

    pub fn parse_from<E>(context: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Parse {
            context,
            details: error.to_string(),
        }
    }

    /// Whether this error (or the cause it wraps) means "no manifest at the path".
    #[must_use]
    pub fn is_project_not_found(&self) -> bool {
        match self {
            Self::ProjectNotFound { .. } => true,
            Self::Operation { source, .. } => source.is_project_not_found(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Names of the managers listed by a [`BackendError::Combined`] error.
    #[must_use]
    pub fn failed_managers(&self) -> Vec<&str> {
        match self {
            Self::Combined { failures, .. } => {
                failures.iter().map(|f| f.manager.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::path::PathBuf;

    use super::{BackendError, ManagerFailure};

    #[test]
    fn io_error_conversion_maps_to_io_variant() {
        let mapped = BackendError::from(std::io::Error::other("permission denied"));
        assert!(matches!(
            mapped,
            BackendError::Io { kind, ref message }
                if kind == std::io::ErrorKind::Other && message.contains("permission denied")
        ));
    }

    #[test]
    fn operation_error_names_backend_and_operation() {
        let error = BackendError::operation(
            "npm",
            "get cache info",
            BackendError::CommandFailed {
                program: "npm".to_string(),
                code: Some(1),
                stderr: "boom".to_string(),
            },
        );

        assert_eq!(
            error.to_string(),
            "npm get cache info: `npm` exited with exit code 1: boom"
        );
        let source = error.source().expect("operation error exposes its cause");
        assert!(source.to_string().contains("boom"));
    }

    #[test]
    fn validation_error_formats_field_value_and_reason() {
        let error = BackendError::validation("registry", "invalid-url", "invalid URL format");

        assert_eq!(
            error.to_string(),
            "validation error for field 'registry' with value 'invalid-url': invalid URL format"
        );
        assert!(error.is_validation());
        assert!(error.source().is_none());
    }

    #[test]
    fn project_not_found_is_detected_through_operation_wrapper() {
        let bare = BackendError::ProjectNotFound {
            path: PathBuf::from("/tmp/nothing"),
        };
        let wrapped = BackendError::operation("yarn", "list packages", bare.clone());

        assert!(bare.is_project_not_found());
        assert!(wrapped.is_project_not_found());
        assert!(!BackendError::Timeout.is_project_not_found());
    }

    #[test]
    fn combined_error_lists_every_failed_manager() {
        let error = BackendError::Combined {
            operation: "clear cache",
            failures: vec![
                ManagerFailure {
                    manager: "bun".to_string(),
                    error: BackendError::Timeout,
                },
                ManagerFailure {
                    manager: "yarn".to_string(),
                    error: BackendError::Unsupported {
                        operation: "clear cache",
                    },
                },
            ],
        };

        assert_eq!(error.failed_managers(), vec!["bun", "yarn"]);
        let message = error.to_string();
        assert!(message.starts_with("clear cache failed for bun (operation timed out); yarn ("));
    }

    #[test]
    fn command_failed_without_exit_code_is_described() {
        let error = BackendError::CommandFailed {
            program: "pnpm".to_string(),
            code: None,
            stderr: "killed".to_string(),
        };

        assert_eq!(error.to_string(), "`pnpm` exited with no exit code: killed");
    }
}
