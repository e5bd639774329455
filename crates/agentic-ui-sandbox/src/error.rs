use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Timeout,
    MemoryLimit,
    ForbiddenAccess,
    SyntaxError,
    RuntimeError,
    SecurityViolation,
    ResourceLimit,
    UnsafeInput,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::MemoryLimit => "MEMORY_LIMIT",
            ErrorKind::ForbiddenAccess => "FORBIDDEN_ACCESS",
            ErrorKind::SyntaxError => "SYNTAX_ERROR",
            ErrorKind::RuntimeError => "RUNTIME_ERROR",
            ErrorKind::SecurityViolation => "SECURITY_VIOLATION",
            ErrorKind::ResourceLimit => "RESOURCE_LIMIT",
            ErrorKind::UnsafeInput => "UNSAFE_INPUT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed execution. The message is what the code (or the sandbox)
/// reported; the kind says which guard tripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct SandboxError {
    pub kind: ErrorKind,
    pub message: String,
}

impl SandboxError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SyntaxError, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    pub fn timeout(limit_ms: u64) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("Execution timed out after {limit_ms}ms"),
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
    Timeout,
}

impl ExecutionStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, ExecutionStatus::Pending | ExecutionStatus::Running)
    }
}
