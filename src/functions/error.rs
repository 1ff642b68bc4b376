use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FunctionsErrorCode {
    Aborted,
    AlreadyExists,
    DataLoss,
    DeadlineExceeded,
    FailedPrecondition,
    Internal,
    InvalidArgument,
    NotFound,
    OutOfRange,
    PermissionDenied,
    ResourceExhausted,
    Unauthenticated,
    Unavailable,
    Unimplemented,
    Unknown,
}

impl FunctionsErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionsErrorCode::Aborted => "functions/aborted",
            FunctionsErrorCode::AlreadyExists => "functions/already-exists",
            FunctionsErrorCode::DataLoss => "functions/data-loss",
            FunctionsErrorCode::DeadlineExceeded => "functions/deadline-exceeded",
            FunctionsErrorCode::FailedPrecondition => "functions/failed-precondition",
            FunctionsErrorCode::Internal => "functions/internal",
            FunctionsErrorCode::InvalidArgument => "functions/invalid-argument",
            FunctionsErrorCode::NotFound => "functions/not-found",
            FunctionsErrorCode::OutOfRange => "functions/out-of-range",
            FunctionsErrorCode::PermissionDenied => "functions/permission-denied",
            FunctionsErrorCode::ResourceExhausted => "functions/resource-exhausted",
            FunctionsErrorCode::Unauthenticated => "functions/unauthenticated",
            FunctionsErrorCode::Unavailable => "functions/unavailable",
            FunctionsErrorCode::Unimplemented => "functions/unimplemented",
            FunctionsErrorCode::Unknown => "functions/unknown",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FunctionsError {
    pub code: FunctionsErrorCode,
    message: String,
}

impl FunctionsError {
    pub fn new(code: FunctionsErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for FunctionsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for FunctionsError {}

pub type FunctionsResult<T> = Result<T, FunctionsError>;

pub fn not_found(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::NotFound, message)
}

pub fn deadline_exceeded(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::DeadlineExceeded, message)
}

pub fn internal_error(message: impl Into<String>) -> FunctionsError {
    FunctionsError::new(FunctionsErrorCode::Internal, message)
}
