use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageErrorCode {
    BucketNotFound,
    InvalidChecksum,
    NotAuthenticated,
    NotAuthorized,
    ObjectNotFound,
    ProjectNotFound,
    QuotaExceeded,
    RetryLimitExceeded,
    Unknown,
}

impl StorageErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageErrorCode::BucketNotFound => "storage/bucket-not-found",
            StorageErrorCode::InvalidChecksum => "storage/invalid-checksum",
            StorageErrorCode::NotAuthenticated => "storage/not-authenticated",
            StorageErrorCode::NotAuthorized => "storage/not-authorized",
            StorageErrorCode::ObjectNotFound => "storage/object-not-found",
            StorageErrorCode::ProjectNotFound => "storage/project-not-found",
            StorageErrorCode::QuotaExceeded => "storage/quota-exceeded",
            StorageErrorCode::RetryLimitExceeded => "storage/retry-limit-exceeded",
            StorageErrorCode::Unknown => "storage/unknown",
        }
    }
}

#[derive(Clone, Debug)]
pub struct StorageError {
    pub code: StorageErrorCode,
    message: String,
}

impl StorageError {
    pub fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for StorageError {}

pub type StorageResult<T> = Result<T, StorageError>;

pub fn object_not_found(message: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorCode::ObjectNotFound, message)
}

pub fn unknown(message: impl Into<String>) -> StorageError {
    StorageError::new(StorageErrorCode::Unknown, message)
}
