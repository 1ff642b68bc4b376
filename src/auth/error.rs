use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthErrorCode {
    ActionCode,
    Email,
    InvalidCredentials,
    InvalidUser,
    MultiFactor,
    RecentLoginRequired,
    UserCollision,
    AuthWeb,
    WeakPassword,
    Unknown,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::ActionCode => "auth/action-code",
            AuthErrorCode::Email => "auth/email",
            AuthErrorCode::InvalidCredentials => "auth/invalid-credentials",
            AuthErrorCode::InvalidUser => "auth/invalid-user",
            AuthErrorCode::MultiFactor => "auth/multi-factor",
            AuthErrorCode::RecentLoginRequired => "auth/recent-login-required",
            AuthErrorCode::UserCollision => "auth/user-collision",
            AuthErrorCode::AuthWeb => "auth/auth-web",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::Unknown => "auth/unknown",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthError {
    pub code: AuthErrorCode,
    message: String,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for AuthError {}

pub type AuthResult<T> = Result<T, AuthError>;

pub fn action_code(message: impl Into<String>) -> AuthError {
    AuthError::new(AuthErrorCode::ActionCode, message)
}

pub fn invalid_credentials(message: impl Into<String>) -> AuthError {
    AuthError::new(AuthErrorCode::InvalidCredentials, message)
}

pub fn invalid_user(message: impl Into<String>) -> AuthError {
    AuthError::new(AuthErrorCode::InvalidUser, message)
}

pub fn user_collision(message: impl Into<String>) -> AuthError {
    AuthError::new(AuthErrorCode::UserCollision, message)
}

pub fn missing_email(message: impl Into<String>) -> AuthError {
    AuthError::new(AuthErrorCode::Email, message)
}

pub fn unknown(message: impl Into<String>) -> AuthError {
    AuthError::new(AuthErrorCode::Unknown, message)
}
