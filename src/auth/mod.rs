//! User directory surface and its in-memory backend.
//!
//! [`FirebaseAuth`] mirrors the hosted identity service: credential sign-in,
//! provider linking, action-code flows and change notification.
//! [`LocalAuth`] keeps the whole directory in memory.

pub mod api;
pub mod error;
pub mod local;
pub mod types;

pub use api::{AuthStateStream, FirebaseAuth};
pub use error::{AuthError, AuthErrorCode, AuthResult};
pub use local::{LocalAuth, UserHandle};
pub use types::{
    ActionCodeInfo, AdditionalUserInfo, AuthMethod, AuthProvider, TokenResult, UserInfo,
};
