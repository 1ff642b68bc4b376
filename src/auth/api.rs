use async_trait::async_trait;

use crate::auth::error::AuthResult;
use crate::auth::local::UserHandle;
use crate::auth::types::{ActionCodeInfo, AdditionalUserInfo, AuthMethod, AuthProvider};

/// Signal stream for auth-state and id-token changes.
///
/// Subscribers receive a unit notification per change and re-query
/// `current_user` themselves.
pub type AuthStateStream = async_channel::Receiver<()>;

/// The user directory surface.
#[async_trait]
pub trait FirebaseAuth: Send + Sync {
    /// Consumes an action code, applying its effect (email verification,
    /// pending email change). Password reset codes cannot be applied here.
    async fn apply_action_code(&self, code: &str) -> AuthResult<()>;

    /// Looks up a pending action code without consuming it.
    async fn check_action_code(&self, code: &str) -> AuthResult<ActionCodeInfo>;

    /// Consumes a password reset code and replaces the password of the user
    /// the code was issued for.
    async fn confirm_password_reset(&self, code: &str, new_password: &str) -> AuthResult<()>;

    /// Lists the providers an email identity is registered under.
    async fn fetch_sign_in_providers_for_email(&self, email: &str)
        -> AuthResult<Vec<AuthProvider>>;

    /// Mints a password reset code for the email.
    async fn send_password_reset_email(&self, email: &str) -> AuthResult<()>;

    /// Mints a sign-in link code for the email.
    async fn send_sign_in_link_to_email(&self, email: &str) -> AuthResult<()>;

    /// Authenticates with the given credential, creating the user on first
    /// contact with a new identity.
    async fn sign_in(&self, method: AuthMethod) -> AuthResult<AdditionalUserInfo>;

    /// Validates a password reset code and returns the email it was issued
    /// for, without consuming it.
    async fn verify_password_reset_code(&self, code: &str) -> AuthResult<String>;

    fn is_sign_in_with_email_link(&self, link: &str) -> bool;

    fn sign_out(&self) -> AuthResult<()>;

    fn current_user(&self) -> Option<UserHandle>;

    /// Notifies on every sign-in, sign-out and reload.
    fn on_auth_state_change(&self) -> AuthResult<AuthStateStream>;

    /// Notifies on every auth-state change plus every token refresh.
    fn on_id_token_change(&self) -> AuthResult<AuthStateStream>;
}
