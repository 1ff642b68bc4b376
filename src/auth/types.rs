use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// The identity providers the user directory understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuthProvider {
    Anonymous,
    Custom,
    Apple,
    EmailPassword,
    EmailLink,
    GitHub,
    Google,
    Twitter,
    Yahoo,
}

impl AuthProvider {
    /// Parses a provider id string as produced by [`AuthProvider::as_str`].
    pub fn from_str(id: &str) -> Option<AuthProvider> {
        match id {
            "anonymous" => Some(AuthProvider::Anonymous),
            "custom" => Some(AuthProvider::Custom),
            "apple.com" => Some(AuthProvider::Apple),
            "password" => Some(AuthProvider::EmailPassword),
            "emailLink" => Some(AuthProvider::EmailLink),
            "github.com" => Some(AuthProvider::GitHub),
            "google.com" => Some(AuthProvider::Google),
            "twitter.com" => Some(AuthProvider::Twitter),
            "yahoo.com" => Some(AuthProvider::Yahoo),
            _ => None,
        }
    }

    /// The provider id string used by the hosted identity service.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Anonymous => "anonymous",
            AuthProvider::Custom => "custom",
            AuthProvider::Apple => "apple.com",
            AuthProvider::EmailPassword => "password",
            AuthProvider::EmailLink => "emailLink",
            AuthProvider::GitHub => "github.com",
            AuthProvider::Google => "google.com",
            AuthProvider::Twitter => "twitter.com",
            AuthProvider::Yahoo => "yahoo.com",
        }
    }
}

/// A credential presented at sign-in.
///
/// Federated providers carry an `identity` hint (typically the account's
/// email) since no real OAuth flow runs against the local directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthMethod {
    Anonymous,
    Custom { token: String },
    EmailPassword { email: String, password: String },
    EmailLink { email: String, link: String },
    Apple { identity: String },
    GitHub { identity: String },
    Google { identity: String },
    Twitter { identity: String },
    Yahoo { identity: String },
}

impl AuthMethod {
    pub fn provider(&self) -> AuthProvider {
        match self {
            AuthMethod::Anonymous => AuthProvider::Anonymous,
            AuthMethod::Custom { .. } => AuthProvider::Custom,
            AuthMethod::EmailPassword { .. } => AuthProvider::EmailPassword,
            AuthMethod::EmailLink { .. } => AuthProvider::EmailLink,
            AuthMethod::Apple { .. } => AuthProvider::Apple,
            AuthMethod::GitHub { .. } => AuthProvider::GitHub,
            AuthMethod::Google { .. } => AuthProvider::Google,
            AuthMethod::Twitter { .. } => AuthProvider::Twitter,
            AuthMethod::Yahoo { .. } => AuthProvider::Yahoo,
        }
    }

    /// The provider-scoped identity key the directory indexes users by.
    pub(crate) fn identity(&self) -> &str {
        match self {
            AuthMethod::Anonymous => "singleId",
            AuthMethod::Custom { token } => token,
            AuthMethod::EmailPassword { email, .. } => email,
            AuthMethod::EmailLink { email, .. } => email,
            AuthMethod::Apple { identity }
            | AuthMethod::GitHub { identity }
            | AuthMethod::Google { identity }
            | AuthMethod::Twitter { identity }
            | AuthMethod::Yahoo { identity } => identity,
        }
    }
}

/// What a pending action code authorizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionCodeInfo {
    PasswordReset { email: String },
    SignInWithEmailLink,
    VerifyEmail { email: String },
    VerifyBeforeChangeEmail { email: String, previous_email: String },
}

/// An issued id token and its envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenResult {
    pub auth_timestamp: DateTime<Utc>,
    pub claims: BTreeMap<String, String>,
    pub expiration_timestamp: DateTime<Utc>,
    pub issued_at_timestamp: DateTime<Utc>,
    pub sign_in_provider: Option<AuthProvider>,
    pub token: String,
}

/// Per-provider profile data attached to a user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserInfo {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub photo_url: Option<String>,
    pub provider_id: Option<String>,
    pub uid: Option<String>,
}

/// Extra context returned by sign-in, link and reauthenticate operations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdditionalUserInfo {
    pub profile: Option<BTreeMap<String, String>>,
    pub username: Option<String>,
    pub is_new_user: bool,
}

impl AdditionalUserInfo {
    pub(crate) fn new(is_new_user: bool) -> Self {
        Self {
            profile: None,
            username: None,
            is_new_user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers_use_service_id_strings() {
        assert_eq!(AuthProvider::EmailPassword.as_str(), "password");
        assert_eq!(AuthProvider::Google.as_str(), "google.com");
        assert_eq!(
            AuthProvider::from_str("emailLink"),
            Some(AuthProvider::EmailLink)
        );
        assert_eq!(AuthProvider::from_str("nope"), None);
    }

    #[test]
    fn identity_follows_the_method_kind() {
        let method = AuthMethod::EmailPassword {
            email: "a@b.c".into(),
            password: "pw".into(),
        };
        assert_eq!(method.identity(), "a@b.c");
        assert_eq!(method.provider(), AuthProvider::EmailPassword);

        let method = AuthMethod::Custom {
            token: "tok".into(),
        };
        assert_eq!(method.identity(), "tok");
        assert_eq!(AuthMethod::Anonymous.identity(), "singleId");
    }
}
