use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::auth::api::{AuthStateStream, FirebaseAuth};
use crate::auth::error::{
    action_code, invalid_credentials, invalid_user, missing_email, unknown, user_collision,
    AuthResult,
};
use crate::auth::types::{
    ActionCodeInfo, AdditionalUserInfo, AuthMethod, AuthProvider, TokenResult, UserInfo,
};

const TOKEN_LIFETIME_HOURS: i64 = 1;

fn generate_uid() -> String {
    rand::thread_rng()
        .sample_iter(Alphanumeric)
        .take(28)
        .map(char::from)
        .collect()
}

fn generate_token() -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..64).map(|_| HEX[rng.gen_range(0..16)] as char).collect()
}

fn token_provider(provider: AuthProvider) -> Option<AuthProvider> {
    match provider {
        AuthProvider::Anonymous | AuthProvider::Custom => None,
        other => Some(other),
    }
}

struct UserRecord {
    uid: String,
    methods: Vec<AuthMethod>,
    last_provider: AuthProvider,
    is_anonymous: bool,
    display_name: Option<String>,
    photo_url: Option<String>,
    creation_timestamp: DateTime<Utc>,
    last_sign_in_timestamp: DateTime<Utc>,
    token: TokenResult,
}

impl UserRecord {
    fn new(method: AuthMethod) -> Self {
        let now = Utc::now();
        let provider = method.provider();
        Self {
            uid: generate_uid(),
            is_anonymous: provider == AuthProvider::Anonymous,
            last_provider: provider,
            methods: vec![method],
            display_name: None,
            photo_url: None,
            creation_timestamp: now,
            last_sign_in_timestamp: now,
            token: TokenResult {
                auth_timestamp: now,
                claims: BTreeMap::new(),
                expiration_timestamp: now + Duration::hours(TOKEN_LIFETIME_HOURS),
                issued_at_timestamp: now,
                sign_in_provider: token_provider(provider),
                token: generate_token(),
            },
        }
    }

    fn email(&self) -> Option<&str> {
        self.methods.iter().find_map(|method| match method {
            AuthMethod::EmailPassword { email, .. } => Some(email.as_str()),
            _ => None,
        })
    }
}

struct Directory {
    users: BTreeMap<String, UserRecord>,
    index: BTreeMap<(AuthProvider, String), String>,
    current: Option<String>,
    action_codes: BTreeMap<String, ActionCodeInfo>,
    next_code: u32,
    auth_watchers: Vec<async_channel::Sender<()>>,
    token_watchers: Vec<async_channel::Sender<()>>,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            users: BTreeMap::new(),
            index: BTreeMap::new(),
            current: None,
            action_codes: BTreeMap::new(),
            next_code: 100_000,
            auth_watchers: Vec::new(),
            token_watchers: Vec::new(),
        }
    }
}

impl Directory {
    fn mint_code(&mut self, info: ActionCodeInfo) -> String {
        let code = self.next_code.to_string();
        self.next_code += 1;
        self.action_codes.insert(code.clone(), info);
        code
    }

    fn user_mut(&mut self, uid: &str) -> AuthResult<&mut UserRecord> {
        self.users
            .get_mut(uid)
            .ok_or_else(|| invalid_user(format!("User {uid} no longer exists")))
    }

    fn uid_for_identity(&self, identity: &str) -> Option<String> {
        self.index
            .iter()
            .find(|((_, id), _)| id == identity)
            .map(|(_, uid)| uid.clone())
    }

    /// Replaces the stored email/password method atomically, keeping the
    /// provider index in step.
    fn replace_email_method(
        &mut self,
        uid: &str,
        email: Option<String>,
        password: Option<String>,
    ) -> AuthResult<()> {
        let user = self.user_mut(uid)?;
        let Some(position) = user
            .methods
            .iter()
            .position(|method| matches!(method, AuthMethod::EmailPassword { .. }))
        else {
            return Err(unknown(
                "Cannot update the credentials of a non email/password user",
            ));
        };
        let AuthMethod::EmailPassword {
            email: old_email,
            password: old_password,
        } = user.methods.remove(position)
        else {
            return Err(unknown("Email/password credential is missing"));
        };
        let new_email = email.unwrap_or_else(|| old_email.clone());
        user.methods.push(AuthMethod::EmailPassword {
            email: new_email.clone(),
            password: password.unwrap_or(old_password),
        });
        if new_email != old_email {
            self.index.remove(&(AuthProvider::EmailPassword, old_email));
            self.index
                .insert((AuthProvider::EmailPassword, new_email), uid.to_string());
        }
        Ok(())
    }

    fn notify_auth(&mut self) {
        self.auth_watchers
            .retain(|sender| sender.try_send(()).is_ok());
        self.token_watchers
            .retain(|sender| sender.try_send(()).is_ok());
    }

    fn notify_token(&mut self) {
        self.token_watchers
            .retain(|sender| sender.try_send(()).is_ok());
    }
}

/// In-memory user directory.
///
/// Users are indexed by `(provider, identity)` pairs; federated methods use
/// their identity hint as the key since no OAuth flow runs locally. Action
/// codes are sequential numeric strings starting at 100000, single-use, and
/// utterly unsuitable as real credentials.
#[derive(Clone, Default)]
pub struct LocalAuth {
    inner: Arc<Mutex<Directory>>,
}

impl LocalAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AuthResult<MutexGuard<'_, Directory>> {
        self.inner
            .lock()
            .map_err(|_| unknown("Auth directory lock poisoned"))
    }
}

#[async_trait]
impl FirebaseAuth for LocalAuth {
    async fn apply_action_code(&self, code: &str) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let info = dir
            .action_codes
            .get(code)
            .cloned()
            .ok_or_else(|| action_code(format!("The action code is invalid: {code}")))?;
        match info {
            ActionCodeInfo::PasswordReset { .. } => {
                return Err(action_code(format!(
                    "Password reset code cannot be applied: {code}"
                )))
            }
            ActionCodeInfo::SignInWithEmailLink => {
                return Err(action_code(format!(
                    "Sign-in link codes are consumed at sign-in: {code}"
                )))
            }
            ActionCodeInfo::VerifyEmail { .. } => {}
            ActionCodeInfo::VerifyBeforeChangeEmail { email, .. } => {
                let uid = dir
                    .current
                    .clone()
                    .ok_or_else(|| invalid_user("No user is currently signed in"))?;
                dir.replace_email_method(&uid, Some(email), None)?;
            }
        }
        dir.action_codes.remove(code);
        Ok(())
    }

    async fn check_action_code(&self, code: &str) -> AuthResult<ActionCodeInfo> {
        let dir = self.lock()?;
        dir.action_codes
            .get(code)
            .cloned()
            .ok_or_else(|| action_code(format!("The supplied action code is invalid: {code}")))
    }

    async fn confirm_password_reset(&self, code: &str, new_password: &str) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let Some(ActionCodeInfo::PasswordReset { email }) = dir.action_codes.get(code).cloned()
        else {
            return Err(action_code(format!(
                "The password reset code is invalid: {code}"
            )));
        };
        let uid = dir
            .index
            .get(&(AuthProvider::EmailPassword, email.clone()))
            .cloned()
            .ok_or_else(|| invalid_user(format!("No user is registered for {email}")))?;
        dir.action_codes.remove(code);
        dir.replace_email_method(&uid, None, Some(new_password.to_string()))
    }

    async fn fetch_sign_in_providers_for_email(
        &self,
        email: &str,
    ) -> AuthResult<Vec<AuthProvider>> {
        let dir = self.lock()?;
        Ok(dir
            .index
            .keys()
            .filter(|(_, identity)| identity == email)
            .map(|(provider, _)| *provider)
            .collect())
    }

    async fn send_password_reset_email(&self, email: &str) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let code = dir.mint_code(ActionCodeInfo::PasswordReset {
            email: email.to_string(),
        });
        debug!("minted password reset code {code} for {email}");
        Ok(())
    }

    async fn send_sign_in_link_to_email(&self, email: &str) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let code = dir.mint_code(ActionCodeInfo::SignInWithEmailLink);
        debug!("minted sign-in link code {code} for {email}");
        Ok(())
    }

    async fn sign_in(&self, method: AuthMethod) -> AuthResult<AdditionalUserInfo> {
        let mut dir = self.lock()?;
        let provider = method.provider();
        let identity = method.identity().to_string();

        if let AuthMethod::EmailLink { email, link } = &method {
            let uid = dir.uid_for_identity(email).ok_or_else(|| {
                invalid_user("Email link can only be added to an existing user")
            })?;
            if dir.action_codes.remove(link).is_none() {
                return Err(invalid_credentials(format!(
                    "Email link provided is invalid: {link}"
                )));
            }
            let user = dir.user_mut(&uid)?;
            if !user
                .methods
                .iter()
                .any(|method| method.provider() == AuthProvider::EmailLink)
            {
                user.methods.push(method.clone());
            }
            user.last_provider = AuthProvider::EmailLink;
            user.last_sign_in_timestamp = Utc::now();
            dir.index
                .insert((AuthProvider::EmailLink, email.clone()), uid.clone());
            dir.current = Some(uid);
            dir.notify_auth();
            return Ok(AdditionalUserInfo::new(false));
        }

        if let Some(uid) = dir.index.get(&(provider, identity.clone())).cloned() {
            let user = dir.user_mut(&uid)?;
            if !user.methods.contains(&method) {
                return Err(invalid_credentials(
                    if provider == AuthProvider::EmailPassword {
                        "Could not authenticate with invalid password".to_string()
                    } else {
                        format!("User cannot be authenticated with method: {method:?}")
                    },
                ));
            }
            user.last_provider = provider;
            user.last_sign_in_timestamp = Utc::now();
            dir.current = Some(uid);
            dir.notify_auth();
            return Ok(AdditionalUserInfo::new(false));
        }

        if dir.uid_for_identity(&identity).is_some() {
            return Err(user_collision(format!(
                "User with identity {identity} already exists"
            )));
        }
        let user = UserRecord::new(method);
        let uid = user.uid.clone();
        debug!("created user {uid} via {}", provider.as_str());
        dir.users.insert(uid.clone(), user);
        dir.index.insert((provider, identity), uid.clone());
        dir.current = Some(uid);
        dir.notify_auth();
        Ok(AdditionalUserInfo::new(true))
    }

    async fn verify_password_reset_code(&self, code: &str) -> AuthResult<String> {
        let dir = self.lock()?;
        match dir.action_codes.get(code) {
            Some(ActionCodeInfo::PasswordReset { email }) => Ok(email.clone()),
            _ => Err(action_code(format!(
                "The password reset code is invalid: {code}"
            ))),
        }
    }

    fn is_sign_in_with_email_link(&self, _link: &str) -> bool {
        false
    }

    fn sign_out(&self) -> AuthResult<()> {
        let mut dir = self.lock()?;
        dir.current = None;
        dir.notify_auth();
        Ok(())
    }

    fn current_user(&self) -> Option<UserHandle> {
        let dir = self.inner.lock().ok()?;
        dir.current.clone().map(|uid| UserHandle {
            uid,
            inner: Arc::clone(&self.inner),
        })
    }

    fn on_auth_state_change(&self) -> AuthResult<AuthStateStream> {
        let mut dir = self.lock()?;
        let (sender, receiver) = async_channel::unbounded();
        dir.auth_watchers.push(sender);
        Ok(receiver)
    }

    fn on_id_token_change(&self) -> AuthResult<AuthStateStream> {
        let mut dir = self.lock()?;
        let (sender, receiver) = async_channel::unbounded();
        dir.token_watchers.push(sender);
        Ok(receiver)
    }
}

/// A handle on one directory user. Cheap to clone; all reads go back to the
/// directory so concurrent handles observe each other's updates.
#[derive(Clone)]
pub struct UserHandle {
    uid: String,
    inner: Arc<Mutex<Directory>>,
}

impl UserHandle {
    fn lock(&self) -> AuthResult<MutexGuard<'_, Directory>> {
        self.inner
            .lock()
            .map_err(|_| unknown("Auth directory lock poisoned"))
    }

    fn read<T>(&self, read: impl FnOnce(&UserRecord) -> T) -> AuthResult<T> {
        let dir = self.lock()?;
        let user = dir
            .users
            .get(&self.uid)
            .ok_or_else(|| invalid_user(format!("User {} no longer exists", self.uid)))?;
        Ok(read(user))
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn display_name(&self) -> AuthResult<Option<String>> {
        self.read(|user| user.display_name.clone())
    }

    pub fn email(&self) -> AuthResult<Option<String>> {
        self.read(|user| user.email().map(str::to_string))
    }

    pub fn photo_url(&self) -> AuthResult<Option<String>> {
        self.read(|user| user.photo_url.clone())
    }

    pub fn is_anonymous(&self) -> AuthResult<bool> {
        self.read(|user| user.is_anonymous)
    }

    pub fn creation_timestamp(&self) -> AuthResult<DateTime<Utc>> {
        self.read(|user| user.creation_timestamp)
    }

    pub fn last_sign_in_timestamp(&self) -> AuthResult<DateTime<Utc>> {
        self.read(|user| user.last_sign_in_timestamp)
    }

    pub fn provider_data(&self) -> AuthResult<Vec<UserInfo>> {
        self.read(|_| Vec::new())
    }

    /// Removes the user from every provider index and clears the current
    /// user pointer.
    pub async fn delete(self) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let user = dir
            .users
            .remove(&self.uid)
            .ok_or_else(|| invalid_user(format!("User {} no longer exists", self.uid)))?;
        for method in &user.methods {
            dir.index
                .remove(&(method.provider(), method.identity().to_string()));
        }
        if dir.current.as_deref() == Some(&self.uid) {
            dir.current = None;
        }
        dir.notify_auth();
        Ok(())
    }

    pub async fn get_id_token(&self, force_refresh: bool) -> AuthResult<TokenResult> {
        let mut dir = self.lock()?;
        let user = dir.user_mut(&self.uid)?;
        if force_refresh {
            let now = Utc::now();
            user.token = TokenResult {
                auth_timestamp: user.last_sign_in_timestamp,
                claims: BTreeMap::new(),
                expiration_timestamp: now + Duration::hours(TOKEN_LIFETIME_HOURS),
                issued_at_timestamp: now,
                sign_in_provider: token_provider(user.last_provider),
                token: generate_token(),
            };
            let token = user.token.clone();
            dir.notify_token();
            return Ok(token);
        }
        Ok(user.token.clone())
    }

    /// Adds another provider credential to this user.
    pub async fn link_method(&self, method: AuthMethod) -> AuthResult<AdditionalUserInfo> {
        let mut dir = self.lock()?;
        let provider = method.provider();
        let identity = method.identity().to_string();
        let user = dir.user_mut(&self.uid)?;
        if user.methods.iter().any(|m| m.provider() == provider) {
            return Err(invalid_credentials(format!(
                "The current user already has the provider for method: {method:?}"
            )));
        }
        user.methods.push(method);
        dir.index.insert((provider, identity), self.uid.clone());
        Ok(AdditionalUserInfo::new(false))
    }

    pub async fn reauthenticate(&self, method: AuthMethod) -> AuthResult<AdditionalUserInfo> {
        let dir = self.lock()?;
        let authenticated = dir
            .index
            .get(&(method.provider(), method.identity().to_string()))
            .and_then(|uid| dir.users.get(uid))
            .is_some_and(|user| user.methods.contains(&method));
        if authenticated {
            Ok(AdditionalUserInfo::new(false))
        } else {
            Err(invalid_credentials(format!(
                "Cannot reauthenticate with invalid method: {method:?}"
            )))
        }
    }

    pub async fn reload(&self) -> AuthResult<()> {
        let mut dir = self.lock()?;
        dir.notify_auth();
        Ok(())
    }

    pub async fn send_email_verification(&self) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let email = dir
            .users
            .get(&self.uid)
            .and_then(|user| user.email().map(str::to_string))
            .ok_or_else(|| missing_email("User has no email to verify"))?;
        dir.mint_code(ActionCodeInfo::VerifyEmail { email });
        Ok(())
    }

    pub async fn unlink_method(&self, provider: AuthProvider) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let user = dir.user_mut(&self.uid)?;
        let Some(position) = user
            .methods
            .iter()
            .position(|method| method.provider() == provider)
        else {
            return Err(invalid_credentials(format!(
                "The current user does not have the provider linked: {provider:?}"
            )));
        };
        let method = user.methods.remove(position);
        dir.index
            .remove(&(provider, method.identity().to_string()));
        Ok(())
    }

    pub async fn update_email(&self, email: &str) -> AuthResult<()> {
        let mut dir = self.lock()?;
        dir.replace_email_method(&self.uid, Some(email.to_string()), None)
    }

    pub async fn update_password(&self, password: &str) -> AuthResult<()> {
        let mut dir = self.lock()?;
        dir.replace_email_method(&self.uid, None, Some(password.to_string()))
    }

    pub async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let user = dir.user_mut(&self.uid)?;
        if let Some(display_name) = display_name {
            user.display_name = Some(display_name.to_string());
        }
        if let Some(photo_url) = photo_url {
            user.photo_url = Some(photo_url.to_string());
        }
        Ok(())
    }

    /// Mints a code that, once applied, changes this user's email to
    /// `new_email`.
    pub async fn verify_before_update_email(&self, new_email: &str) -> AuthResult<()> {
        let mut dir = self.lock()?;
        let previous = dir
            .users
            .get(&self.uid)
            .and_then(|user| user.email().map(str::to_string))
            .ok_or_else(|| missing_email("User has no email to change"))?;
        dir.mint_code(ActionCodeInfo::VerifyBeforeChangeEmail {
            email: new_email.to_string(),
            previous_email: previous,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email_method(email: &str, password: &str) -> AuthMethod {
        AuthMethod::EmailPassword {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn first_email_sign_in_creates_the_user() {
        let auth = LocalAuth::new();
        assert!(auth.current_user().is_none());

        let info = auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        assert!(info.is_new_user);

        let user = auth.current_user().unwrap();
        assert_eq!(user.uid().len(), 28);
        assert_eq!(user.email().unwrap().as_deref(), Some("a@b.c"));
        assert!(!user.is_anonymous().unwrap());

        let info = auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        assert!(!info.is_new_user);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();

        let err = auth
            .sign_in(email_method("a@b.c", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-credentials");
    }

    #[tokio::test]
    async fn same_identity_under_another_provider_collides() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        auth.sign_out().unwrap();

        let err = auth
            .sign_in(AuthMethod::Google {
                identity: "a@b.c".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/user-collision");
    }

    #[tokio::test]
    async fn anonymous_sign_in_marks_the_user() {
        let auth = LocalAuth::new();
        auth.sign_in(AuthMethod::Anonymous).await.unwrap();
        let user = auth.current_user().unwrap();
        assert!(user.is_anonymous().unwrap());

        let token = user.get_id_token(false).await.unwrap();
        assert_eq!(token.sign_in_provider, None);
    }

    #[tokio::test]
    async fn password_reset_flow_uses_sequential_single_use_codes() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("a@b.c", "old")).await.unwrap();
        auth.sign_out().unwrap();

        auth.send_password_reset_email("a@b.c").await.unwrap();
        assert_eq!(
            auth.verify_password_reset_code("100000").await.unwrap(),
            "a@b.c"
        );

        auth.confirm_password_reset("100000", "new").await.unwrap();
        let err = auth
            .confirm_password_reset("100000", "again")
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/action-code");

        let err = auth
            .sign_in(email_method("a@b.c", "old"))
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-credentials");
        auth.sign_in(email_method("a@b.c", "new")).await.unwrap();
    }

    #[tokio::test]
    async fn password_reset_code_cannot_be_applied() {
        let auth = LocalAuth::new();
        auth.send_password_reset_email("a@b.c").await.unwrap();
        let err = auth.apply_action_code("100000").await.unwrap_err();
        assert_eq!(err.code_str(), "auth/action-code");
        // The failed apply must not consume the code.
        auth.check_action_code("100000").await.unwrap();
    }

    #[tokio::test]
    async fn email_link_sign_in_requires_user_and_code() {
        let auth = LocalAuth::new();
        let err = auth
            .sign_in(AuthMethod::EmailLink {
                email: "a@b.c".into(),
                link: "100000".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-user");

        auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        auth.sign_out().unwrap();

        let err = auth
            .sign_in(AuthMethod::EmailLink {
                email: "a@b.c".into(),
                link: "100000".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-credentials");

        auth.send_sign_in_link_to_email("a@b.c").await.unwrap();
        let info = auth
            .sign_in(AuthMethod::EmailLink {
                email: "a@b.c".into(),
                link: "100000".into(),
            })
            .await
            .unwrap();
        assert!(!info.is_new_user);

        let providers = auth.fetch_sign_in_providers_for_email("a@b.c").await.unwrap();
        assert!(providers.contains(&AuthProvider::EmailPassword));
        assert!(providers.contains(&AuthProvider::EmailLink));
    }

    #[tokio::test]
    async fn link_and_unlink_manage_the_provider_index() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        let user = auth.current_user().unwrap();

        user.link_method(AuthMethod::Google {
            identity: "g@b.c".into(),
        })
        .await
        .unwrap();
        let err = user
            .link_method(AuthMethod::Google {
                identity: "other@b.c".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-credentials");

        let providers = auth.fetch_sign_in_providers_for_email("g@b.c").await.unwrap();
        assert_eq!(providers, vec![AuthProvider::Google]);

        user.unlink_method(AuthProvider::Google).await.unwrap();
        assert!(auth
            .fetch_sign_in_providers_for_email("g@b.c")
            .await
            .unwrap()
            .is_empty());

        let err = user.unlink_method(AuthProvider::Google).await.unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-credentials");
    }

    #[tokio::test]
    async fn update_email_moves_the_index_entry() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("old@b.c", "pw")).await.unwrap();
        let user = auth.current_user().unwrap();

        user.update_email("new@b.c").await.unwrap();
        auth.sign_out().unwrap();

        let info = auth.sign_in(email_method("new@b.c", "pw")).await.unwrap();
        assert!(!info.is_new_user);

        // The old identity was released, so it now registers a fresh user.
        let info = auth.sign_in(email_method("old@b.c", "pw")).await.unwrap();
        assert!(info.is_new_user);
    }

    #[tokio::test]
    async fn verify_before_update_email_applies_via_action_code() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("old@b.c", "pw")).await.unwrap();
        let user = auth.current_user().unwrap();

        user.verify_before_update_email("new@b.c").await.unwrap();
        let info = auth.check_action_code("100000").await.unwrap();
        assert_eq!(
            info,
            ActionCodeInfo::VerifyBeforeChangeEmail {
                email: "new@b.c".into(),
                previous_email: "old@b.c".into(),
            }
        );

        auth.apply_action_code("100000").await.unwrap();
        assert_eq!(user.email().unwrap().as_deref(), Some("new@b.c"));
        let err = auth.apply_action_code("100000").await.unwrap_err();
        assert_eq!(err.code_str(), "auth/action-code");
    }

    #[tokio::test]
    async fn reauthenticate_checks_the_stored_credential() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        let user = auth.current_user().unwrap();

        user.reauthenticate(email_method("a@b.c", "pw"))
            .await
            .unwrap();
        let err = user
            .reauthenticate(email_method("a@b.c", "bad"))
            .await
            .unwrap_err();
        assert_eq!(err.code_str(), "auth/invalid-credentials");
    }

    #[tokio::test]
    async fn delete_frees_the_identity() {
        let auth = LocalAuth::new();
        auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        auth.current_user().unwrap().delete().await.unwrap();
        assert!(auth.current_user().is_none());

        let info = auth.sign_in(email_method("a@b.c", "pw")).await.unwrap();
        assert!(info.is_new_user);
    }

    #[tokio::test]
    async fn auth_state_stream_signals_sign_in_and_out() {
        let auth = LocalAuth::new();
        let changes = auth.on_auth_state_change().unwrap();

        auth.sign_in(AuthMethod::Anonymous).await.unwrap();
        changes.recv().await.unwrap();
        auth.sign_out().unwrap();
        changes.recv().await.unwrap();
        assert!(changes.is_empty());
    }

    #[tokio::test]
    async fn token_refresh_signals_the_id_token_stream_only() {
        let auth = LocalAuth::new();
        auth.sign_in(AuthMethod::Anonymous).await.unwrap();

        let auth_changes = auth.on_auth_state_change().unwrap();
        let token_changes = auth.on_id_token_change().unwrap();

        let user = auth.current_user().unwrap();
        let first = user.get_id_token(false).await.unwrap();
        assert_eq!(first.token.len(), 64);
        let second = user.get_id_token(true).await.unwrap();
        assert_ne!(first.token, second.token);

        token_changes.recv().await.unwrap();
        assert!(auth_changes.is_empty());

        // Auth changes reach id-token subscribers as well.
        auth.sign_out().unwrap();
        token_changes.recv().await.unwrap();
        auth_changes.recv().await.unwrap();
    }

    #[tokio::test]
    async fn update_profile_keeps_unset_fields() {
        let auth = LocalAuth::new();
        auth.sign_in(AuthMethod::Anonymous).await.unwrap();
        let user = auth.current_user().unwrap();

        user.update_profile(Some("Ann"), None).await.unwrap();
        user.update_profile(None, Some("http://p")).await.unwrap();
        assert_eq!(user.display_name().unwrap().as_deref(), Some("Ann"));
        assert_eq!(user.photo_url().unwrap().as_deref(), Some("http://p"));
    }
}
