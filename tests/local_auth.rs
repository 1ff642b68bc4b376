use flare::auth::{AuthMethod, FirebaseAuth, LocalAuth};

fn email_method(email: &str, password: &str) -> AuthMethod {
    AuthMethod::EmailPassword {
        email: email.into(),
        password: password.into(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn repeat_sign_in_reuses_the_user() {
    let auth = LocalAuth::new();

    let info = auth.sign_in(email_method("a@b.com", "pw")).await.unwrap();
    assert!(info.is_new_user);
    auth.sign_out().unwrap();

    let info = auth.sign_in(email_method("a@b.com", "pw")).await.unwrap();
    assert!(!info.is_new_user);
    let user = auth.current_user().unwrap();
    assert_eq!(user.email().unwrap().as_deref(), Some("a@b.com"));
}

#[tokio::test(flavor = "multi_thread")]
async fn password_reset_replaces_the_credential() {
    let auth = LocalAuth::new();
    auth.sign_in(email_method("a@b.com", "pw")).await.unwrap();
    auth.sign_out().unwrap();

    auth.send_password_reset_email("a@b.com").await.unwrap();
    auth.confirm_password_reset("100000", "newpw").await.unwrap();

    let err = auth
        .sign_in(email_method("a@b.com", "pw"))
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "auth/invalid-credentials");

    let info = auth
        .sign_in(email_method("a@b.com", "newpw"))
        .await
        .unwrap();
    assert!(!info.is_new_user);
}
