use chrono::{Duration, Utc};
use domains::{DomainError, NewVerificationCode, PasswordHasher, VerificationCodeRepository};
use integration_tests::{Harness, PlainHasher, RESET_CODE};
use services::forms::{ForgotPasswordForm, LoginForm, ResetPasswordForm, VerifyCodeForm};

fn verify(token: &str, code: &str) -> VerifyCodeForm {
    VerifyCodeForm { token: token.into(), code: code.into() }
}

fn reset(token: &str, password: &str) -> ResetPasswordForm {
    ResetPasswordForm { token: token.into(), password: password.into(), confirm_password: password.into() }
}

#[tokio::test]
async fn full_reset_flow_changes_the_password_once() {
    let h = Harness::new().await;
    h.user("alice").await;

    let requested = h.auth.request_reset(ForgotPasswordForm { email: "alice@gmail.com".into() }).await.unwrap();
    let token = requested.value;

    let mail = h.mailer.last().expect("reset mail sent");
    assert_eq!(mail.to, "alice@gmail.com");
    assert_eq!(mail.subject, "Password Reset Code");
    assert!(mail.html_body.contains(RESET_CODE));
    assert!(mail.html_body.contains(&format!("verify-code?token={token}")));

    h.auth.confirm_code(verify(&token, RESET_CODE)).await.unwrap();
    let done = h.auth.reset_password(reset(&token, "brandnewpass")).await.unwrap();
    assert_eq!(done.message, "Password reset successfully.");

    let login = LoginForm { email: "alice@gmail.com".into(), password: "brandnewpass".into() };
    assert!(h.auth.login(login).await.is_ok());

    // The code is gone after use.
    assert_eq!(h.auth.reset_password(reset(&token, "anotherpass1")).await.unwrap_err(), DomainError::invalid_code());
}

#[tokio::test]
async fn confirming_twice_fails() {
    let h = Harness::new().await;
    h.user("alice").await;
    let token = h.auth.request_reset(ForgotPasswordForm { email: "alice@gmail.com".into() }).await.unwrap().value;

    h.auth.confirm_code(verify(&token, RESET_CODE)).await.unwrap();
    let err = h.auth.confirm_code(verify(&token, RESET_CODE)).await.unwrap_err();
    assert_eq!(err, DomainError::invalid_code());
}

#[tokio::test]
async fn reset_without_confirmation_fails() {
    let h = Harness::new().await;
    h.user("alice").await;
    let token = h.auth.request_reset(ForgotPasswordForm { email: "alice@gmail.com".into() }).await.unwrap().value;

    let err = h.auth.reset_password(reset(&token, "brandnewpass")).await.unwrap_err();
    assert_eq!(err, DomainError::invalid_code());
}

#[tokio::test]
async fn wrong_code_is_indistinguishable_from_expired() {
    let h = Harness::new().await;
    h.user("alice").await;
    let token = h.auth.request_reset(ForgotPasswordForm { email: "alice@gmail.com".into() }).await.unwrap().value;

    let wrong = h.auth.confirm_code(verify(&token, "1111")).await.unwrap_err();
    let unknown = h.auth.confirm_code(verify("no-such-token", RESET_CODE)).await.unwrap_err();
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn expired_codes_fail_and_are_swept() {
    let h = Harness::new().await;
    let alice = h.user("alice").await;

    VerificationCodeRepository::create(
        h.store.as_ref(),
        NewVerificationCode {
            user_id: alice.id,
            code_hash: PlainHasher.hash(RESET_CODE).unwrap(),
            token: "stale".into(),
            expires_at: Utc::now() - Duration::seconds(1),
        },
    )
    .await
    .unwrap();
    let fresh = h.auth.request_reset(ForgotPasswordForm { email: "alice@gmail.com".into() }).await.unwrap().value;

    assert_eq!(h.auth.confirm_code(verify("stale", RESET_CODE)).await.unwrap_err(), DomainError::invalid_code());

    let removed = h.auth.sweep_expired_codes(Utc::now()).await.unwrap();
    assert_eq!(removed, 1);
    assert!(h.store.find_by_token("stale").await.unwrap().is_none());
    assert!(h.store.find_by_token(&fresh).await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_and_admin_emails_cannot_request_a_reset() {
    let h = Harness::new().await;
    h.admin().await;

    for email in ["nobody@gmail.com", integration_tests::ADMIN_EMAIL] {
        let err = h.auth.request_reset(ForgotPasswordForm { email: email.into() }).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)), "{email}");
    }
    assert!(h.mailer.last().is_none());
}
