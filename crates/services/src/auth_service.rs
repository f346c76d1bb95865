//! Registration, sign-in and the email-based password reset.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use domains::{
    CodeGenerator, CodeState, DomainError, FederatedIdentity, Mailer, NewUser, NewVerificationCode,
    Outcome, OutgoingMail, PasswordHasher, Result, User, UserRepository, UserRole,
    VerificationCode, VerificationCodeRepository,
};

use crate::forms::{ForgotPasswordForm, LoginForm, RegisterForm, ResetPasswordForm, VerifyCodeForm};
use crate::templates::{render, ResetCodeEmail};

const INVALID_CREDENTIALS: &str = "Invalid credentials. Please try again.";

/// Deployment-specific knobs of the auth flows.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// The single admin account; it may only sign in through the admin form.
    pub admin_email: String,
    pub code_ttl: Duration,
    /// Base of the verification link in reset emails, without a trailing slash.
    pub public_base_url: String,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    codes: Arc<dyn VerificationCodeRepository>,
    hasher: Arc<dyn PasswordHasher>,
    generator: Arc<dyn CodeGenerator>,
    mailer: Arc<dyn Mailer>,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        codes: Arc<dyn VerificationCodeRepository>,
        hasher: Arc<dyn PasswordHasher>,
        generator: Arc<dyn CodeGenerator>,
        mailer: Arc<dyn Mailer>,
        policy: AuthPolicy,
    ) -> Self {
        Self { users, codes, hasher, generator, mailer, policy }
    }

    fn is_admin_email(&self, email: &str) -> bool {
        email.eq_ignore_ascii_case(&self.policy.admin_email)
    }

    /// `usr.<millis>`, bumped until it is free.
    async fn generate_username(&self) -> Result<String> {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let candidate = format!("usr.{millis}");
            if self.users.find_by_username(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            millis += 1;
        }
    }

    pub async fn register(&self, form: RegisterForm) -> Result<Outcome<User>> {
        if self.users.find_by_email(&form.email).await?.is_some() {
            return Err(DomainError::conflict("This email is already registered."));
        }

        let user = self
            .users
            .create(NewUser {
                username: self.generate_username().await?,
                email: form.email,
                password_hash: Some(self.hasher.hash(&form.password)?),
                google_id: None,
                avatar_url: None,
                role: UserRole::User,
            })
            .await?;

        tracing::info!(user_id = user.id, "account registered");
        Ok(Outcome::new(user, "Account created!"))
    }

    pub async fn login(&self, form: LoginForm) -> Result<Outcome<User>> {
        let user = self
            .users
            .find_by_email(&form.email)
            .await?
            .filter(|u| !self.is_admin_email(&u.email) && !u.is_admin())
            .filter(|u| {
                u.password_hash.as_deref().is_some_and(|hash| self.hasher.verify(&form.password, hash))
            })
            .ok_or_else(|| DomainError::forbidden(INVALID_CREDENTIALS))?;

        let message = format!("Welcome back, {}!", user.username);
        Ok(Outcome::new(user, message))
    }

    pub async fn admin_login(&self, form: LoginForm) -> Result<Outcome<User>> {
        let invalid = || DomainError::forbidden("Invalid admin credentials.");

        if !self.is_admin_email(&form.email) {
            return Err(invalid());
        }

        let admin = self
            .users
            .find_by_email(&self.policy.admin_email)
            .await?
            .filter(User::is_admin)
            .filter(|u| {
                u.password_hash.as_deref().is_some_and(|hash| self.hasher.verify(&form.password, hash))
            })
            .ok_or_else(invalid)?;

        tracing::info!(user_id = admin.id, "admin signed in");
        Ok(Outcome::new(admin, "Welcome back, boss!"))
    }

    /// Links the identity to an existing account with the same email, or
    /// creates a password-less account for it.
    pub async fn federated_sign_in(&self, identity: FederatedIdentity) -> Result<Outcome<User>> {
        if let Some(mut user) = self.users.find_by_email(&identity.email).await? {
            if user.is_admin() {
                return Err(DomainError::forbidden(INVALID_CREDENTIALS));
            }
            user.google_id = Some(identity.subject);
            if user.avatar_url.is_none() {
                user.avatar_url = identity.avatar_url;
            }
            self.users.save(&user).await?;

            let message = format!("Welcome back, {}!", user.username);
            return Ok(Outcome::new(user, message));
        }

        let user = self
            .users
            .create(NewUser {
                username: self.generate_username().await?,
                email: identity.email,
                password_hash: None,
                google_id: Some(identity.subject),
                avatar_url: identity.avatar_url,
                role: UserRole::User,
            })
            .await?;

        tracing::info!(user_id = user.id, "account created through google sign-in");
        Ok(Outcome::new(user, "Account created successfully!"))
    }

    /// Mails a fresh code and returns the lookup token the client must
    /// present with it.
    pub async fn request_reset(&self, form: ForgotPasswordForm) -> Result<Outcome<String>> {
        let user = self
            .users
            .find_by_email(&form.email)
            .await?
            .filter(|u| !self.is_admin_email(&u.email) && !u.is_admin() && u.password_hash.is_some())
            .ok_or_else(|| DomainError::forbidden(INVALID_CREDENTIALS))?;

        let code = self.generator.numeric_code();
        let record = self
            .codes
            .create(NewVerificationCode {
                user_id: user.id,
                code_hash: self.hasher.hash(&code)?,
                token: self.generator.lookup_token(),
                expires_at: Utc::now() + self.policy.code_ttl,
            })
            .await?;

        let verification_link = format!(
            "{}/auth/verify-code?token={}",
            self.policy.public_base_url.trim_end_matches('/'),
            record.token
        );
        let html_body = render(&ResetCodeEmail { code: &code, verification_link: &verification_link })?;

        self.mailer
            .send(OutgoingMail { to: user.email, subject: "Password Reset Code".into(), html_body })
            .await?;

        tracing::info!(user_id = user.id, "password reset code sent");
        Ok(Outcome::new(record.token, "A verification code has been sent to your email."))
    }

    async fn code_in_state(
        &self,
        token: &str,
        wanted: CodeState,
        now: DateTime<Utc>,
    ) -> Result<VerificationCode> {
        self.codes
            .find_by_token(token)
            .await?
            .filter(|record| record.state_at(now) == wanted)
            .ok_or_else(DomainError::invalid_code)
    }

    /// Pending → confirmed. Any other starting state fails.
    pub async fn confirm_code(&self, form: VerifyCodeForm) -> Result<Outcome> {
        let record = self.code_in_state(&form.token, CodeState::Pending, Utc::now()).await?;

        if !self.hasher.verify(&form.code, &record.code_hash) {
            return Err(DomainError::invalid_code());
        }
        self.codes.mark_valid(record.id).await?;

        Ok(Outcome::message("Code verified. You can now reset your password."))
    }

    /// Confirmed → consumed: sets the new password and deletes the code.
    pub async fn reset_password(&self, form: ResetPasswordForm) -> Result<Outcome> {
        let record = self.code_in_state(&form.token, CodeState::Confirmed, Utc::now()).await?;

        let password_hash = self.hasher.hash(&form.password)?;
        self.codes.consume(record.id, record.user_id, &password_hash).await?;

        tracing::info!(user_id = record.user_id, "password reset");
        Ok(Outcome::message("Password reset successfully."))
    }

    pub async fn sweep_expired_codes(&self, now: DateTime<Utc>) -> Result<u64> {
        self.codes.delete_expired(now).await
    }
}
