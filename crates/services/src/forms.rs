//! # Form validation
//!
//! Input shapes accepted by the presentation layer. Each form trims every
//! text field and checks it before anything reaches a service; `validate`
//! returns the trimmed form or the first rule it breaks.

use std::fmt;
use std::sync::LazyLock;

use domains::{DomainError, Result, Theme};
use regex::Regex;
use serde::Deserialize;

pub const MAX_WORDS: usize = 300;

static GMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.+-]+@gmail\.com$").expect("valid gmail pattern"));

static USERNAME_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Alphabetic}").expect("valid username start pattern"));

static USERNAME_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Alphabetic}\p{N}]$").expect("valid username end pattern"));

static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\p{Lu}").expect("valid uppercase pattern"));

static USERNAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._]+$").expect("valid username pattern"));

static NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+$").expect("valid name pattern"));

static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+0-9 ()-]+$").expect("valid phone pattern"));

static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}$").expect("valid code pattern"));

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::validation(msg)
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(invalid("Email is required."));
    }
    let length = email.chars().count();
    if !(6..=100).contains(&length) {
        return Err(invalid("Email must be between 6 and 100 characters."));
    }
    if !GMAIL.is_match(email) {
        return Err(invalid("Email must be a Gmail address."));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(invalid("Password is required."));
    }
    if password.chars().count() < 8 {
        return Err(invalid("Password must be at least 8 characters."));
    }
    Ok(())
}

fn validate_confirmation(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(invalid("Passwords must match."));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() {
        return Err(invalid("Username is required."));
    }
    if !(2..=20).contains(&username.chars().count()) {
        return Err(invalid("Username must be between 2 and 20 characters."));
    }
    if !USERNAME_START.is_match(username) {
        return Err(invalid("Username must start with a letter."));
    }
    if !USERNAME_END.is_match(username) {
        return Err(invalid("Username must end with a letter or digit."));
    }
    if UPPERCASE.is_match(username) {
        return Err(invalid("Username must use only lowercase letters."));
    }
    if !USERNAME_CHARS.is_match(username) {
        return Err(invalid("Username may only contain lowercase letters, digits, '.' or '_'."));
    }
    Ok(())
}

fn validate_words(text: &str) -> Result<()> {
    if word_count(text) > MAX_WORDS {
        return Err(invalid(format!("Cannot exceed {MAX_WORDS} words.")));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl RegisterForm {
    pub fn validate(self) -> Result<Self> {
        let form = Self {
            email: trimmed(&self.email),
            password: trimmed(&self.password),
            confirm_password: trimmed(&self.confirm_password),
        };
        validate_email(&form.email)?;
        validate_password(&form.password)?;
        validate_confirmation(&form.password, &form.confirm_password)?;
        Ok(form)
    }
}

/// Also used for the admin login form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(self) -> Result<Self> {
        let form = Self { email: trimmed(&self.email), password: trimmed(&self.password) };
        validate_email(&form.email)?;
        validate_password(&form.password)?;
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

impl ForgotPasswordForm {
    pub fn validate(self) -> Result<Self> {
        let form = Self { email: trimmed(&self.email) };
        validate_email(&form.email)?;
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyCodeForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub code: String,
}

impl VerifyCodeForm {
    pub fn validate(self) -> Result<Self> {
        let form = Self { token: trimmed(&self.token), code: trimmed(&self.code) };
        if form.token.is_empty() {
            return Err(DomainError::invalid_code());
        }
        if !CODE.is_match(&form.code) {
            return Err(invalid("Enter the 4-digit code."));
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl ResetPasswordForm {
    pub fn validate(self) -> Result<Self> {
        let form = Self {
            token: trimmed(&self.token),
            password: trimmed(&self.password),
            confirm_password: trimmed(&self.confirm_password),
        };
        if form.token.is_empty() {
            return Err(DomainError::invalid_code());
        }
        validate_password(&form.password)?;
        validate_confirmation(&form.password, &form.confirm_password)?;
        Ok(form)
    }
}

/// Text part of the create and edit post forms. Images travel separately.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl PostForm {
    pub fn validate(self) -> Result<Self> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty()).map(String::from);
        let content = trimmed(&self.content);

        if title.as_ref().is_some_and(|t| t.chars().count() > 100) {
            return Err(invalid("Title must be at most 100 characters."));
        }
        if content.is_empty() {
            return Err(invalid("Content is required."));
        }
        validate_words(&content)?;
        Ok(Self { title, content })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub reply_to: Option<i64>,
}

impl CommentForm {
    pub fn validate(self) -> Result<Self> {
        let content = trimmed(&self.content);
        if content.is_empty() {
            return Err(invalid("Comment cannot be empty."));
        }
        if !(4..=200).contains(&content.chars().count()) {
            return Err(invalid("Comment must be between 4 and 200 characters."));
        }
        validate_words(&content)?;
        Ok(Self { content, reply_to: self.reply_to })
    }
}

/// An empty username means "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: Option<String>,
}

impl ProfileForm {
    pub fn validate(self) -> Result<Self> {
        let username = self.username.as_deref().map(str::trim).filter(|u| !u.is_empty()).map(String::from);
        if let Some(username) = &username {
            validate_username(username)?;
        }
        Ok(Self { username })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangePasswordForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

impl ChangePasswordForm {
    pub fn validate(self) -> Result<Self> {
        let form = Self {
            current_password: trimmed(&self.current_password),
            new_password: trimmed(&self.new_password),
            confirm_password: trimmed(&self.confirm_password),
        };
        validate_password(&form.current_password)?;
        validate_password(&form.new_password)?;
        validate_confirmation(&form.new_password, &form.confirm_password)?;
        Ok(form)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThemeForm {
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryKind {
    #[default]
    General,
    Hire,
}

impl fmt::Display for InquiryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InquiryKind::General => "General",
            InquiryKind::Hire => "Hiring",
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub inquiry: InquiryKind,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    pub fn validate(self) -> Result<Self> {
        let first_name = trimmed(&self.first_name);
        let last_name = trimmed(&self.last_name);
        let phone = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()).map(String::from);
        let message = trimmed(&self.message);

        for (label, name) in [("First name", &first_name), ("Last name", &last_name)] {
            if !(2..=50).contains(&name.len()) || !NAME.is_match(name) {
                return Err(invalid(format!("{label} must be 2 to 50 letters.")));
            }
        }
        if let Some(phone) = &phone {
            if !PHONE.is_match(phone) {
                return Err(invalid("Invalid phone number format."));
            }
        }
        if message.is_empty() {
            return Err(invalid("Message is required."));
        }
        if message.chars().count() > 300 {
            return Err(invalid("Message must be at most 300 characters."));
        }

        Ok(Self { first_name, last_name, inquiry: self.inquiry, phone, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(email: &str, password: &str) -> Result<LoginForm> {
        LoginForm { email: email.into(), password: password.into() }.validate()
    }

    fn register(email: &str, password: &str, confirm: &str) -> Result<RegisterForm> {
        RegisterForm { email: email.into(), password: password.into(), confirm_password: confirm.into() }
            .validate()
    }

    #[test]
    fn login_cases() {
        let cases = [
            ("user@gmail.com", "password123", true),
            ("user@gmail", "password123", false),
            ("user@bk.ru", "password123", false),
            ("user_gmail.com", "password123", false),
            ("user@gmail.com", "pass", false),
            ("", "password123", false),
            ("user@gmail.com", "", false),
            (" user@gmail.com ", "password123", true),
            ("user@gmail.com", " password123 ", true),
        ];
        for (email, password, valid) in cases {
            assert_eq!(login(email, password).is_ok(), valid, "{email:?} / {password:?}");
        }
    }

    #[test]
    fn register_cases() {
        let cases = [
            ("user@gmail.com", "password123", "password123", true),
            ("user@gmail.com", "password123", "password456", false),
            ("user@gmail.com", "password123", "", false),
            ("user@gmail.com", "pass", "pass", false),
            ("", "password123", "password123", false),
            ("user@gmail.com", "", "", false),
            (" user@gmail.com ", "password123", "password123", true),
            ("user@gmail.com", " password123 ", " password123 ", true),
        ];
        for (email, password, confirm, valid) in cases {
            assert_eq!(register(email, password, confirm).is_ok(), valid, "{email:?} / {password:?}");
        }
    }

    #[test]
    fn trimmed_values_are_returned() {
        let form = login(" user@gmail.com ", " password123 ").unwrap();
        assert_eq!(form.email, "user@gmail.com");
        assert_eq!(form.password, "password123");
    }

    #[test]
    fn mismatched_confirmation_message() {
        let err = register("user@gmail.com", "password123", "password124").unwrap_err();
        assert_eq!(err, DomainError::validation("Passwords must match."));
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("jane.doe_1").is_ok());
        assert!(validate_username("j").is_err());
        assert!(validate_username("1jane").is_err());
        assert!(validate_username("jane_").is_err());
        assert_eq!(
            validate_username("Jane").unwrap_err(),
            DomainError::validation("Username must use only lowercase letters.")
        );
        assert!(validate_username("jane-doe").is_err());
        assert!(validate_username("averyveryverylongname1").is_err());
    }

    #[test]
    fn post_content_word_limit() {
        let long = "word ".repeat(301);
        assert!(PostForm { title: None, content: long }.validate().is_err());

        let ok = PostForm { title: Some("   ".into()), content: " hello #rust ".into() }.validate().unwrap();
        assert_eq!(ok.title, None);
        assert_eq!(ok.content, "hello #rust");
    }

    #[test]
    fn comment_length_bounds() {
        assert!(CommentForm { content: "abc".into(), reply_to: None }.validate().is_err());
        assert!(CommentForm { content: "  nice  ".into(), reply_to: None }.validate().is_ok());
        assert!(CommentForm { content: "x".repeat(201), reply_to: None }.validate().is_err());
    }

    #[test]
    fn contact_form_rules() {
        let base = ContactForm {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            inquiry: InquiryKind::Hire,
            phone: Some("+1 (555) 010-9999".into()),
            message: "Hello there".into(),
        };
        assert!(base.clone().validate().is_ok());
        assert!(ContactForm { first_name: "A".into(), ..base.clone() }.validate().is_err());
        assert!(ContactForm { last_name: "O'Neil".into(), ..base.clone() }.validate().is_err());
        assert!(ContactForm { phone: Some("call me".into()), ..base.clone() }.validate().is_err());
        assert!(ContactForm { phone: Some("  ".into()), ..base.clone() }.validate().is_ok());
        assert!(ContactForm { message: "m".repeat(301), ..base }.validate().is_err());
    }

    #[test]
    fn gmail_pattern_edges() {
        assert!(validate_email("first.last+tag@gmail.com").is_ok());
        assert!(validate_email("@gmail.com").is_err());
        assert!(validate_email("user@gmail.com.evil").is_err());
        assert!(validate_email("us er@gmail.com").is_err());
        assert!(validate_email("user@GMAIL.com").is_err());
    }

    #[test]
    fn verify_code_requires_four_digits() {
        let form = VerifyCodeForm { token: "t".into(), code: " 1234 ".into() }.validate().unwrap();
        assert_eq!(form.code, "1234");
        assert!(VerifyCodeForm { token: "t".into(), code: "12a4".into() }.validate().is_err());
        assert!(VerifyCodeForm { token: "t".into(), code: "12345".into() }.validate().is_err());
        assert!(VerifyCodeForm { token: "t".into(), code: "١٢٣٤".into() }.validate().is_err());
    }
}
