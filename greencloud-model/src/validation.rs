//! Field-level validation for incoming request bodies.
//!
//! Each field reports at most one message: the first rule it fails, checked
//! in declaration order. Messages are part of the public API contract and
//! are surfaced verbatim to clients.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::auth::{LogoutRequest, SignInRequest, SignUpRequest};

pub mod messages {
    pub const USERNAME_REQUIRED: &str = "유저명을 입력해주세요.";
    pub const EMAIL_REQUIRED: &str = "이메일을 입력해주세요.";
    pub const EMAIL_INVALID: &str = "올바른 이메일 형식이 아닙니다.";
    pub const PASSWORD_REQUIRED: &str = "비밀번호를 입력해주세요.";
    pub const PASSWORD_POLICY: &str =
        "비밀번호는 8~24자 내외, 대문자/소문자/숫자/특수문자를 포함해야 합니다.";
    pub const PASSWORD_CONFIRM_REQUIRED: &str = "비밀번호 확인을 입력해주세요.";
    pub const PASSWORD_MISMATCH: &str = "비밀번호가 일치하지 않습니다.";
    pub const REFRESH_TOKEN_REQUIRED: &str = "리프레시 토큰은 필수입니다.";
}

pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 24;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)*$")
        .expect("email pattern compiles")
});

/// Field name to failure message, serialized as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Records `message` for `field` unless the field already failed.
    pub fn add(&mut self, field: &str, message: &str) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// 8 to 24 characters with at least one lowercase letter, one uppercase
/// letter, one digit and one symbol (anything that is neither a word
/// character nor whitespace). Line breaks are never accepted.
pub fn meets_password_policy(password: &str) -> bool {
    let length = password.chars().count();
    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&length) {
        return false;
    }
    if password.chars().any(is_line_terminator) {
        return false;
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || is_space(c)));

    has_lower && has_upper && has_digit && has_symbol
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

/// ASCII whitespace including vertical tab. Other Unicode spaces count as
/// symbols.
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r')
}

/// Shared rule for an email supplied on its own (e.g. a query parameter).
pub fn validate_email_field(email: &str, errors: &mut FieldErrors) {
    if is_blank(email) {
        errors.add("email", messages::EMAIL_REQUIRED);
    } else if !is_valid_email(email) {
        errors.add("email", messages::EMAIL_INVALID);
    }
}

impl Validate for SignUpRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        if is_blank(&self.username) {
            errors.add("username", messages::USERNAME_REQUIRED);
        }

        validate_email_field(&self.email, &mut errors);

        if is_blank(&self.password) {
            errors.add("password", messages::PASSWORD_REQUIRED);
        } else if !meets_password_policy(&self.password) {
            errors.add("password", messages::PASSWORD_POLICY);
        }

        if is_blank(&self.password2) {
            errors.add("password2", messages::PASSWORD_CONFIRM_REQUIRED);
        } else if self.password != self.password2 {
            errors.add("password2", messages::PASSWORD_MISMATCH);
        }

        errors.into_result()
    }
}

impl Validate for SignInRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if is_blank(&self.email) {
            errors.add("email", messages::EMAIL_REQUIRED);
        }
        if is_blank(&self.password) {
            errors.add("password", messages::PASSWORD_REQUIRED);
        }
        errors.into_result()
    }
}

impl Validate for LogoutRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        if is_blank(&self.refresh_token) {
            errors.add("refreshToken", messages::REFRESH_TOKEN_REQUIRED);
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(password: &str, password2: &str) -> SignUpRequest {
        SignUpRequest {
            username: "u".into(),
            email: "a@a.com".into(),
            password: password.into(),
            password2: password2.into(),
        }
    }

    #[test]
    fn accepts_well_formed_sign_up() {
        assert!(sign_up("pw12345678@#2Q", "pw12345678@#2Q").validate().is_ok());
    }

    #[test]
    fn blank_email_reports_required_not_format() {
        let mut req = sign_up("pw12345678@A", "pw12345678@A");
        req.email = String::new();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(messages::EMAIL_REQUIRED));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut req = sign_up("pw12345678@A", "pw12345678@A");
        req.email = "not-email".into();
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(messages::EMAIL_INVALID));
    }

    #[test]
    fn password_policy_edges() {
        assert!(!meets_password_policy("Short1@"));
        assert!(meets_password_policy("Short12@"));
        assert!(!meets_password_policy("pw12345678"));
        assert!(!meets_password_policy("PW12345678@"));
        assert!(!meets_password_policy("Abcdefgh_1"));
        assert!(meets_password_policy("Abcdefghijklmnopqrstu1@x"));
        assert!(!meets_password_policy("Abcdefghijklmnopqrstu1@xy"));
        assert!(!meets_password_policy("Abc\ndef1@gh"));
        assert!(!meets_password_policy("Abcdef1@gh\u{2028}"));
        assert!(!meets_password_policy("Abc\u{85}def1@gh"));
        assert!(!meets_password_policy("Abc\u{2029}def1@gh"));
        assert!(meets_password_policy("Abcdefg1\u{a0}"));
        assert!(meets_password_policy("Abcdef1@\u{1F600}"));
    }

    #[test]
    fn overlong_password_reports_policy() {
        let long = "12345678213123812301287389128397218397218921837128372813783721sfasaefsaef";
        let errors = sign_up(long, long).validate().unwrap_err();
        assert_eq!(errors.get("password"), Some(messages::PASSWORD_POLICY));
    }

    #[test]
    fn mismatched_confirmation_is_attached_to_password2() {
        let errors = sign_up("pw12345678@A", "pw12345678@B")
            .validate()
            .unwrap_err();
        assert_eq!(errors.get("password2"), Some(messages::PASSWORD_MISMATCH));
        assert_eq!(errors.get("password"), None);
    }

    #[test]
    fn sign_in_only_checks_presence() {
        let errors = SignInRequest::default().validate().unwrap_err();
        assert_eq!(errors.get("email"), Some(messages::EMAIL_REQUIRED));
        assert_eq!(errors.get("password"), Some(messages::PASSWORD_REQUIRED));

        let ok = SignInRequest {
            email: "not-an-email".into(),
            password: "pw".into(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn logout_requires_refresh_token() {
        let errors = LogoutRequest::default().validate().unwrap_err();
        assert_eq!(
            errors.get("refreshToken"),
            Some(messages::REFRESH_TOKEN_REQUIRED)
        );
    }
}
