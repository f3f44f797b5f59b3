//! Password policy applied before a password change is sent.

pub const MIN_LENGTH: usize = 8;

/// One rule a password can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordRule {
    MinLength,
    Lowercase,
    Uppercase,
    Digit,
    Special,
}

impl PasswordRule {
    pub fn describe(&self) -> String {
        match self {
            PasswordRule::MinLength => format!("at least {} characters", MIN_LENGTH),
            PasswordRule::Lowercase => "a lowercase letter".to_string(),
            PasswordRule::Uppercase => "an uppercase letter".to_string(),
            PasswordRule::Digit => "a digit".to_string(),
            PasswordRule::Special => "a special character".to_string(),
        }
    }
}

/// Every rule `password` breaks, in a fixed order. Empty means acceptable.
pub fn violations(password: &str) -> Vec<PasswordRule> {
    let mut broken = Vec::new();
    if password.chars().count() < MIN_LENGTH {
        broken.push(PasswordRule::MinLength);
    }
    if !password.chars().any(char::is_lowercase) {
        broken.push(PasswordRule::Lowercase);
    }
    if !password.chars().any(char::is_uppercase) {
        broken.push(PasswordRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        broken.push(PasswordRule::Digit);
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        broken.push(PasswordRule::Special);
    }
    broken
}

pub fn is_acceptable(password: &str) -> bool {
    violations(password).is_empty()
}
