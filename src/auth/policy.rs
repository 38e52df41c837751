use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Password strength rule that a plaintext password failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("password must be at least 8 characters long")]
    TooShort,
    #[error("password must include at least one digit")]
    MissingDigit,
    #[error("password must include at least one special character")]
    MissingSpecial,
}

impl PolicyViolation {
    /// Machine-readable rule name, reported as the error `cause`.
    pub fn rule(&self) -> &'static str {
        match self {
            PolicyViolation::TooShort => "min_length",
            PolicyViolation::MissingDigit => "digit",
            PolicyViolation::MissingSpecial => "special_character",
        }
    }
}

lazy_static! {
    static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    static ref SPECIAL_RE: Regex = Regex::new(r"[^a-zA-Z0-9\s]").unwrap();
}

/// Checks a plaintext password against the strength rules, in order.
pub fn validate_password(plain: &str) -> Result<(), PolicyViolation> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(PolicyViolation::TooShort);
    }
    if !DIGIT_RE.is_match(plain) {
        return Err(PolicyViolation::MissingDigit);
    }
    if !SPECIAL_RE.is_match(plain) {
        return Err(PolicyViolation::MissingSpecial);
    }
    Ok(())
}
