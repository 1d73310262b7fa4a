//! Predicates for the enquiry and checkout prefill forms.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name must contain only letters and spaces")]
    InvalidName,
    #[error("Email address is not valid")]
    InvalidEmail,
    #[error("Phone number must be a 10-digit mobile number")]
    InvalidPhone,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z .'-]{1,79}$").expect("name pattern"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
            .expect("email pattern")
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\+91|0)?[6-9][0-9]{9}$").expect("phone pattern"))
}

pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_match(name.trim())
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email.trim())
}

/// Indian mobile numbers, with an optional `+91` or `0` prefix. Spaces and
/// dashes are ignored.
pub fn is_valid_phone(phone: &str) -> bool {
    let digits: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    phone_pattern().is_match(&digits)
}

/// Every failing field of a contact form, in form order.
pub fn validate_contact(form: &ContactForm) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    if !is_valid_name(&form.name) {
        errors.push(ValidationError::InvalidName);
    }
    if !is_valid_email(&form.email) {
        errors.push(ValidationError::InvalidEmail);
    }
    if !is_valid_phone(&form.phone) {
        errors.push(ValidationError::InvalidPhone);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
