//! Field rules shared by add/edit validators.

use crate::pipeline::validation::ValidationResult;
use once_cell::sync::Lazy;
use regex::Regex;

const NAME_MAX_CHARS: usize = 100;
const EMAIL_MAX_CHARS: usize = 254;
const PHONE_MAX_CHARS: usize = 32;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9+()\-. ]+$").expect("valid phone regex"));

pub(super) fn check_contact_fields(
    result: &mut ValidationResult,
    name: &str,
    email: &str,
    phone_number: Option<&str>,
) {
    let name = name.trim();
    if name.is_empty() {
        result.add_failure("name", "must not be blank");
    } else if name.chars().count() > NAME_MAX_CHARS {
        result.add_failure(
            "name",
            format!("must be at most {NAME_MAX_CHARS} characters"),
        );
    }

    let email = email.trim();
    if email.is_empty() {
        result.add_failure("email", "must not be blank");
    } else if email.chars().count() > EMAIL_MAX_CHARS {
        result.add_failure(
            "email",
            format!("must be at most {EMAIL_MAX_CHARS} characters"),
        );
    } else if !EMAIL_RE.is_match(email) {
        result.add_failure("email", "must be a valid email address");
    }

    let Some(phone) = phone_number.map(str::trim).filter(|value| !value.is_empty()) else {
        return;
    };
    if phone.chars().count() > PHONE_MAX_CHARS {
        result.add_failure(
            "phone_number",
            format!("must be at most {PHONE_MAX_CHARS} characters"),
        );
    } else if !PHONE_RE.is_match(phone) {
        result.add_failure("phone_number", "may only contain digits, spaces and +()-.");
    }
}
