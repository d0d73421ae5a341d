// Field-level validation for the provisioning request form.

use std::sync::LazyLock;

use regex::Regex;

/// ASCII letters, digits and hyphens, 3 to 32 characters, anchored.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{3,32}$").expect("name pattern is valid"));

/// Coarse `local@domain.tld` shape; not RFC 5322.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid"));

pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Per-field validity, derived from the current form contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldValidity {
    pub name: bool,
    pub email: bool,
}

impl FieldValidity {
    pub fn of(name: &str, email: &str) -> Self {
        FieldValidity {
            name: is_valid_name(name),
            email: is_valid_email(email),
        }
    }

    pub fn is_form_valid(&self) -> bool {
        self.name && self.email
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
