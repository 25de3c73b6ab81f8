use derive_more::Display;
use validator::validate_email;

const MAX_LENGTH: usize = 254;

/// A syntactically valid email address in normalized form: trimmed and lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(fmt = "{}", _0)]
pub struct Email(String);

impl TryFrom<String> for Email {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_lowercase();

        if normalized.is_empty() {
            return Err("Email is required".into());
        }

        if normalized.chars().count() > MAX_LENGTH {
            return Err("Email address is too long".into());
        }

        if !validate_email(normalized.as_str()) {
            return Err("Please enter a valid email address".into());
        }

        Ok(Self(normalized))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
