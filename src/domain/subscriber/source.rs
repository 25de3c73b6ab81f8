use derive_more::Display;

const MAX_LENGTH: usize = 50;
pub const DEFAULT_SOURCE: &str = "landing-page";

/// Where a subscription came from, e.g. `landing-page` or `popup`.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display(fmt = "{}", _0)]
pub struct Source(String);

impl Default for Source {
    fn default() -> Self {
        Self(DEFAULT_SOURCE.to_owned())
    }
}

impl TryFrom<Option<String>> for Source {
    type Error = String;

    /// Absent or blank values fall back to the default source.
    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let Some(value) = value else {
            return Ok(Self::default());
        };

        let value = value.trim();
        if value.is_empty() {
            return Ok(Self::default());
        }

        // the column is varchar(50), which counts characters
        if value.chars().count() > MAX_LENGTH {
            return Err(format!("Source must be at most {} characters", MAX_LENGTH));
        }

        Ok(Self(value.to_owned()))
    }
}

impl AsRef<str> for Source {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
