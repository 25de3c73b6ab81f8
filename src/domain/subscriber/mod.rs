pub mod email;
pub mod source;

use chrono::{DateTime, Utc};

use self::email::Email;
use self::source::Source;

/// A validated subscription request, ready to be written to the store.
pub struct NewSubscriber {
    pub email: Email,
    pub source: Source,
    pub consent_given: bool,
}

/// A row of the `subscribers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub consent_given: bool,
    pub source: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub is_active: bool,
}
