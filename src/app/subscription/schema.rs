use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::subscriber::{email::Email, source::Source, NewSubscriber};

pub const SUBSCRIBED: &str = "Successfully subscribed!";
pub const RESUBSCRIBED: &str = "Welcome back! You've been re-subscribed.";
pub const ALREADY_SUBSCRIBED: &str = "This email is already subscribed.";
pub const CONSENT_REQUIRED: &str = "You must agree to receive emails to subscribe.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    pub email: String,
    pub consent_given: bool,
    pub source: Option<String>,
    /// Honeypot: hidden from humans by the form, filled in by bots.
    pub website: Option<String>,
}

impl SubscribeBody {
    pub fn is_honeypot_filled(&self) -> bool {
        self.website.as_deref().is_some_and(|website| !website.is_empty())
    }
}

impl TryFrom<SubscribeBody> for NewSubscriber {
    type Error = String;

    fn try_from(value: SubscribeBody) -> Result<Self, Self::Error> {
        let email = Email::try_from(value.email)?;
        let source = Source::try_from(value.source)?;
        Ok(Self {
            email,
            source,
            consent_given: value.consent_given,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_subscribed: Option<bool>,
}

impl SubscribeResponse {
    fn success(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_owned(),
            already_subscribed: None,
        }
    }

    fn already_subscribed() -> Self {
        Self {
            success: false,
            message: ALREADY_SUBSCRIBED.to_owned(),
            already_subscribed: Some(true),
        }
    }
}

/// What a subscribe call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    /// A new subscriber was stored. Also what filtered bot traffic is told.
    Created,
    /// A previously unsubscribed record was made active again.
    Reactivated,
    /// The address is already actively subscribed; nothing changed.
    AlreadySubscribed,
}

impl IntoResponse for Subscription {
    fn into_response(self) -> Response {
        match self {
            Self::Created => {
                (StatusCode::CREATED, Json(SubscribeResponse::success(SUBSCRIBED))).into_response()
            }
            Self::Reactivated => {
                (StatusCode::CREATED, Json(SubscribeResponse::success(RESUBSCRIBED)))
                    .into_response()
            }
            Self::AlreadySubscribed => {
                (StatusCode::CONFLICT, Json(SubscribeResponse::already_subscribed())).into_response()
            }
        }
    }
}
