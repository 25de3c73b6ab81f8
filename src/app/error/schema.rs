/// Body of every non-success response that is not a subscription outcome.
#[derive(serde::Serialize)]
pub struct Error {
    pub success: bool,
    pub message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
