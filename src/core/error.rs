use thiserror::Error;

/// Used when neither the upstream body nor the transport explains the failure.
pub const DEFAULT_RATES_ERROR: &str = "Błąd podczas pobierania kursów walut";

/// Failure of the BFF rates fetch. The `Display` text is what consumers see.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RatesFetchError {
    /// Non-2xx response. `message` comes from the upstream error body when it had one.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Malformed(String),
}

impl RatesFetchError {
    pub fn transport(err: impl ToString) -> Self {
        RatesFetchError::Transport(non_empty_or_default(err.to_string()))
    }

    pub fn malformed(err: impl ToString) -> Self {
        RatesFetchError::Malformed(non_empty_or_default(err.to_string()))
    }
}

fn non_empty_or_default(message: String) -> String {
    if message.trim().is_empty() {
        DEFAULT_RATES_ERROR.to_string()
    } else {
        message
    }
}
