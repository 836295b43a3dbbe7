use engine::EngineError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally; no request was sent.
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Maps a non-success status and its message to an error.
    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict(message),
            400 | 422 => Self::Validation(message),
            _ => Self::Server { status, message },
        }
    }

    /// The credential was refused; the session must be dropped.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden | Self::NotAuthenticated)
    }

    /// `true` when the error was raised before any request went out.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::NotAuthenticated)
    }

    /// Text shown to the user. Every view reports errors through this so the
    /// same failure reads the same everywhere.
    pub fn user_message(&self) -> String {
        match self {
            Self::Engine(EngineError::Permission(message)) => {
                format!("Not allowed: {message}")
            }
            Self::Engine(err) => err.to_string(),
            Self::NotAuthenticated | Self::Unauthorized => {
                "Your session has expired, please log in again.".to_string()
            }
            Self::Forbidden => "You do not have access to this trip.".to_string(),
            Self::NotFound => "Not found.".to_string(),
            Self::Conflict(message) => format!("Conflict: {message}"),
            Self::Validation(message) => format!("Rejected by server: {message}"),
            Self::Server { message, .. } => format!("Server error: {message}"),
            Self::Transport(err) => format!("Server unreachable: {err}"),
            Self::InvalidUrl(message) => format!("Invalid server address: {message}"),
            Self::Io(err) => format!("Local storage error: {err}"),
            Self::Json(err) => format!("Unexpected data: {err}"),
        }
    }
}
