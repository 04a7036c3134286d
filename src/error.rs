use thiserror::Error;

pub const NOT_FOUND_NOTICE: &str = "User not found.";
pub const GENERIC_NOTICE: &str = "Something went wrong. Please try again.";
pub const EXPIRED_NOTICE: &str = "Your session has expired. Please log in again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("session is not authenticated")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("network failure: {0}")]
    Network(String),
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

/// How a failed call is surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    AuthExpired,
    NotFound,
    Generic,
}

impl ApiError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            ApiError::Unauthorized => ErrorClass::AuthExpired,
            ApiError::NotFound => ErrorClass::NotFound,
            ApiError::Status(_) | ApiError::Network(_) | ApiError::Decode(_) => ErrorClass::Generic,
        }
    }

    pub fn notice(&self) -> &'static str {
        match self.classify() {
            ErrorClass::AuthExpired => EXPIRED_NOTICE,
            ErrorClass::NotFound => NOT_FOUND_NOTICE,
            ErrorClass::Generic => GENERIC_NOTICE,
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized,
            404 => ApiError::NotFound,
            other => ApiError::Status(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("connection is closed")]
    Closed,
    #[error("conversation has not been joined")]
    NotJoined,
    #[error("connection already joined a conversation")]
    AlreadyJoined,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported url scheme {0}")]
    UnsupportedScheme(String),
    #[error("could not build http client: {0}")]
    HttpClient(String),
}
