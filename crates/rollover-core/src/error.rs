/// Core error types for rollover.
#[derive(Debug, thiserror::Error)]
pub enum RolloverError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CookieError {
    #[error("Invalid cookie name: {0:?}")]
    InvalidName(String),

    #[error("Invalid cookie attribute {attribute}: {value:?}")]
    InvalidAttribute { attribute: &'static str, value: String },

    #[error("Failed to encode cookie value: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid signing secret")]
    InvalidSecret,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Cookie length will exceed browser maximum. Length: {0}")]
    CookieTooLarge(usize),

    #[error("Invalid Set-Cookie header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

pub type Result<T> = std::result::Result<T, RolloverError>;
