use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rate limit: {0}")]
    RateLimit(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvalidIdentifier(_) => "INVALID_IDENTIFIER",
            Self::Transport(_) => "TRANSPORT",
            Self::Decode(_) => "DECODE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::RateLimit(_) => "RATE_LIMIT",
            Self::Config(_) => "CONFIG",
            Self::Cancelled => "CANCELLED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// True for failures of the request itself rather than of its payload.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Unauthorized(_) | Self::RateLimit(_)
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        if value.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
            || value.status() == Some(reqwest::StatusCode::FORBIDDEN)
        {
            return Self::Unauthorized(value.to_string());
        }
        if value.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            return Self::RateLimit(value.to_string());
        }
        if value.is_decode() {
            return Self::Decode(value.to_string());
        }
        Self::Transport(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(value: url::ParseError) -> Self {
        Self::Config(format!("invalid url: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::Transport("x".into()).code(), "TRANSPORT");
        assert_eq!(AppError::Decode("x".into()).code(), "DECODE");
        assert_eq!(
            AppError::InvalidIdentifier("x".into()).code(),
            "INVALID_IDENTIFIER"
        );
        assert_eq!(AppError::Cancelled.code(), "CANCELLED");
    }

    #[test]
    fn transport_class() {
        assert!(AppError::Transport("timeout".into()).is_transport());
        assert!(AppError::RateLimit("429".into()).is_transport());
        assert!(AppError::Unauthorized("401".into()).is_transport());
        assert!(!AppError::Decode("bad json".into()).is_transport());
        assert!(!AppError::NotFound("app".into()).is_transport());
    }

    #[test]
    fn json_error_maps_to_decode() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert_eq!(AppError::from(err).code(), "DECODE");
    }

    #[test]
    fn url_error_maps_to_config() {
        let err = url::Url::parse("not a url").unwrap_err();
        let app: AppError = err.into();
        assert!(matches!(app, AppError::Config(_)));
    }
}
