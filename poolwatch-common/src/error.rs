use thiserror::Error;

/// Main error type for poolwatch
#[derive(Error, Debug)]
pub enum PoolwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Server answered with a non-success status; `body` is the raw response text
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PoolwatchError {
    /// Response text of a rejected poll, if the server produced one
    pub fn response_text(&self) -> Option<&str> {
        match self {
            PoolwatchError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_keeps_body() {
        let err = PoolwatchError::Http {
            status: 500,
            body: "Exception: boom\n".to_string(),
        };
        assert_eq!(err.response_text(), Some("Exception: boom\n"));
        assert_eq!(err.to_string(), "HTTP 500: Exception: boom\n");
        assert_eq!(PoolwatchError::Transport("refused".into()).response_text(), None);
    }
}
