//! Error types shared by the fetch pipeline

/// Failure of a single network attempt for one unit.
///
/// Produced by a [`Transport`](crate::transport::Transport) and consumed by
/// the outcome classifier. Never escapes the unit fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// Server answered with a non-success status
    Status { code: u16, message: String },
    /// Request exceeded the per-request timeout
    Timeout(String),
    /// Could not connect (DNS, refused, reset during connect)
    Connect(String),
    /// Body was truncated or is not a JSON array of records
    Decode(String),
    /// Any other transport fault
    Transport(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { code, message } if message.is_empty() => write!(f, "HTTP {code}"),
            Self::Status { code, message } => write!(f, "HTTP {code}: {message}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::Connect(msg) => write!(f, "connection error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for AttemptError {}

impl AttemptError {
    /// Map a reqwest error onto the attempt taxonomy.
    ///
    /// The URL is stripped so the endpoint does not leak into logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let (timeout, connect, decode) = (e.is_timeout(), e.is_connect(), e.is_decode() || e.is_body());
        let status = e.status();
        let message = e.without_url().to_string();
        if timeout {
            Self::Timeout(message)
        } else if connect {
            Self::Connect(message)
        } else if decode {
            Self::Decode(message)
        } else if let Some(status) = status {
            Self::Status {
                code: status.as_u16(),
                message,
            }
        } else {
            Self::Transport(message)
        }
    }

    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Invalid or missing startup configuration. Fatal: aborts before any unit runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting (usually an environment variable) is absent
    Missing(&'static str),
    /// A setting is present but out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "{name} not set"),
            Self::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_status_with_message() {
        let err = AttemptError::Status {
            code: 404,
            message: "Not Found".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP 404: Not Found");
    }

    #[test]
    fn display_status_without_message() {
        let err = AttemptError::Status {
            code: 503,
            message: String::new(),
        };
        assert_eq!(format!("{err}"), "HTTP 503");
    }

    #[test]
    fn status_only_for_status_variant() {
        let err = AttemptError::Status {
            code: 429,
            message: String::new(),
        };
        assert_eq!(err.status(), Some(429));
        assert_eq!(AttemptError::Timeout("30s".into()).status(), None);
    }

    #[test]
    fn display_decode() {
        let err = AttemptError::Decode("EOF while parsing".into());
        assert!(format!("{err}").starts_with("decode error"));
    }

    #[test]
    fn config_missing_names_variable() {
        assert_eq!(
            format!("{}", ConfigError::Missing("API_KEY")),
            "API_KEY not set"
        );
    }
}
