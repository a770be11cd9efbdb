//! Map a finished network attempt onto a retry decision.

use crate::error::AttemptError;

/// How the unit fetcher should react to one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<T> {
    /// 2xx with a decodable body
    Success(T),
    /// Worth retrying after backoff: 429, 5xx, timeout, connection or decode failure
    Transient(String),
    /// Retrying cannot help: any other 4xx, and anything outside the known ranges
    Permanent(String),
}

/// Retry class of a bare HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Transient,
    Permanent,
}

pub fn classify_status(code: u16) -> StatusClass {
    match code {
        200..=299 => StatusClass::Success,
        429 | 500..=599 => StatusClass::Transient,
        _ => StatusClass::Permanent,
    }
}

/// Classify the result of one attempt. Pure; failure reasons carry the error
/// text verbatim so a permanent failure can be reported as-is.
pub fn classify<T>(result: Result<T, AttemptError>) -> Classification<T> {
    match result {
        Ok(payload) => Classification::Success(payload),
        Err(err) => classify_error(&err),
    }
}

/// Classify a failed attempt. Never returns `Success`.
pub fn classify_error<T>(err: &AttemptError) -> Classification<T> {
    match err {
        AttemptError::Status { code, .. } => match classify_status(*code) {
            StatusClass::Permanent => Classification::Permanent(err.to_string()),
            // A 2xx surfaced as an error means the body was unusable
            StatusClass::Success | StatusClass::Transient => {
                Classification::Transient(err.to_string())
            }
        },
        AttemptError::Timeout(_)
        | AttemptError::Connect(_)
        | AttemptError::Decode(_)
        | AttemptError::Transport(_) => Classification::Transient(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> Classification<()> {
        classify(Err(AttemptError::Status {
            code,
            message: "msg".to_string(),
        }))
    }

    #[test]
    fn ok_is_success_with_payload() {
        assert_eq!(
            classify(Ok::<_, AttemptError>(vec![1, 2])),
            Classification::Success(vec![1, 2])
        );
    }

    #[test]
    fn status_classes() {
        assert_eq!(classify_status(200), StatusClass::Success);
        assert_eq!(classify_status(204), StatusClass::Success);
        assert_eq!(classify_status(429), StatusClass::Transient);
        assert_eq!(classify_status(503), StatusClass::Transient);
        assert_eq!(classify_status(404), StatusClass::Permanent);
        assert_eq!(classify_status(304), StatusClass::Permanent);
        assert_eq!(classify_status(101), StatusClass::Permanent);
    }

    #[test]
    fn rate_limit_and_5xx_transient() {
        for code in [429, 500, 502, 503, 504, 599] {
            assert!(
                matches!(status(code), Classification::Transient(_)),
                "{code}"
            );
        }
    }

    #[test]
    fn other_4xx_permanent_with_verbatim_reason() {
        assert_eq!(
            status(404),
            Classification::Permanent("HTTP 404: msg".to_string())
        );
        for code in [400, 401, 403, 410] {
            assert!(
                matches!(status(code), Classification::Permanent(_)),
                "{code}"
            );
        }
    }

    #[test]
    fn success_status_as_error_is_transient() {
        assert!(matches!(status(200), Classification::Transient(_)));
    }

    #[test]
    fn network_faults_transient() {
        let cases = [
            AttemptError::Timeout("30s elapsed".into()),
            AttemptError::Connect("refused".into()),
            AttemptError::Decode("EOF while parsing a list".into()),
            AttemptError::Transport("reset".into()),
        ];
        for err in cases {
            let expected = Classification::<()>::Transient(err.to_string());
            assert_eq!(classify(Err(err)), expected);
        }
    }
}
