//! Shared error type across extmetrics crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, ExtMetricsError>;

/// Unified error type used by core and gateway.
///
/// Handler chains return this type as well. Only [`ExtMetricsError::Handler`]
/// carries an HTTP status; callers that need to tell the two apart use
/// [`ExtMetricsError::status_code`].
#[derive(Debug, Error)]
pub enum ExtMetricsError {
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("unknown directive: {0}")]
    UnknownDirective(String),
    #[error("wrong argument count or unexpected argument '{arg}' for directive '{directive}'")]
    ArgErr { directive: String, arg: String },
    #[error("handler error ({status}): {message}")]
    Handler { status: u16, message: String },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl ExtMetricsError {
    /// Build a handler error carrying an HTTP status.
    pub fn handler(status: u16, message: impl Into<String>) -> Self {
        ExtMetricsError::Handler {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ExtMetricsError::Handler { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_handler_errors_carry_status() {
        assert_eq!(ExtMetricsError::handler(502, "upstream").status_code(), Some(502));
        assert_eq!(ExtMetricsError::Internal("x".into()).status_code(), None);

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "client gone");
        assert_eq!(ExtMetricsError::from(io).status_code(), None);
    }

    #[test]
    fn arg_err_names_directive() {
        let e = ExtMetricsError::ArgErr {
            directive: "extend_metrics".into(),
            arg: "foo".into(),
        };
        assert!(e.to_string().contains("extend_metrics"));
        assert!(e.to_string().contains("'foo'"));
    }
}
