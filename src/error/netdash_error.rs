use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetdashError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{0}")]
    CommandFailed(String),

    #[error("Ping timed out for host: {0}")]
    PingTimeout(String),

    #[error("Could not resolve hostname: {0}")]
    Unresolvable(String),

    #[error("invalid port list entry: {0}")]
    InvalidPorts(String),

    #[error("Could not retrieve certificate for {domain}. Error: {message}")]
    Certificate { domain: String, message: String },

    #[error("{0}")]
    GeoLookup(String),

    #[error("API request failed: {0}")]
    Provider(String),

    #[error("{0}")]
    Connections(String),

    #[error("network counters unavailable: {0}")]
    Counters(String),

    #[error("{0}")]
    Internal(String),
}

impl NetdashError {
    /// HTTP status the API layer reports this failure with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            NetdashError::MissingField(_) | NetdashError::CommandFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            NetdashError::PingTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            NetdashError::Unresolvable(_) | NetdashError::GeoLookup(_) => StatusCode::NOT_FOUND,
            NetdashError::Provider(_) => StatusCode::SERVICE_UNAVAILABLE,
            NetdashError::Io(_)
            | NetdashError::InvalidPorts(_)
            | NetdashError::Certificate { .. }
            | NetdashError::Connections(_)
            | NetdashError::Counters(_)
            | NetdashError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_timeout_statuses() {
        assert_eq!(
            NetdashError::MissingField("Host").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            NetdashError::PingTimeout("example.com".to_string()).status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            NetdashError::Unresolvable("nope.invalid".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            NetdashError::Provider("connection refused".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn missing_field_message_names_the_field() {
        assert_eq!(
            NetdashError::MissingField("Host").to_string(),
            "Host is required"
        );
    }
}
