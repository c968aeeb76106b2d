//! Type conversions into DispatchError

use super::types::DispatchError;

/// Connection-level failures; a response with any status never takes this path
impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DispatchError::Network(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            DispatchError::Network(format!("Connection failed: {}", err))
        } else if err.is_body() || err.is_decode() {
            DispatchError::Network(format!("Failed to read response: {}", err))
        } else {
            DispatchError::Network(format!("Network error: {}", err))
        }
    }
}

impl From<serde_yaml::Error> for DispatchError {
    fn from(err: serde_yaml::Error) -> Self {
        DispatchError::Config(format!("Failed to parse config: {}", err))
    }
}
