//! Error types and handling for `AgriSense`

use thiserror::Error;

/// Main error type for the `AgriSense` library
#[derive(Error, Debug)]
pub enum AgriError {
    /// No usable coordinate could be obtained
    #[error("Location unavailable: {message}")]
    LocationUnavailable { message: String },

    /// Transport failure, timeout or non-success status from a provider
    #[error("Provider unreachable: {message}")]
    ProviderUnreachable { message: String },

    /// The provider answered but expected fields are absent
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    /// Geocoding yielded no match
    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Crop catalog failed to load or violates its invariants
    #[error("Invalid crop catalog: {message}")]
    Catalog { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AgriError {
    pub fn location_unavailable<S: Into<String>>(message: S) -> Self {
        Self::LocationUnavailable {
            message: message.into(),
        }
    }

    pub fn provider_unreachable<S: Into<String>>(message: S) -> Self {
        Self::ProviderUnreachable {
            message: message.into(),
        }
    }

    pub fn malformed_response<S: Into<String>>(message: S) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn location_not_found<S: Into<String>>(query: S) -> Self {
        Self::LocationNotFound {
            query: query.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn catalog<S: Into<String>>(message: S) -> Self {
        Self::Catalog {
            message: message.into(),
        }
    }

    /// Short machine-readable name, used by the HTTP API
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AgriError::LocationUnavailable { .. } => "location_unavailable",
            AgriError::ProviderUnreachable { .. } => "provider_unreachable",
            AgriError::MalformedResponse { .. } => "malformed_response",
            AgriError::LocationNotFound { .. } => "location_not_found",
            AgriError::Config { .. } => "config",
            AgriError::Catalog { .. } => "catalog",
            AgriError::Io { .. } => "io",
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            AgriError::LocationUnavailable { message } => {
                format!("Location unavailable: {message}")
            }
            AgriError::ProviderUnreachable { .. } => {
                "Unable to reach the climate data service. Please check your internet connection and retry."
                    .to_string()
            }
            AgriError::MalformedResponse { .. } => {
                "The climate data service returned unexpected data. Please retry later.".to_string()
            }
            AgriError::LocationNotFound { query } => format!("Location not found: {query}"),
            AgriError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            AgriError::Catalog { message } => format!("Crop catalog is invalid: {message}"),
            AgriError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
