use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Closed set of failure kinds shared by the proxy and its clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizErrorType {
    MissingConfig,
    Unauthorized,
    Forbidden,
    InvalidRequest,
    ApiError,
}

impl WizErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            WizErrorType::MissingConfig => "MISSING_CONFIG",
            WizErrorType::Unauthorized => "UNAUTHORIZED",
            WizErrorType::Forbidden => "FORBIDDEN",
            WizErrorType::InvalidRequest => "INVALID_REQUEST",
            WizErrorType::ApiError => "API_ERROR",
        }
    }

    /// HTTP status the route layer answers with for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            WizErrorType::MissingConfig => 400,
            WizErrorType::Unauthorized => 401,
            WizErrorType::Forbidden => 403,
            WizErrorType::InvalidRequest => 400,
            WizErrorType::ApiError => 500,
        }
    }

    /// Short title used in the `error` field of error bodies.
    pub fn title(self) -> &'static str {
        match self {
            WizErrorType::MissingConfig => "Missing Configuration",
            WizErrorType::Unauthorized => "Authentication Failed",
            WizErrorType::Forbidden => "Access Denied",
            WizErrorType::InvalidRequest => "Invalid Request",
            WizErrorType::ApiError => "Wiz API Error",
        }
    }
}

impl fmt::Display for WizErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed check on an inbound query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub path: Vec<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn invalid_type(path: &str, expected: &str, received: &str) -> Self {
        Self {
            code: "invalid_type".to_string(),
            path: vec![path.to_string()],
            message: format!("Expected {expected}, received {received}"),
        }
    }
}

#[derive(Error, Debug)]
pub enum WizError {
    #[error("{message}")]
    MissingConfig {
        message: String,
        details: Option<Value>,
    },

    #[error("{message}")]
    Unauthorized {
        message: String,
        details: Option<Value>,
    },

    #[error("{message}")]
    Forbidden {
        message: String,
        details: Option<Value>,
    },

    #[error("{message}")]
    InvalidRequest {
        message: String,
        details: Option<Value>,
    },

    #[error("Invalid query parameters")]
    Validation { issues: Vec<ValidationIssue> },

    #[error("{message}")]
    Api {
        message: String,
        details: Option<Value>,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl WizError {
    pub fn missing_config(key: &str) -> Self {
        WizError::MissingConfig {
            message: format!(
                "Missing required Wiz configuration '{key}'. Please check your config file"
            ),
            details: None,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        WizError::Unauthorized {
            message: message.into(),
            details: None,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        WizError::Forbidden {
            message: message.into(),
            details: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        WizError::InvalidRequest {
            message: message.into(),
            details: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        WizError::Api {
            message: message.into(),
            details: None,
        }
    }

    pub fn api_with_details(message: impl Into<String>, details: Value) -> Self {
        WizError::Api {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn from_kind(kind: WizErrorType, message: String, details: Option<Value>) -> Self {
        match kind {
            WizErrorType::MissingConfig => WizError::MissingConfig { message, details },
            WizErrorType::Unauthorized => WizError::Unauthorized { message, details },
            WizErrorType::Forbidden => WizError::Forbidden { message, details },
            WizErrorType::InvalidRequest => WizError::InvalidRequest { message, details },
            WizErrorType::ApiError => WizError::Api { message, details },
        }
    }

    pub fn kind(&self) -> WizErrorType {
        match self {
            WizError::MissingConfig { .. }
            | WizError::ConfigRead { .. }
            | WizError::ConfigParse { .. }
            | WizError::NoConfigDir => WizErrorType::MissingConfig,
            WizError::Unauthorized { .. } => WizErrorType::Unauthorized,
            WizError::Forbidden { .. } => WizErrorType::Forbidden,
            WizError::InvalidRequest { .. }
            | WizError::Validation { .. }
            | WizError::InvalidUrl(_) => WizErrorType::InvalidRequest,
            WizError::Api { .. } | WizError::Http(_) | WizError::Io(_) => WizErrorType::ApiError,
        }
    }

    pub fn details(&self) -> Option<&Value> {
        match self {
            WizError::MissingConfig { details, .. }
            | WizError::Unauthorized { details, .. }
            | WizError::Forbidden { details, .. }
            | WizError::InvalidRequest { details, .. }
            | WizError::Api { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Whether this error was classified into the taxonomy, as opposed to
    /// an unexpected local failure.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            WizError::MissingConfig { .. }
                | WizError::Unauthorized { .. }
                | WizError::Forbidden { .. }
                | WizError::InvalidRequest { .. }
                | WizError::Validation { .. }
                | WizError::Api { .. }
        )
    }

    /// Classify a non-success upstream status the way both the token
    /// endpoint and the GraphQL endpoint are classified.
    pub fn from_status(status: u16, fallback: impl FnOnce() -> WizError) -> Self {
        match status {
            401 => WizError::unauthorized("Invalid Wiz credentials"),
            403 => WizError::forbidden("Access forbidden"),
            _ => fallback(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WizError>;
