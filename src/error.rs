use std::{error, fmt};

/// Sum type representing every way a send can fail before a response is
/// inspected.
///
/// A response with a status other than 200 is not an error; see
/// [crate::client::Delivery].
#[derive(Debug)]
pub enum HookError {
    /// The payload could not be encoded to JSON. No request was sent.
    Serialization(serde_json::Error),
    /// The request could not be completed.
    Transport(TransportError),
    /// A background send was started outside a Tokio runtime. No request was
    /// sent.
    Runtime(tokio::runtime::TryCurrentError),
}

impl From<serde_json::Error> for HookError {
    fn from(e: serde_json::Error) -> Self {
        HookError::Serialization(e)
    }
}

impl From<TransportError> for HookError {
    fn from(e: TransportError) -> Self {
        HookError::Transport(e)
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookError::Serialization(e) => write!(f, "Failed to encode webhook payload: {}", e),
            HookError::Transport(e) => write!(f, "Webhook request failed: {}", e),
            HookError::Runtime(e) => write!(f, "Cannot send in the background: {}", e),
        }
    }
}

impl error::Error for HookError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            HookError::Serialization(e) => Some(e),
            HookError::Transport(e) => Some(e),
            HookError::Runtime(e) => Some(e),
        }
    }
}

/// Network or connection failure surfaced by a [crate::transport::Transport].
#[derive(Debug)]
pub enum TransportError {
    Request(reqwest::Error),
    /// Failures from transports not built on reqwest, identified by an error
    /// domain and a code within it.
    Other {
        domain: String,
        code: i64,
        message: String,
    },
}

impl TransportError {
    pub fn other<D: Into<String>, M: Into<String>>(domain: D, code: i64, message: M) -> Self {
        TransportError::Other {
            domain: domain.into(),
            code,
            message: message.into(),
        }
    }

    /// The error domain, if the transport supplied one.
    pub fn domain(&self) -> Option<&str> {
        match self {
            TransportError::Request(_) => None,
            TransportError::Other { domain, .. } => Some(domain),
        }
    }

    /// The transport-specific error code, if the transport supplied one.
    pub fn code(&self) -> Option<i64> {
        match self {
            TransportError::Request(_) => None,
            TransportError::Other { code, .. } => Some(*code),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Request(e)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Request(e) => write!(f, "{}", e),
            TransportError::Other {
                domain,
                code,
                message,
            } => write!(f, "{} ({}): {}", domain, code, message),
        }
    }
}

impl error::Error for TransportError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            TransportError::Request(e) => Some(e),
            TransportError::Other { .. } => None,
        }
    }
}

/// Invalid client configuration, reported at construction time.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingWebhookUrl,
    InvalidUrl { name: &'static str, reason: String },
    UnsupportedScheme(String),
    InvalidThreshold(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = match self {
            ConfigError::MissingWebhookUrl => "Webhook URL is required.".into(),
            ConfigError::InvalidUrl { name, reason } => format!("Invalid {}: {}", name, reason),
            ConfigError::UnsupportedScheme(s) => {
                format!("Webhook URL must use http or https, got: {}", s)
            }
            ConfigError::InvalidThreshold(x) => {
                format!("Short field length must be a non-negative integer, got: {}", x)
            }
        };

        write!(f, "{}", x)
    }
}

impl error::Error for ConfigError {}
