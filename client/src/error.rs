use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

pub const UPLOAD_FAILED: &str = "Failed to process image. Please try again.";
pub const PROGRESS_FAILED: &str = "Failed to get progress. Please try again.";
pub const SAVE_FAILED: &str = "Failed to save scan. Please try again.";
pub const NO_IMAGE: &str = "Please select or capture an image";
pub const HISTORY_LOAD_FAILED: &str = "Failed to load scan history. Please try again.";
pub const HISTORY_DELETE_FAILED: &str = "Failed to delete scan. Please try again.";
pub const SCAN_DETAIL_FAILED: &str = "Failed to load scan details. Please try again.";
pub const FEEDBACK_FAILED: &str = "Failed to submit feedback. Please try again.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parsing failed: {0}")]
    Url(#[from] url::ParseError),
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("session is not authenticated"))]
    Unauthorized { message: Option<String> },
    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// The `message` field of the server's JSON error body, if there was one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message } | ApiError::Server { message, .. } => {
                message.as_deref().filter(|m| !m.is_empty())
            }
            _ => None,
        }
    }

    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{}", NO_IMAGE)]
    NoImage,
    #[error("Not an image file: {0}")]
    NotAnImage(String),
    #[error("Image is too large ({size} bytes, limit {limit})")]
    ImageTooLarge { size: usize, limit: usize },
    #[error("{message}")]
    Upload {
        message: String,
        #[source]
        source: Option<ApiError>,
    },
    #[error("{0}")]
    Task(String),
    #[error("{}", PROGRESS_FAILED)]
    Progress(#[source] ApiError),
    #[error("{message}")]
    Save {
        message: String,
        #[source]
        source: ApiError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub fn upload(source: ApiError) -> Self {
        ScanError::Upload {
            message: source.user_message(UPLOAD_FAILED),
            source: Some(source),
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ScanError::Upload { source, .. } => source.as_ref(),
            ScanError::Progress(source) | ScanError::Save { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid form: {0}")]
    Invalid(FieldErrors),
    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl SessionError {
    pub fn request(source: ApiError, fallback: &str) -> Self {
        SessionError::Request {
            message: source.user_message(fallback),
            source,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SessionError::Request { source, .. } if source.is_unauthorized())
    }
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("{}", HISTORY_LOAD_FAILED)]
    Load(#[source] ApiError),
    #[error("{}", HISTORY_DELETE_FAILED)]
    Delete(#[source] ApiError),
    #[error("{message}")]
    Detail {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl HistoryError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            HistoryError::Load(source)
            | HistoryError::Delete(source)
            | HistoryError::Detail { source, .. } => source,
        }
    }
}

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Invalid form: {0}")]
    Invalid(FieldErrors),
    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
