use serde::{Deserialize, Serialize};

use crate::AnalysisResult;
use crate::de;

/// Body of `GET /scan/progress/{taskId}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressResponse {
    #[serde(default, deserialize_with = "de::lenient_int")]
    pub progress: i32,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
}

impl ProgressResponse {
    pub fn running(progress: i32, status: impl Into<String>) -> Self {
        Self {
            progress,
            status: status.into(),
            completed: false,
            error: None,
            result: None,
        }
    }

    pub fn succeeded(status: impl Into<String>, result: AnalysisResult) -> Self {
        Self {
            progress: 100,
            status: status.into(),
            completed: true,
            error: None,
            result: Some(result),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            progress: 0,
            status: String::new(),
            completed: true,
            error: Some(error.into()),
            result: None,
        }
    }
}

/// Client-side view of a running task. `percent` is the server's value, unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub percent: i32,
    pub status_message: String,
    pub is_terminal: bool,
}

impl ProgressState {
    pub fn starting(message: impl Into<String>) -> Self {
        Self {
            status_message: message.into(),
            ..Self::default()
        }
    }

    pub fn update(&mut self, response: &ProgressResponse) {
        self.percent = response.progress;
        self.status_message = response.status.clone();
        self.is_terminal = response.completed;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
