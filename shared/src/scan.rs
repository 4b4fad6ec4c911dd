use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de;
use crate::{Analysis, AnalysisResult};

/// Opaque id returned by the upload endpoint for asynchronous analysis.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display, derive_more::From,
)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display, derive_more::From,
)]
#[serde(transparent)]
pub struct ScanId(String);

impl ScanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScanId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Whether the current user is signed in. Selects the upload endpoint suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
pub enum ActorMode {
    #[strum(serialize = "guest")]
    Guest,
    #[strum(serialize = "auth")]
    Authenticated,
}

impl ActorMode {
    pub fn is_authenticated(self) -> bool {
        matches!(self, ActorMode::Authenticated)
    }
}

/// Raw upload body: either a task to poll or the analysis itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Immediate(AnalysisResult),
    Task {
        task_id: TaskId,
        initial_message: String,
    },
}

impl UploadResponse {
    /// `None` when the body carries neither a task id nor an analysis.
    pub fn into_outcome(self) -> Option<UploadOutcome> {
        match self.task_id.filter(|id| !id.as_str().is_empty()) {
            Some(task_id) => Some(UploadOutcome::Task {
                task_id,
                initial_message: self
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Processing...".to_string()),
            }),
            None => self.analysis.map(|analysis| {
                UploadOutcome::Immediate(AnalysisResult {
                    extracted_text: self.extracted_text.unwrap_or_default(),
                    analysis,
                })
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// A saved scan as listed by the history endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: ScanId,
    #[serde(default, alias = "imagePath", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanPage {
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub scans: Vec<ScanRecord>,
    #[serde(default, deserialize_with = "de::null_as_default")]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_response_becomes_task_outcome() {
        let body: UploadResponse =
            serde_json::from_value(json!({ "taskId": "t1", "message": "Starting..." })).unwrap();
        assert_eq!(
            body.into_outcome(),
            Some(UploadOutcome::Task {
                task_id: TaskId::new("t1"),
                initial_message: "Starting...".into(),
            })
        );
    }

    #[test]
    fn task_without_message_uses_processing_placeholder() {
        let body: UploadResponse = serde_json::from_value(json!({ "taskId": "t9" })).unwrap();
        match body.into_outcome() {
            Some(UploadOutcome::Task { initial_message, .. }) => {
                assert_eq!(initial_message, "Processing...")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn analysis_without_task_is_immediate() {
        let body: UploadResponse = serde_json::from_value(json!({
            "extractedText": "sugar",
            "analysis": { "healthScore": 90 }
        }))
        .unwrap();
        match body.into_outcome() {
            Some(UploadOutcome::Immediate(result)) => {
                assert_eq!(result.extracted_text, "sugar");
                assert_eq!(result.analysis.health_score, Some(90));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn empty_body_has_no_outcome() {
        let body: UploadResponse = serde_json::from_value(json!({ "taskId": "" })).unwrap();
        assert_eq!(body.into_outcome(), None);
    }

    #[test]
    fn scan_record_accepts_mongo_ids_and_image_path() {
        let record: ScanRecord = serde_json::from_value(json!({
            "_id": "65f0",
            "imagePath": "/uploads/a.jpg",
            "createdAt": "2026-10-18T09:30:00Z",
            "analysis": { "healthScore": 55 }
        }))
        .unwrap();
        assert_eq!(record.id.as_str(), "65f0");
        assert_eq!(record.image_url.as_deref(), Some("/uploads/a.jpg"));
        assert_eq!(record.analysis.health_score, Some(55));
    }

    #[test]
    fn null_page_fields_read_as_empty() {
        let page: ScanPage = serde_json::from_value(json!({ "scans": null, "total": null })).unwrap();
        assert_eq!(page, ScanPage::default());

        let record: ScanRecord = serde_json::from_value(json!({
            "_id": "65f1",
            "createdAt": "2026-10-18T09:30:00Z",
            "analysis": null
        }))
        .unwrap();
        assert_eq!(record.analysis, Analysis::default());
    }

    #[test]
    fn actor_mode_maps_to_endpoint_suffix() {
        assert_eq!(ActorMode::Guest.to_string(), "guest");
        assert_eq!(ActorMode::Authenticated.to_string(), "auth");
    }
}
