//! The HTTP contract consumed by the client, split by concern so tests can
//! substitute either half.

mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpApi;

use async_trait::async_trait;
use shared::{
    ActorMode, Analysis, AuthResponse, Credentials, FeedbackRequest, MessageResponse, ProfileFields,
    ProgressResponse, ScanId, ScanPage, ScanRecord, SignupRequest, TaskId, UploadResponse,
    UserProfile,
};

use crate::error::ApiError;
use crate::scan::ImageFile;

#[async_trait]
pub trait ScanApi: Send + Sync {
    async fn upload_image(
        &self,
        image: &ImageFile,
        mode: ActorMode,
    ) -> Result<UploadResponse, ApiError>;

    async fn get_progress(&self, task_id: &TaskId) -> Result<ProgressResponse, ApiError>;

    async fn save_scan(
        &self,
        image: &ImageFile,
        extracted_text: &str,
        analysis: &Analysis,
    ) -> Result<MessageResponse, ApiError>;

    async fn list_scans(&self, page: u32, limit: u32) -> Result<ScanPage, ApiError>;

    async fn get_scan(&self, scan_id: &ScanId) -> Result<ScanRecord, ApiError>;

    async fn delete_scan(&self, scan_id: &ScanId) -> Result<MessageResponse, ApiError>;
}

/// Profile edit request: the form fields plus an optional new avatar.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub fields: ProfileFields,
    pub profile_image: Option<ImageFile>,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn current_user(&self) -> Result<UserProfile, ApiError>;

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;

    async fn register(&self, signup: &SignupRequest) -> Result<AuthResponse, ApiError>;

    async fn logout(&self) -> Result<MessageResponse, ApiError>;
}

#[async_trait]
pub trait FeedbackApi: Send + Sync {
    async fn send_feedback(&self, feedback: &FeedbackRequest) -> Result<MessageResponse, ApiError>;
}
