//! Wire types shared between the EatWisely scan client and its tooling.
//!
//! Field names follow the JSON emitted by the scan server (camelCase).

mod analysis;
mod de;
mod feedback;
mod progress;
mod scan;
mod user;

pub use analysis::{
    Analysis, AnalysisResult, HarmfulIngredient, HealthBand, NutritionalInfo, Recommendation,
    RecommendationType, Severity,
};
pub use feedback::{FeedbackRequest, FeedbackType};
pub use progress::{ProgressResponse, ProgressState};
pub use scan::{
    ActorMode, MessageResponse, ScanId, ScanPage, ScanRecord, TaskId, UploadOutcome,
    UploadResponse,
};
pub use user::{AuthResponse, Credentials, MeResponse, ProfileFields, SignupRequest, UserProfile};
