use shared::{AnalysisResult, ProgressResponse, ProgressState, TaskId};

use super::ImageFile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum_macros::Display)]
pub enum ScanPhase {
    #[default]
    Idle,
    Uploading,
    Polling,
    Succeeded,
    Failed,
    Aborted,
}

impl ScanPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanPhase::Succeeded | ScanPhase::Failed | ScanPhase::Aborted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Outcome message of a save. `id` lets a delayed clear skip a newer notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Snapshot of the scan screen, published through a `watch` channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanView {
    pub phase: ScanPhase,
    pub image: Option<ImageFile>,
    pub task: Option<TaskId>,
    pub progress: ProgressState,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub saving: bool,
    pub save_notice: Option<Notice>,
}

impl ScanView {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, ScanPhase::Uploading | ScanPhase::Polling)
    }

    pub fn select_image(&mut self, image: ImageFile) {
        self.image = Some(image);
        self.error = None;
        self.result = None;
        self.save_notice = None;
    }

    pub fn begin_upload(&mut self) {
        self.phase = ScanPhase::Uploading;
        self.task = None;
        self.result = None;
        self.error = None;
        self.save_notice = None;
        self.progress = ProgressState::starting("Starting...");
    }

    pub fn start_polling(&mut self, task_id: TaskId, message: String) {
        self.phase = ScanPhase::Polling;
        self.task = Some(task_id);
        self.progress.status_message = message;
    }

    pub fn record_progress(&mut self, response: &ProgressResponse) {
        self.progress.update(response);
    }

    pub fn succeed(&mut self, result: AnalysisResult) {
        self.phase = ScanPhase::Succeeded;
        self.task = None;
        self.progress.reset();
        self.error = None;
        self.result = Some(result);
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.phase = ScanPhase::Failed;
        self.task = None;
        self.progress.reset();
        self.result = None;
        self.error = Some(message.into());
    }

    /// Stops an in-flight upload or poll without surfacing an error.
    pub fn abort(&mut self) -> bool {
        if !self.is_loading() {
            return false;
        }
        self.phase = ScanPhase::Aborted;
        self.task = None;
        self.progress.reset();
        true
    }
}
