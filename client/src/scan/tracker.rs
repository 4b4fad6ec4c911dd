use shared::{ActorMode, TaskId, UploadOutcome};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use super::upload::{self, UploadRequest};
use super::{ImageFile, Notice, NoticeKind, ScanView};
use crate::api::ScanApi;
use crate::auth::LoginRedirect;
use crate::config::PollSettings;
use crate::error::{ScanError, NO_IMAGE, SAVE_FAILED};
use crate::poller::ProgressPoller;

pub const SAVE_SUCCEEDED: &str = "Scan saved successfully!";
pub const NOTHING_TO_SAVE: &str = "No scan result to save. Please analyze an image first.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed,
    Polling(TaskId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
    Saved,
    LoginRequired(LoginRedirect),
    NothingToSave,
}

/// Drives one scan screen: image selection, upload, polling and save.
///
/// All state lives in a [`ScanView`] behind a `watch` channel. The tracker and its
/// single active poller are the only writers.
pub struct ScanTracker {
    api: Arc<dyn ScanApi>,
    settings: PollSettings,
    view: Arc<watch::Sender<ScanView>>,
    poller: Mutex<ProgressPoller>,
    generation: AtomicU64,
    notice_seq: AtomicU64,
}

impl ScanTracker {
    pub fn new(api: Arc<dyn ScanApi>, settings: PollSettings) -> Self {
        let view = Arc::new(watch::Sender::new(ScanView::default()));
        let poller = ProgressPoller::new(api.clone(), view.clone(), &settings);
        Self {
            api,
            settings,
            view,
            poller: Mutex::new(poller),
            generation: AtomicU64::new(0),
            notice_seq: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> ScanView {
        self.view.borrow().clone()
    }

    fn poller(&self) -> MutexGuard<'_, ProgressPoller> {
        self.poller.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the selected image and clears the previous outcome.
    pub fn select_image(&self, image: ImageFile) {
        log::debug!("Selected {} ({} bytes)", image.file_name, image.len());
        self.view.send_modify(|view| view.select_image(image));
    }

    pub fn remove_image(&self) {
        self.view.send_if_modified(|view| view.image.take().is_some());
    }

    pub async fn submit(&self, mode: ActorMode) -> Result<SubmitOutcome, ScanError> {
        let selected = self.view.borrow().image.clone();
        let Some(image) = selected else {
            self.view
                .send_modify(|view| view.error = Some(NO_IMAGE.to_string()));
            return Err(ScanError::NoImage);
        };

        self.poller().cancel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.send_modify(ScanView::begin_upload);

        let request = UploadRequest { image, mode };
        let outcome = upload::submit(self.api.as_ref(), request, self.settings.max_image_bytes).await;

        let mut current = true;
        self.view.send_if_modified(|view| {
            current = self.generation.load(Ordering::SeqCst) == generation;
            if !current {
                return false;
            }
            match &outcome {
                Ok(UploadOutcome::Immediate(result)) => view.succeed(result.clone()),
                Ok(UploadOutcome::Task {
                    task_id,
                    initial_message,
                }) => view.start_polling(task_id.clone(), initial_message.clone()),
                Err(err) => view.fail(err.to_string()),
            }
            true
        });
        if !current {
            log::debug!("Discarding upload response superseded by a newer submission");
        }

        match outcome? {
            UploadOutcome::Immediate(_) => Ok(SubmitOutcome::Completed),
            UploadOutcome::Task { task_id, .. } => {
                if current {
                    self.poller().start(task_id.clone());
                }
                Ok(SubmitOutcome::Polling(task_id))
            }
        }
    }

    /// Resolves once the current upload or poll reaches a terminal state.
    pub async fn wait_until_settled(&self) -> ScanView {
        let mut rx = self.subscribe();
        match rx.wait_for(|view| !view.is_loading()).await {
            Ok(view) => view.clone(),
            Err(_) => self.view(),
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller().is_active()
    }

    /// Cancels any upload or poll in progress. The view keeps its last result.
    pub fn abort(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.poller().cancel();
        if self.view.send_if_modified(ScanView::abort) {
            log::info!("Scan aborted");
        }
    }

    pub async fn save(&self, mode: ActorMode) -> Result<SaveAction, ScanError> {
        if !mode.is_authenticated() {
            log::info!("Save requested by a guest, redirecting to login");
            return Ok(SaveAction::LoginRequired(LoginRedirect::to(
                &self.settings.origin,
            )));
        }

        let (image, result) = {
            let view = self.view.borrow();
            (view.image.clone(), view.result.clone())
        };
        let (Some(image), Some(result)) = (image, result) else {
            self.set_notice(NoticeKind::Error, NOTHING_TO_SAVE);
            return Ok(SaveAction::NothingToSave);
        };

        self.view.send_modify(|view| {
            view.saving = true;
            view.save_notice = None;
        });
        let saved = self
            .api
            .save_scan(&image, &result.extracted_text, &result.analysis)
            .await;
        self.view.send_modify(|view| view.saving = false);

        match saved {
            Ok(_) => {
                log::info!("Scan of {} saved", image.file_name);
                let id = self.set_notice(NoticeKind::Success, SAVE_SUCCEEDED);
                self.clear_notice_later(id);
                Ok(SaveAction::Saved)
            }
            Err(source) => {
                let message = source.user_message(SAVE_FAILED);
                log::error!("Failed to save scan: {}", source);
                self.set_notice(NoticeKind::Error, &message);
                Err(ScanError::Save { message, source })
            }
        }
    }

    fn set_notice(&self, kind: NoticeKind, message: &str) -> u64 {
        let id = self.notice_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.view.send_modify(|view| {
            view.save_notice = Some(Notice {
                id,
                kind,
                message: message.to_string(),
            })
        });
        id
    }

    fn clear_notice_later(&self, id: u64) {
        let view = self.view.clone();
        let ttl = self.settings.save_notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            view.send_if_modified(|view| {
                if view.save_notice.as_ref().is_some_and(|n| n.id == id) {
                    view.save_notice = None;
                    return true;
                }
                false
            });
        });
    }
}

impl Drop for ScanTracker {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.poller().cancel();
    }
}
