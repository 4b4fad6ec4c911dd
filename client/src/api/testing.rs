//! Scripted in-memory implementations of the api traits for unit tests.

use async_trait::async_trait;
use shared::{
    ActorMode, Analysis, AuthResponse, Credentials, FeedbackRequest, MessageResponse,
    ProgressResponse, ScanId, ScanPage, ScanRecord, SignupRequest, TaskId, UploadResponse,
    UserProfile,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use super::{AuthApi, FeedbackApi, ProfileUpdate, ScanApi};
use crate::error::ApiError;
use crate::scan::ImageFile;

type Queue<T> = Mutex<VecDeque<Result<T, ApiError>>>;

pub(crate) fn server_error(status: u16, message: Option<&str>) -> ApiError {
    ApiError::Server {
        status,
        message: message.map(str::to_string),
    }
}

pub(crate) fn unauthorized() -> ApiError {
    ApiError::Unauthorized { message: None }
}

#[derive(Default)]
pub(crate) struct MockScanApi {
    uploads: Queue<UploadResponse>,
    progress: Mutex<HashMap<TaskId, VecDeque<Result<ProgressResponse, ApiError>>>>,
    saves: Queue<MessageResponse>,
    pages: Queue<ScanPage>,
    deletes: Queue<MessageResponse>,
    records: Mutex<HashMap<ScanId, ScanRecord>>,
    gates: Mutex<HashMap<TaskId, Arc<Notify>>>,
    upload_gate: Mutex<Option<Arc<Notify>>>,
    progress_delay: Mutex<Option<Duration>>,
    pub upload_modes: Mutex<Vec<ActorMode>>,
    pub saved_texts: Mutex<Vec<String>>,
    pub list_requests: Mutex<Vec<(u32, u32)>>,
    pub upload_calls: AtomicUsize,
    pub progress_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockScanApi {
    pub fn push_upload(&self, response: Result<UploadResponse, ApiError>) -> &Self {
        self.uploads.lock().unwrap().push_back(response);
        self
    }

    pub fn push_task(&self, task_id: &str, message: Option<&str>) -> &Self {
        self.push_upload(Ok(UploadResponse {
            task_id: Some(TaskId::new(task_id)),
            message: message.map(str::to_string),
            ..UploadResponse::default()
        }))
    }

    pub fn push_progress(&self, task_id: &str, response: Result<ProgressResponse, ApiError>) -> &Self {
        self.progress
            .lock()
            .unwrap()
            .entry(TaskId::new(task_id))
            .or_default()
            .push_back(response);
        self
    }

    pub fn push_save(&self, response: Result<MessageResponse, ApiError>) -> &Self {
        self.saves.lock().unwrap().push_back(response);
        self
    }

    pub fn push_page(&self, response: Result<ScanPage, ApiError>) -> &Self {
        self.pages.lock().unwrap().push_back(response);
        self
    }

    pub fn push_delete(&self, response: Result<MessageResponse, ApiError>) -> &Self {
        self.deletes.lock().unwrap().push_back(response);
        self
    }

    pub fn insert_record(&self, record: ScanRecord) -> &Self {
        self.records.lock().unwrap().insert(record.id.clone(), record);
        self
    }

    /// Progress requests for `task_id` block until the returned notify is signalled.
    pub fn gate(&self, task_id: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .unwrap()
            .entry(TaskId::new(task_id))
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// The next upload takes its scripted response, then blocks until the notify is signalled.
    pub fn gate_next_upload(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.upload_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn set_progress_delay(&self, delay: Duration) {
        *self.progress_delay.lock().unwrap() = Some(delay);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScanApi for MockScanApi {
    async fn upload_image(
        &self,
        _image: &ImageFile,
        mode: ActorMode,
    ) -> Result<UploadResponse, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.upload_modes.lock().unwrap().push(mode);
        let response = self
            .uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(server_error(500, None)));

        let gate = self.upload_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        response
    }

    async fn get_progress(&self, task_id: &TaskId) -> Result<ProgressResponse, ApiError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let gate = self.gates.lock().unwrap().get(task_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let delay = *self.progress_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.progress
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(ProgressResponse::running(0, "Queued")))
    }

    async fn save_scan(
        &self,
        _image: &ImageFile,
        extracted_text: &str,
        _analysis: &Analysis,
    ) -> Result<MessageResponse, ApiError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.saved_texts
            .lock()
            .unwrap()
            .push(extracted_text.to_string());
        self.saves
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(MessageResponse::default()))
    }

    async fn list_scans(&self, page: u32, limit: u32) -> Result<ScanPage, ApiError> {
        self.list_requests.lock().unwrap().push((page, limit));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ScanPage::default()))
    }

    async fn get_scan(&self, scan_id: &ScanId) -> Result<ScanRecord, ApiError> {
        self.records
            .lock()
            .unwrap()
            .get(scan_id)
            .cloned()
            .ok_or_else(|| server_error(404, Some("Scan not found")))
    }

    async fn delete_scan(&self, _scan_id: &ScanId) -> Result<MessageResponse, ApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deletes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(MessageResponse::default()))
    }
}

#[derive(Default)]
pub(crate) struct MockAuthApi {
    me: Queue<UserProfile>,
    logins: Queue<AuthResponse>,
    registrations: Queue<AuthResponse>,
    updates: Queue<UserProfile>,
    logouts: Queue<MessageResponse>,
    pub me_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
    pub register_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl MockAuthApi {
    pub fn push_me(&self, response: Result<UserProfile, ApiError>) -> &Self {
        self.me.lock().unwrap().push_back(response);
        self
    }

    pub fn push_login(&self, response: Result<AuthResponse, ApiError>) -> &Self {
        self.logins.lock().unwrap().push_back(response);
        self
    }

    pub fn push_register(&self, response: Result<AuthResponse, ApiError>) -> &Self {
        self.registrations.lock().unwrap().push_back(response);
        self
    }

    pub fn push_update(&self, response: Result<UserProfile, ApiError>) -> &Self {
        self.updates.lock().unwrap().push_back(response);
        self
    }

    pub fn push_logout(&self, response: Result<MessageResponse, ApiError>) -> &Self {
        self.logouts.lock().unwrap().push_back(response);
        self
    }
}

fn pop_or<T>(queue: &Queue<T>, fallback: impl FnOnce() -> Result<T, ApiError>) -> Result<T, ApiError> {
    queue.lock().unwrap().pop_front().unwrap_or_else(fallback)
}

#[async_trait]
impl AuthApi for MockAuthApi {
    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        pop_or(&self.me, || Err(unauthorized()))
    }

    async fn update_profile(&self, _update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        pop_or(&self.updates, || Err(server_error(500, None)))
    }

    async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        pop_or(&self.logins, || Err(unauthorized()))
    }

    async fn register(&self, _signup: &SignupRequest) -> Result<AuthResponse, ApiError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        pop_or(&self.registrations, || Err(server_error(500, None)))
    }

    async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        pop_or(&self.logouts, || Ok(MessageResponse::default()))
    }
}

#[derive(Default)]
pub(crate) struct MockFeedbackApi {
    responses: Queue<MessageResponse>,
    pub sent: Mutex<Vec<FeedbackRequest>>,
    pub calls: AtomicUsize,
}

impl MockFeedbackApi {
    pub fn push(&self, response: Result<MessageResponse, ApiError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }
}

#[async_trait]
impl FeedbackApi for MockFeedbackApi {
    async fn send_feedback(&self, feedback: &FeedbackRequest) -> Result<MessageResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(feedback.clone());
        pop_or(&self.responses, || Ok(MessageResponse::default()))
    }
}
