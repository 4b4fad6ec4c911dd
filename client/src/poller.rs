//! Interval polling of an analysis task.
//!
//! The poller is the only writer of progress while a task is outstanding. Every write
//! goes through `watch::Sender::send_if_modified` and checks the poll's cancellation
//! token under the channel lock, so nothing lands after `cancel` returns.

use shared::{AnalysisResult, ProgressResponse, TaskId};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::ScanApi;
use crate::config::PollSettings;
use crate::error::{ApiError, ScanError, UPLOAD_FAILED};
use crate::scan::{ScanPhase, ScanView};

pub const TIMED_OUT: &str = "Timed out waiting for the analysis to finish.";

/// A running poll. Awaiting [`PollHandle::join`] yields the phase it settled in.
#[derive(Debug)]
pub struct PollHandle {
    task_id: TaskId,
    token: CancellationToken,
    join: JoinHandle<ScanPhase>,
}

impl PollHandle {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) -> ScanPhase {
        match self.join.await {
            Ok(phase) => phase,
            Err(err) => {
                log::error!("Poll task for {} ended abnormally: {}", self.task_id, err);
                ScanPhase::Aborted
            }
        }
    }
}

/// Owns at most one [`PollHandle`]. Starting a new poll cancels the previous one.
pub struct ProgressPoller {
    api: Arc<dyn ScanApi>,
    view: Arc<watch::Sender<ScanView>>,
    interval: Duration,
    max_duration: Option<Duration>,
    active: Option<PollHandle>,
}

impl ProgressPoller {
    pub fn new(
        api: Arc<dyn ScanApi>,
        view: Arc<watch::Sender<ScanView>>,
        settings: &PollSettings,
    ) -> Self {
        Self {
            api,
            view,
            interval: settings.interval,
            max_duration: settings.max_duration,
            active: None,
        }
    }

    pub fn start(&mut self, task_id: TaskId) -> &PollHandle {
        self.cancel();

        log::info!("Polling progress for task {}", task_id);
        let token = CancellationToken::new();
        let join = tokio::spawn(run(
            self.api.clone(),
            self.view.clone(),
            task_id.clone(),
            self.interval,
            self.max_duration,
            token.clone(),
        ));
        self.active.insert(PollHandle {
            task_id,
            token,
            join,
        })
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.active.take() {
            if !handle.is_finished() {
                log::debug!("Cancelling poll for task {}", handle.task_id);
            }
            handle.cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Hands the running poll to the caller, e.g. to await its outcome.
    pub fn take_handle(&mut self) -> Option<PollHandle> {
        self.active.take()
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug)]
pub(crate) enum Tick {
    Running(ProgressResponse),
    Succeeded(AnalysisResult),
    Failed(ScanError),
}

impl Tick {
    pub(crate) fn classify(fetched: Result<ProgressResponse, ApiError>) -> Self {
        let response = match fetched {
            Ok(response) => response,
            Err(err) => {
                log::error!("Progress polling error: {}", err);
                return Tick::Failed(ScanError::Progress(err));
            }
        };
        if !response.completed {
            return Tick::Running(response);
        }
        match (response.error.filter(|e| !e.is_empty()), response.result) {
            (Some(error), _) => Tick::Failed(ScanError::Task(error)),
            (None, Some(result)) => Tick::Succeeded(result),
            (None, None) => {
                log::warn!("Task completed without a result or an error");
                Tick::Failed(ScanError::Task(UPLOAD_FAILED.to_string()))
            }
        }
    }
}

/// Writes one tick into the view unless `token` is already cancelled.
pub(crate) fn apply(
    view: &watch::Sender<ScanView>,
    token: &CancellationToken,
    tick: Tick,
) -> ControlFlow<ScanPhase> {
    let mut flow = ControlFlow::Break(ScanPhase::Aborted);
    view.send_if_modified(|view| {
        if token.is_cancelled() {
            return false;
        }
        flow = match tick {
            Tick::Running(response) => {
                view.record_progress(&response);
                ControlFlow::Continue(())
            }
            Tick::Succeeded(result) => {
                view.succeed(result);
                ControlFlow::Break(ScanPhase::Succeeded)
            }
            Tick::Failed(err) => {
                view.fail(err.to_string());
                ControlFlow::Break(ScanPhase::Failed)
            }
        };
        true
    });
    flow
}

async fn run(
    api: Arc<dyn ScanApi>,
    view: Arc<watch::Sender<ScanView>>,
    task_id: TaskId,
    period: Duration,
    max_duration: Option<Duration>,
    token: CancellationToken,
) -> ScanPhase {
    let started = Instant::now();
    let mut ticker = time::interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => return ScanPhase::Aborted,
            _ = ticker.tick() => {}
        }

        if max_duration.is_some_and(|max| started.elapsed() >= max) {
            log::warn!("Task {} did not finish within {:?}", task_id, max_duration);
            let timed_out = Tick::Failed(ScanError::Task(TIMED_OUT.into()));
            if let ControlFlow::Break(phase) = apply(&view, &token, timed_out) {
                return phase;
            }
        }

        let fetched = tokio::select! {
            _ = token.cancelled() => return ScanPhase::Aborted,
            fetched = api.get_progress(&task_id) => fetched,
        };

        if let ControlFlow::Break(phase) = apply(&view, &token, Tick::classify(fetched)) {
            log::info!("Task {} settled as {}", task_id, phase);
            return phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{server_error, MockScanApi};
    use crate::error::PROGRESS_FAILED;
    use shared::Analysis;
    use std::sync::atomic::Ordering;

    fn settings() -> PollSettings {
        PollSettings::default()
    }

    fn result(score: u32) -> AnalysisResult {
        AnalysisResult {
            extracted_text: "Ingredients: oats".into(),
            analysis: Analysis {
                health_score: Some(score),
                ..Analysis::default()
            },
        }
    }

    fn polling_view(task: &str) -> Arc<watch::Sender<ScanView>> {
        let mut view = ScanView::default();
        view.begin_upload();
        view.start_polling(TaskId::new(task), "Processing...".into());
        Arc::new(watch::Sender::new(view))
    }

    #[test]
    fn error_wins_over_result() {
        let mut response = ProgressResponse::succeeded("Done", result(90));
        response.error = Some("OCR failed".into());
        assert!(matches!(
            Tick::classify(Ok(response)),
            Tick::Failed(ScanError::Task(message)) if message == "OCR failed"
        ));
    }

    #[test]
    fn completed_without_outcome_is_a_failure() {
        let mut response = ProgressResponse::running(100, "Done");
        response.completed = true;
        assert!(matches!(
            Tick::classify(Ok(response)),
            Tick::Failed(ScanError::Task(message)) if message == UPLOAD_FAILED
        ));

        match Tick::classify(Err(server_error(502, None))) {
            Tick::Failed(err @ ScanError::Progress(_)) => {
                assert_eq!(err.to_string(), PROGRESS_FAILED);
                assert!(err.api_error().is_some());
            }
            other => panic!("unexpected tick: {:?}", other),
        }
    }

    #[test]
    fn cancelled_token_discards_the_write() {
        let view = polling_view("t1");
        let token = CancellationToken::new();
        token.cancel();

        let flow = apply(&view, &token, Tick::Succeeded(result(72)));
        assert_eq!(flow, ControlFlow::Break(ScanPhase::Aborted));
        let snapshot = view.borrow();
        assert_eq!(snapshot.phase, ScanPhase::Polling);
        assert!(snapshot.result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn issues_one_request_per_tick() {
        let api = Arc::new(MockScanApi::default());
        let view = polling_view("t1");
        let mut poller = ProgressPoller::new(api.clone(), view.clone(), &settings());
        poller.start(TaskId::new("t1"));

        time::sleep(Duration::from_millis(250)).await;
        assert_eq!(api.progress_calls.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(1800)).await;
        assert_eq!(api.progress_calls.load(Ordering::SeqCst), 4);
        assert_eq!(view.borrow().progress.status_message, "Queued");
        assert!(poller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_responses_never_overlap() {
        let api = Arc::new(MockScanApi::default());
        api.set_progress_delay(Duration::from_millis(1200));
        let view = polling_view("t1");
        let mut poller = ProgressPoller::new(api.clone(), view, &settings());
        poller.start(TaskId::new("t1"));

        time::sleep(Duration::from_secs(6)).await;
        assert_eq!(api.max_in_flight(), 1);
        let calls = api.progress_calls.load(Ordering::SeqCst);
        assert!((3..=5).contains(&calls), "unexpected call count {}", calls);
    }

    #[tokio::test(start_paused = true)]
    async fn settles_with_the_task_result() {
        let api = Arc::new(MockScanApi::default());
        api.push_progress("t1", Ok(ProgressResponse::running(40, "Extracting text")))
            .push_progress("t1", Ok(ProgressResponse::succeeded("Done", result(72))));
        let view = polling_view("t1");
        let mut poller = ProgressPoller::new(api.clone(), view.clone(), &settings());
        poller.start(TaskId::new("t1"));

        let handle = poller.take_handle().unwrap();
        assert_eq!(handle.join().await, ScanPhase::Succeeded);

        let snapshot = view.borrow();
        assert_eq!(snapshot.result, Some(result(72)));
        assert!(snapshot.task.is_none());
        assert_eq!(snapshot.progress.percent, 0);
        assert_eq!(api.progress_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_after_cancel_is_discarded() {
        let api = Arc::new(MockScanApi::default());
        let gate = api.gate("t1");
        api.push_progress("t1", Ok(ProgressResponse::succeeded("Done", result(72))));
        let view = polling_view("t1");
        let mut poller = ProgressPoller::new(api.clone(), view.clone(), &settings());
        poller.start(TaskId::new("t1"));

        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(api.progress_calls.load(Ordering::SeqCst), 1);

        let handle = poller.take_handle().unwrap();
        handle.cancel();
        gate.notify_one();
        assert_eq!(handle.join().await, ScanPhase::Aborted);

        let snapshot = view.borrow();
        assert!(snapshot.result.is_none());
        assert_eq!(snapshot.phase, ScanPhase::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_again_cancels_the_previous_poll() {
        let api = Arc::new(MockScanApi::default());
        let view = polling_view("t1");
        let mut poller = ProgressPoller::new(api.clone(), view.clone(), &settings());
        poller.start(TaskId::new("t1"));
        time::sleep(Duration::from_millis(600)).await;

        api.push_progress("t2", Ok(ProgressResponse::failed("OCR failed")));
        poller.start(TaskId::new("t2"));
        let handle = poller.take_handle().unwrap();
        assert_eq!(handle.task_id(), &TaskId::new("t2"));
        assert_eq!(handle.join().await, ScanPhase::Failed);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(api.progress_calls.load(Ordering::SeqCst), 2);
        assert_eq!(view.borrow().error.as_deref(), Some("OCR failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn optional_deadline_fails_the_task() {
        let api = Arc::new(MockScanApi::default());
        let view = polling_view("t1");
        let settings = PollSettings {
            max_duration: Some(Duration::from_secs(2)),
            ..PollSettings::default()
        };
        let mut poller = ProgressPoller::new(api, view.clone(), &settings);
        poller.start(TaskId::new("t1"));

        let handle = poller.take_handle().unwrap();
        assert_eq!(handle.join().await, ScanPhase::Failed);
        assert_eq!(view.borrow().error.as_deref(), Some(TIMED_OUT));
    }
}
