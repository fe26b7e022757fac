//! Model download orchestration.
//!
//! Ties user actions (download, cancel, delete), the polling timer and
//! snapshot reconciliation together. All state lives in
//! [`DownloadOrchestrator`] and changes only through its methods. Background
//! work (poll ticks and the fetches they trigger) reports back as
//! [`DownloadEvent`]s which the owner feeds to [`DownloadOrchestrator::handle_event`].
//!
//! Fetches may complete out of order. Whichever completes last wins: every
//! completion replaces the snapshot wholesale.

use crate::disk::{DiskSpace, DiskSpaceProbe};
use crate::polling::PollingController;
use crate::reconcile::{self, ReconcileEvent};
use crate::toast::ToastQueue;
use async_trait::async_trait;
use providers::{ApiError, CancelStatus, DownloadStartStatus, ModuleService};
use shared::format::format_bytes;
use shared::modules::{ModuleDescriptor, RegistrySnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

const LOAD_FAILED: &str = "Failed to load AI models. Please check your connection.";

/// Who asked for a registry fetch. Decides how failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Initial load or a refresh following a user action
    User,
    /// Background poll tick
    Poll,
}

#[derive(Debug)]
pub enum DownloadEvent {
    PollTick,
    SnapshotFetched {
        origin: FetchOrigin,
        result: Result<RegistrySnapshot, ApiError>,
    },
}

/// Why an action was refused before reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    UnknownModule,
    InsufficientSpace { required: u64, available: u64 },
    AlreadyDownloaded,
    AlreadyDownloading,
    NotDownloading,
    NotDownloaded,
    /// The user answered "no" to the confirmation.
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The backend accepted the request.
    Accepted,
    /// The backend reported nothing to do (already downloaded, not running...).
    AlreadyDone,
    Rejected(Rejection),
    /// The request failed; carries the message shown to the user.
    Failed(String),
}

/// Yes/no gate in front of destructive actions.
#[async_trait]
pub trait ConfirmGate: Send {
    async fn confirm(&mut self, prompt: &str) -> bool;
}

type ReadyCallback = Box<dyn FnMut(&ModuleDescriptor) + Send>;

pub struct DownloadOrchestrator {
    service: Arc<dyn ModuleService>,
    disk_probe: Box<dyn DiskSpaceProbe>,
    toasts: ToastQueue,
    polling: PollingController<DownloadEvent>,
    snapshot: Arc<RegistrySnapshot>,
    disk_space: Option<DiskSpace>,
    events_tx: UnboundedSender<DownloadEvent>,
    events_rx: UnboundedReceiver<DownloadEvent>,
    on_ready: Option<ReadyCallback>,
    /// A tick-triggered fetch has been spawned and not yet applied.
    poll_in_flight: bool,
    alive: bool,
}

impl DownloadOrchestrator {
    pub fn new(
        service: Arc<dyn ModuleService>,
        disk_probe: Box<dyn DiskSpaceProbe>,
        toasts: ToastQueue,
        poll_interval: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let polling =
            PollingController::new(poll_interval, events_tx.clone(), || DownloadEvent::PollTick);
        Self {
            service,
            disk_probe,
            toasts,
            polling,
            snapshot: Arc::new(RegistrySnapshot::empty()),
            disk_space: None,
            events_tx,
            events_rx,
            on_ready: None,
            poll_in_flight: false,
            alive: true,
        }
    }

    /// Register the callback invoked when a download finishes.
    pub fn on_module_ready(&mut self, callback: impl FnMut(&ModuleDescriptor) + Send + 'static) {
        self.on_ready = Some(Box::new(callback));
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn disk_space(&self) -> Option<DiskSpace> {
        self.disk_space
    }

    pub fn is_polling(&self) -> bool {
        self.polling.is_active()
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// Initial, user-visible load of the registry and disk figures.
    pub async fn load_modules(&mut self) {
        self.refresh_disk_space();
        self.refresh().await;
    }

    /// Fetch the registry now and apply the result.
    pub async fn refresh(&mut self) {
        let result = self.service.list_modules().await;
        self.apply_fetch(FetchOrigin::User, result);
    }

    pub fn refresh_disk_space(&mut self) {
        self.disk_space = self.disk_probe.probe();
        if let Some(space) = self.disk_space {
            debug!(available = space.available, total = space.total, "disk space");
        }
    }

    /// Wait for the next background event. Pair with [`Self::handle_event`].
    pub async fn next_event(&mut self) -> Option<DownloadEvent> {
        self.events_rx.recv().await
    }

    pub fn handle_event(&mut self, event: DownloadEvent) {
        if !self.alive {
            debug!(?event, "orchestrator disposed, dropping event");
            return;
        }
        match event {
            // A tick queued just before the timer stopped
            DownloadEvent::PollTick if !self.polling.is_active() => {}
            // Ticks that piled up while the owner was busy collapse into the
            // fetch already running
            DownloadEvent::PollTick if self.poll_in_flight => {
                debug!("poll fetch still in flight, skipping tick");
            }
            DownloadEvent::PollTick => {
                self.poll_in_flight = true;
                self.spawn_poll_fetch();
            }
            DownloadEvent::SnapshotFetched { origin, result } => {
                if origin == FetchOrigin::Poll {
                    self.poll_in_flight = false;
                }
                self.apply_fetch(origin, result);
            }
        }
    }

    /// Stop polling and ignore any fetch that completes afterwards.
    pub fn dispose(&mut self) {
        self.alive = false;
        self.polling.dispose();
    }

    pub async fn request_download(&mut self, module_id: &str) -> ActionOutcome {
        let Some(module) = self.lookup(module_id) else {
            return ActionOutcome::Rejected(Rejection::UnknownModule);
        };

        if let Some(space) = self.disk_space {
            if module.size_bytes > space.available {
                self.toasts.error(format!(
                    "Insufficient disk space! {} needs {} ({} bytes) but only {} ({} bytes) is available.",
                    module.display_name,
                    format_bytes(module.size_bytes),
                    module.size_bytes,
                    format_bytes(space.available),
                    space.available,
                ));
                return ActionOutcome::Rejected(Rejection::InsufficientSpace {
                    required: module.size_bytes,
                    available: space.available,
                });
            }
        }

        if module.is_downloading {
            self.toasts
                .info(format!("{} is already downloading...", module.display_name));
            return ActionOutcome::Rejected(Rejection::AlreadyDownloading);
        }

        if module.downloaded {
            self.toasts
                .info(format!("{} is already downloaded!", module.display_name));
            return ActionOutcome::Rejected(Rejection::AlreadyDownloaded);
        }

        self.toasts
            .info(format!("Starting download of {}...", module.display_name));
        info!(module = %module.id, "requesting download");

        match self.service.start_download(&module.id).await {
            Ok(reply) => {
                let outcome = match reply.status {
                    DownloadStartStatus::Downloading => {
                        self.toasts.info(format!(
                            "Downloading {} in background...",
                            module.display_name
                        ));
                        ActionOutcome::Accepted
                    }
                    DownloadStartStatus::AlreadyDownloaded => {
                        self.toasts
                            .success(format!("{} is already downloaded!", module.display_name));
                        ActionOutcome::AlreadyDone
                    }
                    DownloadStartStatus::AlreadyDownloading => {
                        self.toasts
                            .info(format!("{} is already downloading", module.display_name));
                        ActionOutcome::AlreadyDone
                    }
                    DownloadStartStatus::Failed => {
                        let message = reply
                            .error
                            .or(reply.message)
                            .unwrap_or_else(|| "Failed to start download".to_string());
                        self.toasts.error(message.clone());
                        return ActionOutcome::Failed(message);
                    }
                };
                // A fresh snapshot lets polling pick up the new job right away.
                self.refresh().await;
                outcome
            }
            Err(e) => {
                warn!(module = %module.id, error = %e, "download request failed");
                let message = e.user_message_or("Failed to start download");
                self.toasts.error(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    pub async fn cancel_download(
        &mut self,
        module_id: &str,
        gate: &mut dyn ConfirmGate,
    ) -> ActionOutcome {
        let Some(module) = self.lookup(module_id) else {
            return ActionOutcome::Rejected(Rejection::UnknownModule);
        };

        if !module.is_downloading {
            self.toasts
                .info(format!("{} is not downloading", module.display_name));
            return ActionOutcome::Rejected(Rejection::NotDownloading);
        }

        if !gate
            .confirm(&format!("Cancel download of {}?", module.display_name))
            .await
        {
            return ActionOutcome::Rejected(Rejection::Declined);
        }

        match self.service.cancel_download(&module.id).await {
            Ok(reply) => {
                let outcome = match reply.status {
                    CancelStatus::Cancelled => {
                        self.toasts
                            .info(format!("Download cancelled for {}", module.display_name));
                        ActionOutcome::Accepted
                    }
                    CancelStatus::NotDownloading => {
                        self.toasts
                            .info(format!("{} is not downloading", module.display_name));
                        ActionOutcome::AlreadyDone
                    }
                };
                self.refresh().await;
                outcome
            }
            Err(e) => {
                warn!(module = %module.id, error = %e, "cancel request failed");
                let message = e.user_message_or("Failed to cancel download");
                self.toasts.error(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    pub async fn delete_module(
        &mut self,
        module_id: &str,
        gate: &mut dyn ConfirmGate,
    ) -> ActionOutcome {
        let Some(module) = self.lookup(module_id) else {
            return ActionOutcome::Rejected(Rejection::UnknownModule);
        };

        if !module.downloaded {
            self.toasts
                .info(format!("{} is not downloaded", module.display_name));
            return ActionOutcome::Rejected(Rejection::NotDownloaded);
        }

        let prompt = format!(
            "Delete {}? This will free up {}.",
            module.display_name,
            module.size_label()
        );
        if !gate.confirm(&prompt).await {
            return ActionOutcome::Rejected(Rejection::Declined);
        }

        match self.service.delete_module(&module.id).await {
            Ok(_) => {
                info!(module = %module.id, "module deleted");
                self.toasts
                    .success(format!("{} deleted successfully!", module.display_name));
                self.refresh().await;
                self.refresh_disk_space();
                ActionOutcome::Accepted
            }
            Err(e) => {
                warn!(module = %module.id, error = %e, "delete request failed");
                let message = e.user_message_or("Failed to delete model");
                self.toasts.error(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    fn lookup(&self, module_id: &str) -> Option<ModuleDescriptor> {
        let module = self.snapshot.get(module_id).cloned();
        if module.is_none() {
            self.toasts.error(format!("Unknown model: {}", module_id));
        }
        module
    }

    fn spawn_poll_fetch(&self) {
        let service = Arc::clone(&self.service);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = service.list_modules().await;
            let _ = tx.send(DownloadEvent::SnapshotFetched {
                origin: FetchOrigin::Poll,
                result,
            });
        });
    }

    fn apply_fetch(&mut self, origin: FetchOrigin, result: Result<RegistrySnapshot, ApiError>) {
        if !self.alive {
            return;
        }
        match result {
            Ok(next) => self.apply_snapshot(next),
            Err(e) if origin == FetchOrigin::Poll => {
                // Retried on the next tick; not worth a toast.
                warn!(error = %e, "poll fetch failed");
            }
            Err(e) => {
                warn!(error = %e, "module list fetch failed");
                self.toasts.error(LOAD_FAILED);
            }
        }
    }

    fn apply_snapshot(&mut self, next: RegistrySnapshot) {
        let events = reconcile::diff(&self.snapshot, &next);
        self.snapshot = Arc::new(next);

        for event in events {
            match event {
                ReconcileEvent::ModuleReady(module) => {
                    info!(module = %module.id, "download completed");
                    self.toasts
                        .success(format!("{} downloaded successfully!", module.display_name));
                    if let Some(callback) = self.on_ready.as_mut() {
                        callback(&module);
                    }
                }
                ReconcileEvent::ModuleFailed { module, error } => {
                    warn!(module = %module.id, %error, "download failed");
                    self.toasts.error(format!(
                        "Download failed: {}: {}",
                        module.display_name, error
                    ));
                }
            }
        }

        self.polling.on_snapshot_updated(&self.snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::StaticDiskSpace;
    use crate::toast::Severity;
    use parking_lot::Mutex;
    use providers::{CancelReply, DeleteReply, DownloadReply};
    use shared::modules::{DownloadState, DownloadStatus};
    use std::collections::VecDeque;

    /// Scripted backend: each `list_modules` pops the next snapshot (the last
    /// one repeats); action calls are recorded.
    #[derive(Default)]
    struct FakeService {
        snapshots: Mutex<VecDeque<Result<Vec<ModuleDescriptor>, u16>>>,
        last: Mutex<Vec<ModuleDescriptor>>,
        calls: Mutex<Vec<String>>,
        download_status: Mutex<Option<DownloadStartStatus>>,
    }

    impl FakeService {
        fn with(snapshots: Vec<Vec<ModuleDescriptor>>) -> Arc<Self> {
            let svc = Self::default();
            *svc.snapshots.lock() = snapshots.into_iter().map(Ok).collect();
            Arc::new(svc)
        }

        fn push_failure(&self, status: u16) {
            self.snapshots.lock().push_back(Err(status));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn action_calls(&self) -> Vec<String> {
            self.calls().into_iter().filter(|c| c != "list").collect()
        }
    }

    #[async_trait]
    impl ModuleService for FakeService {
        async fn list_modules(&self) -> Result<RegistrySnapshot, ApiError> {
            self.calls.lock().push("list".into());
            let next = self.snapshots.lock().pop_front();
            match next {
                Some(Ok(modules)) => {
                    *self.last.lock() = modules.clone();
                    Ok(RegistrySnapshot::new(modules))
                }
                Some(Err(status)) => Err(ApiError::Remote {
                    status,
                    message: None,
                }),
                None => Ok(RegistrySnapshot::new(self.last.lock().clone())),
            }
        }

        async fn start_download(&self, module_id: &str) -> Result<DownloadReply, ApiError> {
            self.calls.lock().push(format!("download {}", module_id));
            let status = self
                .download_status
                .lock()
                .unwrap_or(DownloadStartStatus::Downloading);
            Ok(DownloadReply {
                status,
                message: None,
                error: None,
                progress: None,
            })
        }

        async fn cancel_download(&self, module_id: &str) -> Result<CancelReply, ApiError> {
            self.calls.lock().push(format!("cancel {}", module_id));
            Ok(CancelReply {
                status: CancelStatus::Cancelled,
                message: None,
            })
        }

        async fn delete_module(&self, module_id: &str) -> Result<DeleteReply, ApiError> {
            self.calls.lock().push(format!("delete {}", module_id));
            Err(ApiError::Remote {
                status: 404,
                message: Some(format!("{} was not found", module_id)),
            })
        }
    }

    struct Answer(bool, Vec<String>);

    #[async_trait]
    impl ConfirmGate for Answer {
        async fn confirm(&mut self, prompt: &str) -> bool {
            self.1.push(prompt.to_string());
            self.0
        }
    }

    fn idle(id: &str, size: u64) -> ModuleDescriptor {
        ModuleDescriptor::new(id, format!("Model {}", id), size)
    }

    fn downloading(id: &str, progress: u8) -> ModuleDescriptor {
        let mut m = idle(id, 1_000);
        m.is_downloading = true;
        m.download_status = Some(DownloadStatus::new(DownloadState::Downloading, progress));
        m
    }

    fn downloaded(id: &str) -> ModuleDescriptor {
        let mut m = idle(id, 1_000);
        m.downloaded = true;
        m
    }

    fn orchestrator(service: Arc<FakeService>, available: u64) -> DownloadOrchestrator {
        DownloadOrchestrator::new(
            service,
            Box::new(StaticDiskSpace(DiskSpace::new(
                available.saturating_mul(2),
                available,
            ))),
            ToastQueue::new(Duration::from_millis(5000)),
            Duration::from_millis(2000),
        )
    }

    fn toast_texts(orch: &DownloadOrchestrator, severity: Severity) -> Vec<String> {
        orch.toasts()
            .list()
            .into_iter()
            .filter(|t| t.severity == severity)
            .map(|t| t.text)
            .collect()
    }

    /// Drive background events until polling stops or `max` events ran.
    async fn pump(orch: &mut DownloadOrchestrator, max: usize) {
        for _ in 0..max {
            if !orch.is_polling() {
                break;
            }
            let event = orch.next_event().await.unwrap();
            orch.handle_event(event);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_insufficient_space_rejects_without_network() {
        let svc = FakeService::with(vec![vec![idle("m1", 5_000_000_000)]]);
        let mut orch = orchestrator(svc.clone(), 1_000_000_000);
        orch.load_modules().await;

        let outcome = orch.request_download("m1").await;
        assert_eq!(
            outcome,
            ActionOutcome::Rejected(Rejection::InsufficientSpace {
                required: 5_000_000_000,
                available: 1_000_000_000
            })
        );
        assert!(svc.action_calls().is_empty());

        let errors = toast_texts(&orch, Severity::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("5000000000"));
        assert!(errors[0].contains("1000000000"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_requests_are_rejected_locally() {
        let svc = FakeService::with(vec![vec![downloaded("a"), downloading("b", 10)]]);
        let mut orch = orchestrator(svc.clone(), u64::MAX);
        orch.load_modules().await;

        assert_eq!(
            orch.request_download("a").await,
            ActionOutcome::Rejected(Rejection::AlreadyDownloaded)
        );
        assert_eq!(
            orch.request_download("b").await,
            ActionOutcome::Rejected(Rejection::AlreadyDownloading)
        );
        assert_eq!(
            orch.request_download("zzz").await,
            ActionOutcome::Rejected(Rejection::UnknownModule)
        );
        assert!(svc.action_calls().is_empty());
        assert_eq!(toast_texts(&orch, Severity::Info).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_polls_until_ready() {
        let svc = FakeService::with(vec![
            vec![idle("m1", 1_000)],
            vec![downloading("m1", 0)],
            vec![downloading("m1", 50)],
            vec![downloaded("m1")],
        ]);
        let mut orch = orchestrator(svc.clone(), u64::MAX);
        let ready = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&ready);
        orch.on_module_ready(move |m| seen.lock().push(m.id.clone()));

        orch.load_modules().await;
        assert!(!orch.is_polling());

        assert_eq!(orch.request_download("m1").await, ActionOutcome::Accepted);
        assert!(orch.is_polling());

        pump(&mut orch, 10).await;
        assert!(!orch.is_polling());
        assert_eq!(*ready.lock(), vec!["m1".to_string()]);
        assert!(orch.snapshot().get("m1").unwrap().downloaded);
        assert_eq!(
            toast_texts(&orch, Severity::Success),
            vec!["Model m1 downloaded successfully!".to_string()]
        );
        assert_eq!(
            svc.calls(),
            vec!["list", "download m1", "list", "list", "list"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reported_once_and_polling_stops() {
        let mut failed = idle("m2", 1_000);
        failed.download_status = Some(DownloadStatus::failed("disk full"));
        let svc = FakeService::with(vec![vec![downloading("m2", 40)], vec![failed]]);
        let mut orch = orchestrator(svc.clone(), u64::MAX);

        orch.load_modules().await;
        assert!(orch.is_polling());
        pump(&mut orch, 10).await;

        assert!(!orch.is_polling());
        let errors = toast_texts(&orch, Severity::Error);
        assert_eq!(errors, vec!["Download failed: Model m2: disk full".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_errors_are_silent_but_load_errors_toast() {
        let svc = FakeService::with(vec![vec![downloading("m1", 5)]]);
        svc.push_failure(503);
        let mut orch = orchestrator(svc.clone(), u64::MAX);

        orch.load_modules().await;
        // One tick, one failed fetch; polling carries on with the old snapshot
        let tick = orch.next_event().await.unwrap();
        orch.handle_event(tick);
        let fetched = orch.next_event().await.unwrap();
        orch.handle_event(fetched);
        assert!(orch.is_polling());
        assert!(toast_texts(&orch, Severity::Error).is_empty());

        svc.push_failure(500);
        orch.refresh().await;
        assert_eq!(toast_texts(&orch, Severity::Error), vec![LOAD_FAILED.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_results_ignored_after_dispose() {
        let svc = FakeService::with(vec![vec![downloading("m1", 5)], vec![downloaded("m1")]]);
        let mut orch = orchestrator(svc.clone(), u64::MAX);
        let ready = Arc::new(Mutex::new(0));
        let count = Arc::clone(&ready);
        orch.on_module_ready(move |_| *count.lock() += 1);

        orch.load_modules().await;
        let tick = orch.next_event().await.unwrap();
        orch.handle_event(tick);
        orch.dispose();

        let fetched = orch.next_event().await.unwrap();
        orch.handle_event(fetched);
        assert_eq!(*ready.lock(), 0);
        assert!(orch.snapshot().get("m1").unwrap().is_downloading);
        assert!(!orch.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlogged_ticks_issue_one_fetch() {
        let svc = FakeService::with(vec![vec![downloading("m1", 5)]]);
        let mut orch = orchestrator(svc.clone(), u64::MAX);
        orch.load_modules().await;
        assert!(orch.is_polling());

        // Owner busy (e.g. waiting on a confirmation) for ten periods
        tokio::time::sleep(Duration::from_millis(20_100)).await;

        let mut ticks = 0;
        while let Ok(event) = orch.events_rx.try_recv() {
            assert!(matches!(event, DownloadEvent::PollTick));
            ticks += 1;
            orch.handle_event(event);
        }
        assert!(ticks >= 5, "expected a backlog, got {} ticks", ticks);

        let fetched = orch.next_event().await.unwrap();
        assert!(matches!(
            fetched,
            DownloadEvent::SnapshotFetched {
                origin: FetchOrigin::Poll,
                ..
            }
        ));
        orch.handle_event(fetched);

        let lists = svc.calls().iter().filter(|c| *c == "list").count();
        assert_eq!(lists, 2);

        // The next tick fetches again
        let tick = orch.next_event().await.unwrap();
        orch.handle_event(tick);
        let fetched = orch.next_event().await.unwrap();
        orch.handle_event(fetched);
        assert_eq!(svc.calls().iter().filter(|c| *c == "list").count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_requires_confirmation() {
        let svc = FakeService::with(vec![vec![downloaded("m1"), idle("m2", 10)]]);
        let mut orch = orchestrator(svc.clone(), u64::MAX);
        orch.load_modules().await;

        let mut no = Answer(false, Vec::new());
        assert_eq!(
            orch.delete_module("m1", &mut no).await,
            ActionOutcome::Rejected(Rejection::Declined)
        );
        assert!(no.1[0].starts_with("Delete Model m1?"));
        assert!(svc.action_calls().is_empty());

        let mut yes = Answer(true, Vec::new());
        assert_eq!(
            orch.delete_module("m2", &mut yes).await,
            ActionOutcome::Rejected(Rejection::NotDownloaded)
        );
        assert!(yes.1.is_empty());

        // The fake backend answers 404 with a message, which becomes the toast
        assert_eq!(
            orch.delete_module("m1", &mut yes).await,
            ActionOutcome::Failed("m1 was not found".into())
        );
        assert_eq!(svc.action_calls(), vec!["delete m1"]);
        assert_eq!(toast_texts(&orch, Severity::Error), vec!["m1 was not found".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_running_download() {
        let svc = FakeService::with(vec![vec![downloading("m1", 30)], vec![idle("m1", 1_000)]]);
        let mut orch = orchestrator(svc.clone(), u64::MAX);
        orch.load_modules().await;
        assert!(orch.is_polling());

        let mut yes = Answer(true, Vec::new());
        assert_eq!(orch.cancel_download("m1", &mut yes).await, ActionOutcome::Accepted);
        assert_eq!(svc.action_calls(), vec!["cancel m1"]);
        assert!(!orch.is_polling());

        assert_eq!(
            orch.cancel_download("m1", &mut yes).await,
            ActionOutcome::Rejected(Rejection::NotDownloading)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_already_downloading_reply() {
        let svc = FakeService::with(vec![vec![idle("m1", 1_000)]]);
        *svc.download_status.lock() = Some(DownloadStartStatus::AlreadyDownloading);
        let mut orch = orchestrator(svc.clone(), u64::MAX);
        orch.load_modules().await;

        assert_eq!(orch.request_download("m1").await, ActionOutcome::AlreadyDone);
        assert_eq!(svc.calls(), vec!["list", "download m1", "list"]);
    }
}
