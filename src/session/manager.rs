use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::core::{
    ConflictDecision,
    ConflictPrompt,
    ConflictRecord,
    DrainState,
    FileError,
    FileEvent,
    FileStore,
    Notice,
    OutcomeTally,
    Result,
    SelectedFile,
    SessionPolicy,
    SessionStatus,
    UploadOutcome,
    UploadTask,
};
use super::queue::build_queue;

/// Front of the upload session manager. Cheap to clone; every clone feeds
/// the same queue, so there is only ever one drain.
#[derive(Clone)]
pub struct UploadSessionManager {
    queue_tx: mpsc::UnboundedSender<Vec<UploadTask>>,
    event_tx: broadcast::Sender<FileEvent>,
    navigation: watch::Receiver<String>,
    status_rx: watch::Receiver<SessionStatus>,
}

/// 上传管理器句柄 - 包含管理器和工作任务
pub struct UploadSessionHandle {
    pub manager: UploadSessionManager,
    pub worker_handle: JoinHandle<()>,
}

impl UploadSessionHandle {
    /// Wait for queued work to finish and stop the worker. Other clones of
    /// the manager must be dropped first.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.manager);
        self.worker_handle.await
            .map_err(|err| FileError::internal(format!("Worker panic: {}", err)))
    }
}

impl UploadSessionManager {
    /// Spawn the worker. `navigation` carries the directory currently shown
    /// by the browser; uploads without a folder structure land there.
    pub fn new(
        store: Arc<dyn FileStore>,
        prompt: Arc<dyn ConflictPrompt>,
        navigation: watch::Receiver<String>,
        event_tx: broadcast::Sender<FileEvent>,
    ) -> UploadSessionHandle {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        let worker = UploadWorker {
            store,
            prompt,
            queue_rx,
            queue: VecDeque::new(),
            event_tx: event_tx.clone(),
            status_tx,
            navigation: navigation.clone(),
            state: DrainState::Idle,
        };
        let worker_handle = tokio::spawn(worker.run());

        let manager = Self {
            queue_tx,
            event_tx,
            navigation,
            status_rx,
        };

        UploadSessionHandle {
            manager,
            worker_handle,
        }
    }

    /// Queue a selection for upload and return how many files were queued.
    ///
    /// If a session is already draining, the files join it instead of
    /// starting a second one.
    pub fn submit(&self, files: Vec<SelectedFile>, is_folder: bool) -> Result<usize> {
        if files.is_empty() {
            return Err(self.reject_empty());
        }

        let kind = if is_folder { "folder" } else { "file" };
        self.notify(Notice::info(format!("Processing {} upload...", kind)));

        let current_dir = self.navigation.borrow().clone();
        let tasks = build_queue(files, &current_dir);
        if tasks.is_empty() {
            return Err(self.reject_empty());
        }

        let count = tasks.len();
        self.notify(Notice::info(format!("Found {} files to upload", count)));

        self.queue_tx
            .send(tasks)
            .map_err(|_| FileError::ManagerShutdown)?;

        Ok(count)
    }

    /// Latest published state of the drain.
    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// 订阅事件
    ///
    /// 接收太慢会丢事件（lagged error）
    pub fn subscribe_events(&self) -> broadcast::Receiver<FileEvent> {
        self.event_tx.subscribe()
    }

    fn reject_empty(&self) -> FileError {
        let message = "No files found to upload";
        self.notify(Notice::warning(message));
        FileError::validation(message)
    }

    fn notify(&self, notice: Notice) {
        let _ = self.event_tx.send(FileEvent::Notice(notice));
    }
}

/// State owned by one drain cycle. Dropping it resets tally and policy.
#[derive(Debug, Default)]
struct DrainSession {
    conflicts: VecDeque<ConflictRecord>,
    policy: SessionPolicy,
    tally: OutcomeTally,
}

struct UploadWorker {
    store: Arc<dyn FileStore>,
    prompt: Arc<dyn ConflictPrompt>,
    queue_rx: mpsc::UnboundedReceiver<Vec<UploadTask>>,
    queue: VecDeque<UploadTask>,
    event_tx: broadcast::Sender<FileEvent>,
    status_tx: watch::Sender<SessionStatus>,
    navigation: watch::Receiver<String>,
    state: DrainState,
}

impl UploadWorker {
    async fn run(mut self) {
        // 主循环, 等待第一批任务
        while let Some(batch) = self.queue_rx.recv().await {
            self.queue.extend(batch);
            self.drain().await;
        }

        debug!("upload worker stopped");
    }

    /// One cycle: main pass, conflict pass, summary.
    async fn drain(&mut self) {
        let mut session = DrainSession::default();
        info!(queued = self.queue.len(), "upload session started");

        self.transition(DrainState::MainPass, &session);
        loop {
            self.absorb_submissions();
            let Some(task) = self.queue.pop_front() else {
                break;
            };

            self.upload_queued(task, &mut session).await;
            self.publish(&session);
        }

        self.transition(DrainState::ConflictPass, &session);
        while let Some(conflict) = session.conflicts.pop_front() {
            self.resolve_conflict(conflict, &mut session).await;
            self.publish(&session);
        }

        self.finish(session);
    }

    /// Pull in batches submitted while the main pass is running.
    fn absorb_submissions(&mut self) {
        while let Ok(batch) = self.queue_rx.try_recv() {
            self.queue.extend(batch);
        }
    }

    async fn upload_queued(&self, task: UploadTask, session: &mut DrainSession) {
        debug!(task = %task.id, name = %task.name, path = %task.destination_path, "main pass upload");

        match self.store.upload_file(&task, false).await {
            UploadOutcome::Accepted { bytes_sent } => {
                session.tally.success += 1;
                session.tally.bytes_sent += bytes_sent;
            }
            UploadOutcome::Collision(conflicting_name) => {
                debug!(task = %task.id, name = %conflicting_name, "deferred collision");
                session.conflicts.push_back(ConflictRecord { task, conflicting_name });
            }
            UploadOutcome::Rejected(reason) => {
                warn!(task = %task.id, name = %task.name, %reason, "upload failed");
                self.report_failure(&task, &reason);
                session.tally.error += 1;
            }
        }
    }

    async fn resolve_conflict(&self, conflict: ConflictRecord, session: &mut DrainSession) {
        let decision = match session.policy.preset() {
            Some(decision) => decision,
            None => match self.prompt.decide(&conflict).await {
                Ok(decision) => {
                    session.policy.remember(decision);
                    decision
                }
                Err(err) => {
                    warn!(name = %conflict.conflicting_name, error = %err, "no answer to conflict, skipping");
                    ConflictDecision::skip()
                }
            },
        };

        if !decision.overwrite {
            session.tally.ignored += 1;
            return;
        }

        // 冲突只记一次: 覆盖失败也算 overwritten, 只额外通知
        session.tally.overwritten += 1;
        match self.store.upload_file(&conflict.task, true).await {
            UploadOutcome::Accepted { bytes_sent } => {
                session.tally.bytes_sent += bytes_sent;
            }
            UploadOutcome::Collision(name) => {
                warn!(task = %conflict.task.id, %name, "store refused overwrite");
                self.report_failure(&conflict.task, "File already exists");
            }
            UploadOutcome::Rejected(reason) => {
                warn!(task = %conflict.task.id, name = %conflict.task.name, %reason, "overwrite failed");
                self.report_failure(&conflict.task, &reason);
            }
        }
    }

    fn report_failure(&self, task: &UploadTask, reason: &str) {
        let notice = Notice::error(format!("Failed to upload {}: {}", task.name, reason));
        let _ = self.event_tx.send(FileEvent::Notice(notice));
    }

    fn finish(&mut self, session: DrainSession) {
        let tally = session.tally;
        info!(
            success = tally.success,
            error = tally.error,
            overwritten = tally.overwritten,
            ignored = tally.ignored,
            bytes_sent = tally.bytes_sent,
            "upload session finished"
        );

        if let Some(notice) = tally.summary() {
            let _ = self.event_tx.send(FileEvent::Notice(notice));
        }
        let _ = self.event_tx.send(FileEvent::SessionFinished(tally));

        drop(session);
        self.transition(DrainState::Idle, &DrainSession::default());

        let path = self.navigation.borrow().clone();
        let _ = self.event_tx.send(FileEvent::RefreshRequested { path });
    }

    fn transition(&mut self, to: DrainState, session: &DrainSession) {
        let from = self.state;
        self.state = to;
        self.publish(session);
        let _ = self.event_tx.send(FileEvent::StateChanged { from, to });
    }

    fn publish(&self, session: &DrainSession) {
        self.status_tx.send_replace(SessionStatus {
            state: self.state,
            tally: session.tally,
            policy: session.policy,
            queued: self.queue.len(),
            pending_conflicts: session.conflicts.len(),
        });
    }
}
