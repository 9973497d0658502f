use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use crate::core::{ConflictDecision, ConflictPrompt, ConflictRecord, FileError, Result, TaskId};

/// A conflict waiting for a human answer. Answer it with [`resolve`].
///
/// Dropping it without answering counts as "nobody is left to answer".
///
/// [`resolve`]: PendingConflict::resolve
#[derive(Debug)]
pub struct PendingConflict {
    pub task_id: TaskId,
    pub filename: String,
    pub destination_path: String,
    reply: oneshot::Sender<ConflictDecision>,
}

impl PendingConflict {
    pub fn resolve(self, decision: ConflictDecision) {
        let _ = self.reply.send(decision);
    }
}

/// Forwards every conflict to a receiver as a [`PendingConflict`] and waits
/// for its answer.
#[derive(Clone)]
pub struct ChannelPrompt {
    pending_tx: mpsc::UnboundedSender<PendingConflict>,
}

impl ChannelPrompt {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingConflict>) {
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        (Self { pending_tx }, pending_rx)
    }
}

#[async_trait]
impl ConflictPrompt for ChannelPrompt {
    async fn decide(&self, conflict: &ConflictRecord) -> Result<ConflictDecision> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.pending_tx
            .send(PendingConflict {
                task_id: conflict.task.id,
                filename: conflict.conflicting_name.clone(),
                destination_path: conflict.task.destination_path.clone(),
                reply: reply_tx,
            })
            .map_err(|_| FileError::internal("Conflict prompt closed"))?;

        // 等待用户选择
        reply_rx
            .await
            .map_err(|_| FileError::internal("Conflict prompt dropped without an answer"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{SelectedFile, UploadTask};
    use crate::session::queue::build_queue;

    fn conflict() -> ConflictRecord {
        let task: UploadTask = build_queue(vec![SelectedFile::from_bytes("a.txt", "a")], "/")
            .pop()
            .unwrap();
        ConflictRecord { task, conflicting_name: "a.txt".to_string() }
    }

    #[tokio::test]
    async fn test_decision_round_trip() {
        let (prompt, mut pending_rx) = ChannelPrompt::new();

        let answer = tokio::spawn(async move {
            let pending = pending_rx.recv().await.unwrap();
            assert_eq!(pending.filename, "a.txt");
            assert_eq!(pending.destination_path, "/");
            pending.resolve(ConflictDecision::overwrite_all());
        });

        let decision = prompt.decide(&conflict()).await.unwrap();
        assert_eq!(decision, ConflictDecision::overwrite_all());
        answer.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_pending_is_an_error() {
        let (prompt, mut pending_rx) = ChannelPrompt::new();

        tokio::spawn(async move {
            let pending = pending_rx.recv().await.unwrap();
            drop(pending);
        });

        assert!(prompt.decide(&conflict()).await.is_err());
    }

    #[tokio::test]
    async fn test_closed_receiver_is_an_error() {
        let (prompt, pending_rx) = ChannelPrompt::new();
        drop(pending_rx);
        assert!(prompt.decide(&conflict()).await.is_err());
    }
}
