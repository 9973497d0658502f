use std::path::{Path, PathBuf};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use super::errors::{FileError, Result};

// Go 的 json 会把空 slice 编码成 null
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// 上传任务唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The bytes behind a selected file.
#[derive(Debug, Clone)]
pub enum FileContent {
    /// Streamed from the local filesystem when uploaded.
    Disk(PathBuf),
    /// Already in memory.
    Memory(Bytes),
}

impl FileContent {
    pub async fn size(&self) -> Result<u64> {
        match self {
            FileContent::Disk(path) => Ok(tokio::fs::metadata(path).await?.len()),
            FileContent::Memory(bytes) => Ok(bytes.len() as u64),
        }
    }
}

/// A file picked by the user, before any destination is decided.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    /// Path relative to the picked folder, including the folder itself
    /// (`photos/2024/a.jpg`). `None` for individually picked files.
    pub relative_path: Option<String>,
    pub content: FileContent,
}

impl SelectedFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| FileError::validation(format!("Invalid file name: {}", path.display())))?
            .to_string();

        Ok(Self {
            name,
            relative_path: None,
            content: FileContent::Disk(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            relative_path: None,
            content: FileContent::Memory(bytes.into()),
        }
    }

    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }
}

/// One file pending transfer. Never mutated after the queue is built.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: TaskId,
    pub name: String,
    pub content: FileContent,
    /// Absolute remote directory the file lands in.
    pub destination_path: String,
    /// Ask the store to create missing directories of `destination_path`.
    pub create_intermediate_path: bool,
}

/// Result of a single upload call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted {
        /// Payload bytes handed to the transport.
        bytes_sent: u64,
    },
    /// The destination already holds an entry with this name.
    Collision(String),
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub task: UploadTask,
    pub conflicting_name: String,
}

/// Answer to one conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDecision {
    pub overwrite: bool,
    /// Reuse this answer for every remaining conflict of the session.
    pub apply_to_all: bool,
}

impl ConflictDecision {
    pub fn overwrite() -> Self {
        Self { overwrite: true, apply_to_all: false }
    }

    pub fn skip() -> Self {
        Self { overwrite: false, apply_to_all: false }
    }

    pub fn overwrite_all() -> Self {
        Self { overwrite: true, apply_to_all: true }
    }

    pub fn skip_all() -> Self {
        Self { overwrite: false, apply_to_all: true }
    }
}

/// Sticky per-session answers. At most one flag is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    pub always_overwrite: bool,
    pub always_skip: bool,
}

impl SessionPolicy {
    /// The remembered answer, if any.
    pub fn preset(&self) -> Option<ConflictDecision> {
        if self.always_overwrite {
            Some(ConflictDecision::overwrite())
        } else if self.always_skip {
            Some(ConflictDecision::skip())
        } else {
            None
        }
    }

    pub fn remember(&mut self, decision: ConflictDecision) {
        if !decision.apply_to_all {
            return;
        }
        self.always_overwrite = decision.overwrite;
        self.always_skip = !decision.overwrite;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    pub success: u32,
    pub error: u32,
    pub overwritten: u32,
    pub ignored: u32,
    /// Payload bytes of every accepted upload this session.
    pub bytes_sent: u64,
}

impl OutcomeTally {
    /// End-of-session message, `None` when there is nothing to report.
    pub fn summary(&self) -> Option<Notice> {
        if self.success > 0 {
            let mut message = format!("Successfully uploaded {} file(s)", self.success);
            if self.overwritten > 0 {
                message.push_str(&format!(", {} overwritten", self.overwritten));
            }
            if self.ignored > 0 {
                message.push_str(&format!(", {} ignored", self.ignored));
            }
            if self.error > 0 {
                message.push_str(&format!(", {} failed", self.error));
            }
            return Some(Notice::success(message));
        }

        if self.error > 0 {
            return Some(Notice::error(format!("Failed to upload {} file(s)", self.error)));
        }

        if self.overwritten > 0 || self.ignored > 0 {
            return Some(Notice::info(format!(
                "Upload finished: {} overwritten, {} ignored",
                self.overwritten, self.ignored
            )));
        }

        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainState {
    #[default]
    Idle,
    MainPass,
    ConflictPass,
}

/// Snapshot of the upload manager, published after every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: DrainState,
    pub tally: OutcomeTally,
    pub policy: SessionPolicy,
    /// Tasks not yet sent in the main pass.
    pub queued: usize,
    /// Conflicts waiting for a decision.
    pub pending_conflicts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

#[derive(Debug, Clone)]
pub enum FileEvent {
    /// 给用户看的通知
    Notice(Notice),

    /// 上传状态机切换
    StateChanged {
        from: DrainState,
        to: DrainState,
    },

    /// 一轮上传结束，携带本轮统计
    SessionFinished(OutcomeTally),

    /// 需要重新加载当前目录
    RefreshRequested {
        path: String,
    },
}

/// One row of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    #[serde(default)]
    pub size: u64,
    pub mod_time: DateTime<Utc>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size_formatted: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub current_path: String,
    /// Empty at the root.
    #[serde(default)]
    pub parent_path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<EntryInfo>,
}

// 静态断言确保类型是 Send 的
const _: () = {
    fn assert_send<T: Send>() {}
    fn assert_types() {
        assert_send::<UploadTask>();
        assert_send::<FileEvent>();
        assert_send::<ConflictRecord>();
    }
};
