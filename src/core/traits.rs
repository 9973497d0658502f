use async_trait::async_trait;
use super::errors::Result;
use super::types::{ConflictDecision, ConflictRecord, DirectoryListing, UploadOutcome, UploadTask};

/// 远端文件存储 - 所有存储实现都必须实现此接口
#[async_trait]
pub trait FileStore: Send + Sync {
    /// List the entries of a directory.
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing>;

    /// List only the subdirectories of a directory.
    async fn list_subdirectories(&self, path: &str) -> Result<DirectoryListing>;

    /// Send one file. Transport failures are reported as
    /// [`UploadOutcome::Rejected`], never as `Err`.
    async fn upload_file(&self, task: &UploadTask, overwrite: bool) -> UploadOutcome;

    async fn delete_entry(&self, path: &str) -> Result<()>;

    async fn rename_entry(&self, old_path: &str, new_name: &str) -> Result<()>;

    async fn create_directory(&self, path: &str, name: &str) -> Result<()>;

    /// Move `from` into the directory `to_dir`, keeping its name.
    async fn move_entry(&self, from: &str, to_dir: &str) -> Result<()>;
}

/// 冲突确认 - 等待用户做出选择
#[async_trait]
pub trait ConflictPrompt: Send + Sync {
    /// Ask whether the conflicting file should be overwritten. Exactly one
    /// answer per call. An `Err` means nobody is left to answer.
    async fn decide(&self, conflict: &ConflictRecord) -> Result<ConflictDecision>;
}
