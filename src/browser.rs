//! Directory navigation and the non-upload file operations.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};
use crate::core::path::{normalize, parent};
use crate::core::{DirectoryListing, FileError, FileEvent, FileStore, Notice, Result};

pub struct DirectoryBrowser {
    store: Arc<dyn FileStore>,
    current_tx: watch::Sender<String>,
    event_tx: broadcast::Sender<FileEvent>,
}

impl DirectoryBrowser {
    pub fn new(store: Arc<dyn FileStore>, start_path: &str, event_tx: broadcast::Sender<FileEvent>) -> Self {
        let (current_tx, _) = watch::channel(normalize(start_path));

        Self {
            store,
            current_tx,
            event_tx,
        }
    }

    /// Receiver tracking the current directory.
    pub fn navigation(&self) -> watch::Receiver<String> {
        self.current_tx.subscribe()
    }

    pub fn current_path(&self) -> String {
        self.current_tx.borrow().clone()
    }

    /// List `path` and make it the current directory.
    pub async fn load(&self, path: &str) -> Result<DirectoryListing> {
        let path = normalize(path);
        debug!(%path, "listing directory");

        match self.store.list_directory(&path).await {
            Ok(listing) => {
                self.current_tx.send_replace(normalize(&listing.current_path));
                Ok(listing)
            }
            Err(err) => {
                warn!(%path, error = %err, "failed to load directory");
                self.notify(Notice::error(format!("Failed to load directory \"{}\": {}", path, err)));
                Err(err)
            }
        }
    }

    pub async fn refresh(&self) -> Result<DirectoryListing> {
        self.load(&self.current_path()).await
    }

    /// Load the parent directory. `None` when already at the root.
    pub async fn go_up(&self) -> Result<Option<DirectoryListing>> {
        match parent(&self.current_path()) {
            Some(parent_path) => self.load(&parent_path).await.map(Some),
            None => Ok(None),
        }
    }

    /// Subdirectories of `path`, without changing the current directory.
    pub async fn subdirectories(&self, path: &str) -> Result<DirectoryListing> {
        self.store.list_subdirectories(&normalize(path)).await
    }

    pub async fn delete(&self, path: &str, name: &str) -> Result<()> {
        self.notify(Notice::info(format!("Starting deletion of \"{}\"", name)));

        let result = self.store.delete_entry(path).await;
        self.finish(
            result,
            format!("\"{}\" deleted successfully", name),
            format!("Failed to delete \"{}\"", name),
        )
        .await
    }

    pub async fn rename(&self, path: &str, new_name: &str) -> Result<()> {
        let new_name = self.validate_name(new_name)?;

        let result = self.store.rename_entry(path, new_name).await;
        self.finish(result, "Item renamed successfully".to_string(), "Failed to rename".to_string())
            .await
    }

    /// Create `name` inside the current directory.
    pub async fn create_folder(&self, name: &str) -> Result<()> {
        let name = self.validate_name(name)?;

        let result = self.store.create_directory(&self.current_path(), name).await;
        self.finish(result, "Folder created successfully".to_string(), "Failed to create folder".to_string())
            .await
    }

    /// Move `path` into `dest_dir`.
    pub async fn move_to(&self, path: &str, dest_dir: &str) -> Result<()> {
        let result = self.store.move_entry(path, &normalize(dest_dir)).await;
        self.finish(result, "Item moved successfully".to_string(), "Failed to move".to_string())
            .await
    }

    fn validate_name<'a>(&self, name: &'a str) -> Result<&'a str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            let message = "Please enter a valid name";
            self.notify(Notice::warning(message));
            return Err(FileError::validation(message));
        }
        Ok(trimmed)
    }

    async fn finish(&self, result: Result<()>, success: String, failure: String) -> Result<()> {
        match result {
            Ok(()) => {
                self.notify(Notice::success(success));
                // 刷新失败已经单独通知过
                let _ = self.refresh().await;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "{}", failure);
                self.notify(Notice::error(format!("{}: {}", failure, err)));
                Err(err)
            }
        }
    }

    fn notify(&self, notice: Notice) {
        let _ = self.event_tx.send(FileEvent::Notice(notice));
    }
}
