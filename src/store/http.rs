use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use futures_util::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;
use super::counting::CountingStream;
use crate::core::{
    DirectoryListing,
    FileContent,
    FileError,
    FileStore,
    Result,
    UploadOutcome,
    UploadTask,
};

/// Body of `/api/upload` and of every mutating endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionResponse {
    success: bool,
    conflict: bool,
    filename: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct PathRequest<'a> {
    path: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenameRequest<'a> {
    old_path: &'a str,
    new_name: &'a str,
}

#[derive(Serialize)]
struct MkdirRequest<'a> {
    path: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct MoveRequest<'a> {
    from: &'a str,
    to: &'a str,
}

/// Map an `/api/upload` reply onto an outcome. A collision is reported with
/// status 200 and `"conflict": true`. `bytes_sent` is what the body stream
/// handed over before the reply came back.
pub(crate) fn parse_upload_response(
    status: StatusCode,
    body: &str,
    fallback_name: &str,
    bytes_sent: u64,
) -> UploadOutcome {
    let parsed = serde_json::from_str::<ActionResponse>(body);

    if let Ok(reply) = &parsed {
        if reply.conflict {
            let name = reply.filename.clone().unwrap_or_else(|| fallback_name.to_string());
            return UploadOutcome::Collision(name);
        }
    }

    if !status.is_success() {
        return UploadOutcome::Rejected(format!("Server error ({}): {}", status.as_u16(), body.trim()));
    }

    match parsed {
        Ok(reply) if reply.success => UploadOutcome::Accepted { bytes_sent },
        Ok(reply) => UploadOutcome::Rejected(reply.error.unwrap_or_else(|| "Upload failed".to_string())),
        Err(err) => UploadOutcome::Rejected(format!("Invalid response: {}", err)),
    }
}

/// Check the reply of a delete/rename/mkdir/move call.
pub(crate) fn parse_action_response(status: StatusCode, body: &str, action: &str) -> Result<()> {
    if !status.is_success() {
        return Err(FileError::remote(status.as_u16(), body.trim()));
    }

    let reply: ActionResponse = serde_json::from_str(body)
        .map_err(|err| FileError::remote(status.as_u16(), format!("Invalid response: {}", err)))?;

    if reply.success {
        Ok(())
    } else {
        Err(FileError::remote(
            status.as_u16(),
            reply.error.unwrap_or_else(|| format!("{} failed", action)),
        ))
    }
}

/// `FileStore` backed by the file manager HTTP API.
#[derive(Debug, Clone)]
pub struct HttpFileStore {
    client: Client,
    endpoint: Url,
}

impl HttpFileStore {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn api(&self, name: &str) -> Result<Url> {
        Ok(self.endpoint.join(&format!("/api/{}", name))?)
    }

    async fn get_listing(&self, api: &str, path: &str) -> Result<DirectoryListing> {
        let response = self.client
            .get(self.api(api)?)
            .query(&[("path", path)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(FileError::remote(status.as_u16(), text.trim()));
        }

        Ok(response.json().await?)
    }

    async fn finish_action(response: Response, action: &str) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        parse_action_response(status, &body, action)
    }

    /// The `file` part. Both kinds of content go through a [`CountingStream`]
    /// feeding `counter`.
    async fn file_part(task: &UploadTask, counter: Arc<AtomicU64>) -> Result<Part> {
        let part = match &task.content {
            FileContent::Disk(path) => {
                let file = File::open(path).await?;
                let size = file.metadata().await?.len();
                let stream = CountingStream::new(ReaderStream::new(file), counter);
                Part::stream_with_length(Body::wrap_stream(stream), size)
            }
            FileContent::Memory(bytes) => {
                let size = bytes.len() as u64;
                let chunk = bytes.clone();
                let stream = CountingStream::new(stream::once(async move { Ok::<_, std::io::Error>(chunk) }), counter);
                Part::stream_with_length(Body::wrap_stream(stream), size)
            }
        };

        Ok(part.file_name(task.name.clone()))
    }

    async fn send_upload(&self, task: &UploadTask, overwrite: bool) -> Result<UploadOutcome> {
        let counter = Arc::new(AtomicU64::new(0));
        let mut form = Form::new()
            .part("file", Self::file_part(task, counter.clone()).await?)
            .text("path", task.destination_path.clone());

        // 服务端只认 "true"
        if overwrite {
            form = form.text("overwrite", "true");
        }
        if task.create_intermediate_path {
            form = form.text("createPath", "true");
        }

        let response = self.client
            .post(self.api("upload")?)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let bytes_sent = counter.load(Ordering::Relaxed);

        Ok(parse_upload_response(status, &body, &task.name, bytes_sent))
    }
}

#[async_trait]
impl FileStore for HttpFileStore {
    async fn list_directory(&self, path: &str) -> Result<DirectoryListing> {
        self.get_listing("list", path).await
    }

    async fn list_subdirectories(&self, path: &str) -> Result<DirectoryListing> {
        self.get_listing("ls", path).await
    }

    async fn upload_file(&self, task: &UploadTask, overwrite: bool) -> UploadOutcome {
        debug!(task = %task.id, name = %task.name, path = %task.destination_path, overwrite, "uploading");

        match self.send_upload(task, overwrite).await {
            Ok(outcome) => outcome,
            Err(err) => UploadOutcome::Rejected(err.to_string()),
        }
    }

    async fn delete_entry(&self, path: &str) -> Result<()> {
        let response = self.client
            .delete(self.api("delete")?)
            .json(&PathRequest { path })
            .send()
            .await?;

        Self::finish_action(response, "Delete").await
    }

    async fn rename_entry(&self, old_path: &str, new_name: &str) -> Result<()> {
        let response = self.client
            .post(self.api("rename")?)
            .json(&RenameRequest { old_path, new_name })
            .send()
            .await?;

        Self::finish_action(response, "Rename").await
    }

    async fn create_directory(&self, path: &str, name: &str) -> Result<()> {
        let response = self.client
            .post(self.api("mkdir")?)
            .json(&MkdirRequest { path, name })
            .send()
            .await?;

        Self::finish_action(response, "Create folder").await
    }

    async fn move_entry(&self, from: &str, to_dir: &str) -> Result<()> {
        let response = self.client
            .post(self.api("move")?)
            .json(&MoveRequest { from, to: to_dir })
            .send()
            .await?;

        Self::finish_action(response, "Move").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_accepted() {
        let body = r#"{"success":true,"message":"File uploaded successfully"}"#;
        assert_eq!(
            parse_upload_response(StatusCode::OK, body, "a.txt", 42),
            UploadOutcome::Accepted { bytes_sent: 42 }
        );
    }

    #[test]
    fn test_upload_conflict() {
        let body = r#"{"success":false,"error":"File already exists","conflict":true,"filename":"b.txt"}"#;
        assert_eq!(
            parse_upload_response(StatusCode::OK, body, "a.txt", 0),
            UploadOutcome::Collision("b.txt".to_string())
        );

        let body = r#"{"conflict":true}"#;
        assert_eq!(
            parse_upload_response(StatusCode::OK, body, "a.txt", 0),
            UploadOutcome::Collision("a.txt".to_string())
        );
    }

    #[test]
    fn test_upload_rejected() {
        let body = r#"{"success":false,"error":"disk full"}"#;
        assert_eq!(
            parse_upload_response(StatusCode::OK, body, "a.txt", 0),
            UploadOutcome::Rejected("disk full".to_string())
        );

        let outcome = parse_upload_response(StatusCode::BAD_REQUEST, "Invalid target path\n", "a.txt", 0);
        assert_eq!(outcome, UploadOutcome::Rejected("Server error (400): Invalid target path".to_string()));

        let outcome = parse_upload_response(StatusCode::OK, "<html>", "a.txt", 0);
        assert!(matches!(outcome, UploadOutcome::Rejected(reason) if reason.starts_with("Invalid response")));
    }

    #[test]
    fn test_action_response() {
        assert!(parse_action_response(StatusCode::OK, r#"{"success":true}"#, "Delete").is_ok());

        let err = parse_action_response(StatusCode::CONFLICT, "Destination already exists\n", "Move").unwrap_err();
        match err {
            FileError::Remote { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Destination already exists");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parse_action_response(StatusCode::OK, r#"{"success":false}"#, "Rename").unwrap_err();
        assert_eq!(err.to_string(), "Server error (200): Rename failed");
    }

    #[test]
    fn test_api_urls() {
        let store = HttpFileStore::new("http://127.0.0.1:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(store.api("list").unwrap().as_str(), "http://127.0.0.1:8080/api/list");
        assert_eq!(store.api("upload").unwrap().as_str(), "http://127.0.0.1:8080/api/upload");
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = HttpFileStore::new("not a url", Duration::from_secs(5));
        assert!(matches!(result, Err(FileError::InvalidUrl(_))));
    }
}
