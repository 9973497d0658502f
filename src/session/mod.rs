mod manager;
mod prompt;
mod queue;
mod walker;

pub use manager::{UploadSessionHandle, UploadSessionManager};
pub use prompt::{ChannelPrompt, PendingConflict};
pub use queue::build_queue;
pub use walker::{collect_selection, walk_directory};
