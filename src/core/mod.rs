mod errors;
mod traits;
mod types;
pub mod path;

pub use errors::{FileError, Result};
pub use traits::{ConflictPrompt, FileStore};
pub use types::{
    ConflictDecision,
    ConflictRecord,
    DirectoryListing,
    DrainState,
    EntryInfo,
    FileContent,
    FileEvent,
    Notice,
    NoticeLevel,
    OutcomeTally,
    SelectedFile,
    SessionPolicy,
    SessionStatus,
    TaskId,
    UploadOutcome,
    UploadTask,
};
