pub mod browser;
pub mod config;
pub mod core;
pub mod session;
pub mod store;

// 重新导出核心类型
pub use self::core::{
    ConflictDecision,
    ConflictPrompt,
    DirectoryListing,
    DrainState,
    FileError,
    FileEvent,
    FileStore,
    Notice,
    NoticeLevel,
    OutcomeTally,
    Result,
    SelectedFile,
    SessionStatus,
    UploadOutcome,
    UploadTask,
};

pub use browser::DirectoryBrowser;
pub use session::{ChannelPrompt, PendingConflict, UploadSessionHandle, UploadSessionManager};
pub use store::HttpFileStore;
