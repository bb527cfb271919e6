pub mod backend;
pub mod config;
pub mod error;
pub mod exchange;
pub mod fallback;
pub mod render;
pub mod state;
pub mod storage;

// Re-export main types for convenience
pub use backend::{ChatBackend, ChatRequest, HttpBackend};
pub use config::Config;
pub use error::{ExchangeError, StorageError};
pub use exchange::{Exchange, ExchangeClient, Notice, NoticeLevel};
pub use fallback::APOLOGY_REPLY;
pub use render::{render, render_transcript};
pub use state::{BusinessProfile, FallbackMode, HistoryEntry, Message, MessageId, Origin, SessionState};
pub use storage::{FileStore, ProfileStore, SessionStore};
