//! Chat orchestration: uploads, chat turns and history management.

mod prompt;
mod service;
mod types;

pub use prompt::build_system_prompt;
pub use service::{ChatApi, ChatService};
pub use types::{ChatError, ChatSettings, SendOutcome, UploadOutcome};
