//! Core: 任务队列、传输 worker、会话控制、回调闸门、完整性校验

pub mod control;
pub mod error;
pub mod observer;
pub mod queue;
pub mod session;
pub mod task;
pub mod verify;

pub use control::{SessionControl, SessionHandle};
pub use error::{DownloadError, DownloadResult};
pub use observer::{DownloadObserver, FnObserver, Progress};
pub use queue::{Task, TaskId, TaskQueue};
pub use session::{DownloadSession, SessionReport, SessionState};
pub use task::{TaskOutcome, TaskPhase};
pub use verify::{hash_file, hash_reader, verify_file};
