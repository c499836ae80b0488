//! `task` 模块包含了与单个下载任务相关的所有逻辑
//!
//! 主要包括：
//! - `state`: 任务阶段 `TaskPhase` 与传输状态 `TransferState`
//! - `download`: `TransferWorker`，实际的下载逻辑
//! - `retry`: 重试与指数退避
//! - `util`: 分块器、文件名推断等工具

pub mod state;
pub mod download;
pub mod retry;
pub mod util;

pub use download::{TaskOutcome, TransferContext, TransferWorker, TRANSFER_CHUNK_SIZE};
pub use state::{TaskPhase, TransferState};
pub use self::retry::{RetryContext, RetryStrategy};
pub use self::util::ChunkSplitter;
