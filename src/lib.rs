//! # batchdown
//!
//! 可断点续传的并发批量下载引擎：
//! - 按优先级排序的任务队列，固定大小的 worker 池
//! - 基于本地文件大小的 Range 续传，1024 字节分块写盘
//! - 会话级暂停/恢复/取消，在块边界生效
//! - 指数退避重试
//! - SHA-256 完整性校验

pub mod cli;
pub mod config;
pub mod core;
pub mod ui;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::{
    hash_file, DownloadError, DownloadObserver, DownloadSession, Progress, SessionHandle,
    SessionReport, SessionState, TaskId, TaskOutcome, TaskPhase,
};
