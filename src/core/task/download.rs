use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::core::control::SessionControl;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::observer::{CallbackGate, Progress};
use crate::core::queue::{Task, TaskId};
use super::retry::{RetryContext, RetryStrategy};
use super::state::{TaskPhase, TransferState};
use super::util::{existing_len, ChunkSplitter};

/// 传输块大小（字节）
pub const TRANSFER_CHUNK_SIZE: usize = 1024;

/// 所有 worker 共享的运行环境
pub struct TransferContext {
    pub client: Client,
    pub control: Arc<SessionControl>,
    pub gate: Arc<CallbackGate>,
    pub retry: RetryStrategy,
    pub chunk_size: usize,
}

/// 任务结束时的结果
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub locator: String,
    pub destination: PathBuf,
    pub phase: TaskPhase,
    pub bytes_written: u64,
    pub total_bytes: Option<u64>,
    /// 失败过的尝试次数
    pub attempts: u32,
    pub error: Option<String>,
}

impl TaskOutcome {
    fn new(task: &Task, state: &TransferState, error: Option<String>) -> Self {
        Self {
            id: task.id,
            locator: task.locator.clone(),
            destination: task.destination.clone(),
            phase: state.phase,
            bytes_written: state.bytes_written,
            total_bytes: state.total_bytes,
            attempts: state.attempt,
            error,
        }
    }

    /// 会话取消时尚未启动的任务
    pub fn not_started(task: &Task) -> Self {
        let state = TransferState {
            phase: TaskPhase::Cancelled,
            ..TransferState::new()
        };
        Self::new(task, &state, None)
    }
}

/// 执行单个任务：断点续传、分块写入、进度计算、重试退避
pub struct TransferWorker<'a> {
    ctx: &'a TransferContext,
    task: &'a Task,
    state: TransferState,
}

impl<'a> TransferWorker<'a> {
    pub fn new(ctx: &'a TransferContext, task: &'a Task) -> Self {
        Self {
            ctx,
            task,
            state: TransferState::new(),
        }
    }

    pub async fn run(mut self) -> TaskOutcome {
        log::info!("开始下载 {}: {} -> {}", self.task.id, self.task.locator, self.task.destination.display());
        self.state.phase = TaskPhase::InProgress;

        let url = match Url::parse(&self.task.locator) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => return self.fail(DownloadError::InvalidUrl(format!("不支持的协议: {}", url.scheme()))),
            Err(e) => return self.fail(e.into()),
        };

        let mut retry_context = RetryContext::new(self.ctx.retry.clone());
        loop {
            if self.ctx.control.is_cancelled() {
                return self.cancel();
            }

            let error = match self.attempt(&url).await {
                Ok(()) => return self.succeed(),
                Err(e) if e.is_cancelled() => return self.cancel(),
                Err(e) if !e.is_retryable() => return self.fail(e),
                Err(e) => e,
            };

            self.state.attempt += 1;
            let delay = retry_context.record_failure(&error, self.state.attempt);
            log::warn!(
                "{} 第 {} 次尝试失败: {}，{:?} 后{}",
                self.task.id,
                self.state.attempt,
                error,
                delay,
                if retry_context.should_retry(&error, self.state.attempt) { "重试" } else { "放弃" }
            );

            let cancelled = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = self.ctx.control.cancelled() => true,
            };
            if cancelled {
                return self.cancel();
            }

            if !retry_context.should_retry(&error, self.state.attempt) {
                let exhausted = DownloadError::MaxRetriesExceeded {
                    attempts: self.state.attempt,
                    last_error: error.to_string(),
                };
                return self.fail(exhausted);
            }
        }
    }

    /// 一次完整的请求与写入，从当前文件大小处续传
    async fn attempt(&mut self, url: &Url) -> DownloadResult<()> {
        let offset = existing_len(&self.task.destination).await?;
        self.state.resume_from(offset);

        let response = self.ctx.client
            .get(url.clone())
            .header(RANGE, format!("bytes={}-", offset))
            .send()
            .await?;

        let status = response.status();
        let declared = response.content_length();
        // 需要丢弃的响应前缀：服务器忽略 Range 时会从头发送
        let mut skip = match status {
            StatusCode::PARTIAL_CONTENT => {
                self.state.total_bytes = declared.map(|len| offset + len);
                0
            }
            StatusCode::RANGE_NOT_SATISFIABLE if offset > 0 => {
                log::info!("{} 本地文件已完整 ({} 字节)", self.task.id, offset);
                self.state.total_bytes = Some(offset);
                return Ok(());
            }
            s if s.is_success() => {
                if let Some(len) = declared {
                    if len < offset {
                        return Err(DownloadError::SizeMismatch { expected: len, actual: offset });
                    }
                }
                if offset > 0 {
                    log::warn!("{} 服务器不支持 Range，跳过已下载的 {} 字节", self.task.id, offset);
                }
                self.state.total_bytes = declared;
                offset
            }
            s => return Err(DownloadError::ServerError(format!("HTTP {}", s))),
        };

        let mut file = if offset > 0 {
            OpenOptions::new().append(true).open(&self.task.destination).await?
        } else {
            File::create(&self.task.destination).await?
        };

        let mut splitter = ChunkSplitter::new(self.ctx.chunk_size);
        let mut stream = response.bytes_stream();
        while let Some(item) = stream.next().await {
            let bytes = item?;
            let mut data = &bytes[..];
            if skip > 0 {
                let n = skip.min(data.len() as u64) as usize;
                data = &data[n..];
                skip -= n as u64;
            }
            splitter.push(data);
            while let Some(chunk) = splitter.next_chunk() {
                self.write_chunk(&mut file, &chunk).await?;
            }
        }
        if let Some(chunk) = splitter.finish() {
            self.write_chunk(&mut file, &chunk).await?;
        }

        if skip > 0 {
            return Err(DownloadError::IncompleteBody { expected: offset, actual: offset - skip });
        }
        if let Some(total) = self.state.total_bytes {
            if self.state.bytes_written < total {
                return Err(DownloadError::IncompleteBody {
                    expected: total,
                    actual: self.state.bytes_written,
                });
            }
        }
        Ok(())
    }

    /// 块边界：先等待暂停解除并检查取消，再写入并上报进度
    async fn write_chunk(&mut self, file: &mut File, chunk: &[u8]) -> DownloadResult<()> {
        if self.ctx.control.is_paused() {
            self.state.phase = TaskPhase::Suspended;
            log::debug!("{} 在 {} 字节处暂停", self.task.id, self.state.bytes_written);
        }
        self.ctx.control.wait_until_resumed().await?;
        self.state.phase = TaskPhase::InProgress;

        file.write_all(chunk).await?;
        file.flush().await?;
        self.state.advance(chunk.len() as u64);

        self.ctx.gate.progress(
            self.task.id,
            Progress::from_bytes(self.state.bytes_written, self.state.total_bytes),
        );
        Ok(())
    }

    fn succeed(mut self) -> TaskOutcome {
        self.state.phase = TaskPhase::Succeeded;
        self.ctx.gate.progress(self.task.id, Progress::complete());
        log::info!("{} 下载完成: {} 字节", self.task.id, self.state.bytes_written);
        TaskOutcome::new(self.task, &self.state, None)
    }

    fn fail(mut self, error: DownloadError) -> TaskOutcome {
        self.state.phase = TaskPhase::Failed;
        let message = format!("下载失败: {}", error);
        log::error!("{} {}", self.task.id, message);
        self.ctx.gate.progress(self.task.id, Progress::Failed);
        self.ctx.gate.error(self.task.id, &message);
        TaskOutcome::new(self.task, &self.state, Some(error.to_string()))
    }

    fn cancel(mut self) -> TaskOutcome {
        self.state.phase = TaskPhase::Cancelled;
        log::info!("{} 已取消，保留 {} 字节", self.task.id, self.state.bytes_written);
        TaskOutcome::new(self.task, &self.state, None)
    }
}
