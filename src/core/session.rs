//! 下载会话：持有共享的暂停/取消信号、固定大小的 worker 池和回调闸门

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::config::Config;
use super::control::{SessionControl, SessionHandle};
use super::error::{DownloadError, DownloadResult};
use super::observer::{CallbackGate, DownloadObserver};
use super::queue::TaskQueue;
use super::task::{TaskOutcome, TaskPhase, TransferContext, TransferWorker};

/// 会话状态，由各任务的结果汇总得出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Cancelled,
    PartiallyFailed,
}

/// `run` 的返回值，按提交顺序列出每个任务的结果
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub state: SessionState,
    pub outcomes: Vec<TaskOutcome>,
}

impl SessionReport {
    pub fn count(&self, phase: TaskPhase) -> usize {
        self.outcomes.iter().filter(|o| o.phase == phase).count()
    }

    pub fn total_bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes_written).sum()
    }
}

pub struct DownloadSession {
    config: Config,
    ctx: Arc<TransferContext>,
    state: Mutex<SessionState>,
}

impl DownloadSession {
    pub fn new(config: Config, observer: Arc<dyn DownloadObserver>) -> DownloadResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .connect_timeout(config.request_timeout())
            .read_timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        let ctx = TransferContext {
            client,
            control: Arc::new(SessionControl::new()),
            gate: Arc::new(CallbackGate::new(observer)),
            retry: config.retry_strategy(),
            chunk_size: config.chunk_size,
        };

        Ok(Self {
            config,
            ctx: Arc::new(ctx),
            state: Mutex::new(SessionState::Idle),
        })
    }

    /// 可跨线程使用的控制句柄
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.ctx.control))
    }

    /// 下一个块边界生效
    pub fn pause(&self) {
        self.ctx.control.pause();
    }

    pub fn resume(&self) {
        self.ctx.control.resume();
    }

    /// 已写入磁盘的字节保留，供下次续传
    pub fn stop(&self) {
        self.ctx.control.stop();
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// 优先级等于提交序号
    pub async fn run_urls<I, S>(&self, urls: I, dest_dir: impl AsRef<Path>) -> DownloadResult<SessionReport>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries: Vec<(i64, String)> = urls
            .into_iter()
            .enumerate()
            .map(|(i, url)| (i as i64, url.into()))
            .collect();
        self.run(entries, dest_dir).await
    }

    /// 运行全部任务，所有任务进入终态后才返回
    ///
    /// 单个任务的失败只通过观察者上报，不会让 `run` 返回错误。
    pub async fn run<I, S>(&self, entries: I, dest_dir: impl AsRef<Path>) -> DownloadResult<SessionReport>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != SessionState::Idle {
                return Err(DownloadError::SessionAlreadyStarted);
            }
            *state = SessionState::Running;
        }

        let mut queue = TaskQueue::new(dest_dir);
        queue.submit(entries);
        let total = queue.len();
        let pool_size = match self.config.max_concurrent_downloads {
            0 => total,
            n => n.min(total),
        };
        log::info!("开始下载 {} 个任务，worker 数: {}", total, pool_size);

        let queue = Arc::new(Mutex::new(queue));
        let mut workers = JoinSet::new();
        for _ in 0..pool_size {
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&queue);
            workers.spawn(async move {
                let mut outcomes = Vec::new();
                loop {
                    let next = queue.lock().unwrap_or_else(PoisonError::into_inner).pop();
                    let Some(task) = next else { break };

                    if ctx.control.is_cancelled() {
                        outcomes.push(TaskOutcome::not_started(&task));
                        continue;
                    }
                    outcomes.push(TransferWorker::new(&ctx, &task).run().await);
                }
                outcomes
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(done) => outcomes.extend(done),
                Err(e) => log::error!("worker 异常退出: {}", e),
            }
        }
        outcomes.sort_by_key(|o| o.id.index);

        let state = if self.ctx.control.is_cancelled() {
            SessionState::Cancelled
        } else if outcomes.iter().any(|o| o.phase == TaskPhase::Failed) {
            SessionState::PartiallyFailed
        } else {
            SessionState::Completed
        };
        self.set_state(state);
        log::info!(
            "会话结束: {:?}，成功 {}，失败 {}，取消 {}",
            state,
            outcomes.iter().filter(|o| o.phase == TaskPhase::Succeeded).count(),
            outcomes.iter().filter(|o| o.phase == TaskPhase::Failed).count(),
            outcomes.iter().filter(|o| o.phase == TaskPhase::Cancelled).count(),
        );

        Ok(SessionReport { state, outcomes })
    }
}
