use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use super::error::{DownloadError, DownloadResult};

/// 会话级共享的暂停/取消信号，所有 worker 在每个块边界读取
#[derive(Debug, Default)]
pub struct SessionControl {
    is_paused: AtomicBool,
    is_cancelled: AtomicBool,
    changed: Notify,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.is_paused.store(true, Ordering::SeqCst);
        log::info!("会话已暂停");
    }

    pub fn resume(&self) {
        self.is_paused.store(false, Ordering::SeqCst);
        self.changed.notify_waiters();
        log::info!("会话已恢复");
    }

    pub fn stop(&self) {
        self.is_cancelled.store(true, Ordering::SeqCst);
        self.changed.notify_waiters();
        log::info!("会话已取消");
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled.load(Ordering::SeqCst)
    }

    /// 暂停期间挂起等待；取消时返回 `DownloadError::Cancelled`
    pub async fn wait_until_resumed(&self) -> DownloadResult<()> {
        loop {
            // 先登记等待者再检查标志，避免错过 notify_waiters
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return Err(DownloadError::Cancelled);
            }
            if !self.is_paused() {
                return Ok(());
            }
            notified.await;
        }
    }

    /// 一直等到会话被取消
    pub async fn cancelled(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// 给外部调用方的控制句柄，可以跨线程克隆
#[derive(Debug, Clone)]
pub struct SessionHandle {
    control: Arc<SessionControl>,
}

impl SessionHandle {
    pub(crate) fn new(control: Arc<SessionControl>) -> Self {
        Self { control }
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }
}
