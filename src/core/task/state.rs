use serde::{Deserialize, Serialize};

/// 单个任务的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPhase {
    Pending,
    InProgress,
    Suspended,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Succeeded | TaskPhase::Failed | TaskPhase::Cancelled)
    }
}

/// worker 独占的传输状态，外部只能通过回调观察
#[derive(Debug, Clone)]
pub struct TransferState {
    pub bytes_written: u64,
    pub total_bytes: Option<u64>,
    pub attempt: u32,
    pub phase: TaskPhase,
}

impl TransferState {
    pub fn new() -> Self {
        Self {
            bytes_written: 0,
            total_bytes: None,
            attempt: 0,
            phase: TaskPhase::Pending,
        }
    }

    /// 已写入字节只增不减
    pub fn advance(&mut self, written: u64) {
        self.bytes_written += written;
    }

    pub fn resume_from(&mut self, offset: u64) {
        if offset < self.bytes_written {
            log::warn!("本地文件比已确认的进度短: {} < {}", offset, self.bytes_written);
        }
        self.bytes_written = offset;
    }
}

impl Default for TransferState {
    fn default() -> Self {
        Self::new()
    }
}
