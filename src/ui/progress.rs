use std::sync::Mutex;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::core::observer::{DownloadObserver, Progress};
use crate::core::queue::TaskId;
use super::format_size;

// 结构体：ProgressManager
// 每个任务一条进度条，实现 DownloadObserver 接收会话回调
pub struct ProgressManager {
    multi: MultiProgress,
    progress_bars: Mutex<Vec<ProgressBar>>,
}

impl ProgressManager {
    /// 按提交顺序为每个任务创建进度条，`labels` 一般是文件名
    pub fn new(labels: &[String]) -> Self {
        Self::with_target(labels, ProgressDrawTarget::stderr())
    }

    /// 不输出任何内容，用于测试
    pub fn hidden(labels: &[String]) -> Self {
        Self::with_target(labels, ProgressDrawTarget::hidden())
    }

    fn with_target(labels: &[String], target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let style = ProgressStyle::with_template("{prefix:20!} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let bars = labels
            .iter()
            .map(|label| {
                let pb = multi.add(ProgressBar::new(100));
                pb.set_style(style.clone());
                pb.set_prefix(label.clone());
                pb.set_message("等待中");
                pb
            })
            .collect();

        Self {
            multi,
            progress_bars: Mutex::new(bars),
        }
    }

    /// 在进度条上方打印一行日志
    pub fn println(&self, message: &str) {
        let _ = self.multi.println(message);
    }

    pub fn position(&self, index: usize) -> Option<u64> {
        let bars = self.progress_bars.lock().ok()?;
        bars.get(index).map(|pb| pb.position())
    }

    pub fn message(&self, index: usize) -> Option<String> {
        let bars = self.progress_bars.lock().ok()?;
        bars.get(index).map(|pb| pb.message())
    }
}

impl DownloadObserver for ProgressManager {
    fn on_progress(&self, task: TaskId, progress: Progress) {
        let Ok(bars) = self.progress_bars.lock() else { return };
        let Some(pb) = bars.get(task.index) else { return };

        match progress {
            Progress::Percent(percent) if percent >= 100.0 => {
                pb.set_position(100);
                pb.finish_with_message("完成");
            }
            Progress::Percent(percent) => {
                pb.set_position(percent as u64);
                pb.set_message(format!("{:.2}%", percent));
            }
            Progress::Indeterminate { bytes_written } => {
                pb.set_message(format!("{} (大小未知)", format_size(bytes_written)));
            }
            Progress::Failed => {
                pb.abandon_with_message("失败");
            }
        }
    }

    fn on_error(&self, task: TaskId, message: &str) {
        if let Ok(bars) = self.progress_bars.lock() {
            if let Some(pb) = bars.get(task.index) {
                pb.abandon_with_message(message.to_string());
            }
        }
        self.println(&format!("文件 {} 出错: {}", task.index + 1, message));
    }
}
