mod progress;

use std::fmt;
pub use progress::ProgressManager;

use crate::core::session::SessionReport;
use crate::core::task::TaskPhase;

pub fn print_success(message: &str) {
    println!("✓ {}", message);
}

pub fn print_error(message: &str) {
    println!("✗ {}", message);
}

pub struct DownloadSummary {
    pub total_files: usize,
    pub total_size: u64,
    pub elapsed_time: std::time::Duration,
    pub success_count: usize,
    pub failed_count: usize,
    pub cancelled_count: usize,
}

impl DownloadSummary {
    pub fn from_report(report: &SessionReport, elapsed_time: std::time::Duration) -> Self {
        Self {
            total_files: report.outcomes.len(),
            total_size: report.total_bytes(),
            elapsed_time,
            success_count: report.count(TaskPhase::Succeeded),
            failed_count: report.count(TaskPhase::Failed),
            cancelled_count: report.count(TaskPhase::Cancelled),
        }
    }
}

impl fmt::Display for DownloadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n下载摘要:")?;
        writeln!(f, "总文件数: {}", self.total_files)?;
        writeln!(f, "总大小: {}", format_size(self.total_size))?;
        writeln!(f, "耗时: {:.2}秒", self.elapsed_time.as_secs_f64())?;
        writeln!(f, "成功: {}", self.success_count)?;
        writeln!(f, "失败: {}", self.failed_count)?;
        writeln!(f, "取消: {}", self.cancelled_count)?;
        Ok(())
    }
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}
