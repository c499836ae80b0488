use thiserror::Error;
use std::io;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("网络错误: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("服务器错误: {0}")]
    ServerError(String),

    #[error("响应体不完整: 预期 {expected} 字节, 实际 {actual} 字节")]
    IncompleteBody {
        expected: u64,
        actual: u64,
    },

    #[error("文件大小不匹配: 远端 {expected} 字节, 本地 {actual} 字节")]
    SizeMismatch {
        expected: u64,
        actual: u64,
    },

    #[error("校验和不匹配: 预期 {expected}, 实际 {actual}")]
    ChecksumMismatch {
        expected: String,
        actual: String,
    },

    #[error("下载被取消")]
    Cancelled,

    #[error("重试 {attempts} 次后仍然失败: {last_error}")]
    MaxRetriesExceeded {
        attempts: u32,
        last_error: String,
    },

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("会话已经运行过，不能重复启动")]
    SessionAlreadyStarted,
}

impl DownloadError {
    /// 传输层的临时错误，可以退避后重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DownloadError::NetworkError(_) |
            DownloadError::ServerError(_) |
            DownloadError::IncompleteBody { .. }
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DownloadError::IoError(_) |
            DownloadError::InvalidUrl(_) |
            DownloadError::SizeMismatch { .. } |
            DownloadError::ChecksumMismatch { .. } |
            DownloadError::ConfigError(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled)
    }
}

impl From<url::ParseError> for DownloadError {
    fn from(error: url::ParseError) -> Self {
        DownloadError::InvalidUrl(error.to_string())
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;
