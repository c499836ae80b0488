use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use crate::core::error::DownloadError;
use crate::core::task::{RetryStrategy, TRANSFER_CHUNK_SIZE};

/// 配置结构体
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 默认下载目录
    pub download_dir: String,
    /// 最大并发下载数，0 表示每个任务一个 worker
    pub max_concurrent_downloads: usize,
    /// 单次请求的连接/读取超时（秒）
    pub timeout: u64,
    /// User-Agent
    pub user_agent: String,
    /// 传输分块大小（字节）
    pub chunk_size: usize,
    /// 最多尝试次数
    pub retry_count: usize,
    /// 退避时间单位（毫秒），第 n 次失败后等待 retry_delay_ms * 2^n
    pub retry_delay_ms: u64,
    /// 单次退避的上限（秒）
    pub retry_max_delay: u64,
    /// 下载完成后计算 SHA-256
    pub verify_after_download: bool,
    /// 日志级别
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: "./downloads".to_string(),
            max_concurrent_downloads: 3,
            timeout: 10,
            user_agent: concat!("batchdown/", env!("CARGO_PKG_VERSION")).to_string(),
            chunk_size: TRANSFER_CHUNK_SIZE,
            retry_count: 3,
            retry_delay_ms: 1000,
            retry_max_delay: 60,
            verify_after_download: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 加载配置文件，不存在或格式错误时写入默认配置
    pub fn load(path: &str) -> Result<Self, DownloadError> {
        if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => Ok(config),
                Err(e) => {
                    log::warn!("配置文件格式错误: {}，将使用默认配置", e);
                    let config = Config::default();
                    config.save_with_tutorial(path)?;
                    Ok(config)
                }
            }
        } else {
            let config = Config::default();
            config.save_with_tutorial(path)?;
            Ok(config)
        }
    }

    /// 保存带教程的配置文件
    pub fn save_with_tutorial(&self, path: &str) -> Result<(), DownloadError> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }
        let config_content = toml::to_string_pretty(self)
            .map_err(|e| DownloadError::ConfigError(format!("无法序列化配置: {}", e)))?;
        let full_content = format!("{}\n{}", Config::generate_tutorial_content(), config_content);
        fs::write(path, full_content)?;
        Ok(())
    }

    fn generate_tutorial_content() -> &'static str {
        r#"# batchdown 配置文件
# ====================
#
# TOML 格式。命令行参数会覆盖这里的设置，优先级：命令行 > 配置文件 > 默认值
#
# 使用示例：
#   batchdown https://example.com/a.zip https://example.com/b.zip
#   batchdown -f urls.txt -d /path/to/downloads
#   batchdown -j 8 --verify -f urls.txt
#
# download_dir             默认下载目录
# max_concurrent_downloads 同时进行的下载数，0 表示不限制（每个任务一个 worker）
# timeout                  单次请求的连接/读取超时（秒），超时按网络错误重试
# chunk_size               每次写盘的块大小（字节），暂停/取消在块边界生效
# retry_count              每个任务最多尝试次数
# retry_delay_ms           退避单位（毫秒），第 n 次失败后等待 retry_delay_ms * 2^n
# retry_max_delay          单次退避上限（秒）
# verify_after_download    下载完成后输出文件的 SHA-256
# log_level                日志级别：error / warn / info / debug / trace
#
# 断点续传说明：续传位置总是取本地文件当前大小，
# 请不要手动修改未下载完的文件，否则续传结果会损坏。
"#
    }

    /// 校验配置合法性
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.timeout == 0 {
            return Err(DownloadError::ConfigError("超时时间必须大于0".to_string()));
        }
        if self.download_dir.is_empty() {
            return Err(DownloadError::ConfigError("下载目录不能为空".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(DownloadError::ConfigError("分块大小必须大于0".to_string()));
        }
        if self.retry_count == 0 {
            return Err(DownloadError::ConfigError("重试次数必须大于0".to_string()));
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(DownloadError::ConfigError(format!("未知的日志级别: {}", self.log_level)));
        }
        Ok(())
    }

    /// 合并命令行参数到配置
    pub fn merge_from_args(&mut self, args: &crate::cli::Args) {
        if let Some(download_dir) = &args.download_dir {
            self.download_dir = download_dir.clone();
        }
        if let Some(max_concurrent) = args.max_concurrent {
            self.max_concurrent_downloads = max_concurrent;
        }
        if args.verify {
            self.verify_after_download = true;
        }
    }

    pub fn retry_strategy(&self) -> RetryStrategy {
        RetryStrategy {
            max_attempts: self.retry_count as u32,
            base_delay: Duration::from_millis(self.retry_delay_ms),
            max_delay: Duration::from_secs(self.retry_max_delay),
            ..RetryStrategy::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    /// 获取配置摘要信息
    pub fn get_summary(&self) -> String {
        format!(
            "配置摘要:\n\
            - 下载目录: {}\n\
            - 并发数: {}\n\
            - 超时时间: {} 秒\n\
            - 分块大小: {} 字节\n\
            - 重试次数: {}\n\
            - 退避单位: {} 毫秒\n\
            - 完成后校验: {}",
            self.download_dir,
            if self.max_concurrent_downloads == 0 { "不限制".to_string() } else { self.max_concurrent_downloads.to_string() },
            self.timeout,
            self.chunk_size,
            self.retry_count,
            self.retry_delay_ms,
            if self.verify_after_download { "启用" } else { "禁用" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.retry_count, 3);
        assert!(config.user_agent.starts_with("batchdown/"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.timeout = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.chunk_size = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.retry_count = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        // 0 表示不限制并发
        config = Config::default();
        config.max_concurrent_downloads = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/batchdown.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.max_concurrent_downloads = 7;
        config.retry_delay_ms = 250;
        config.save_with_tutorial(path).expect("保存带教程的配置失败");

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("batchdown 配置文件"));

        let loaded = Config::load(path).expect("加载配置失败");
        assert_eq!(loaded.max_concurrent_downloads, 7);
        assert_eq!(loaded.retry_delay_ms, 250);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = toml::from_str("timeout = 30\n").unwrap();
        assert_eq!(config.timeout, 30);
        assert_eq!(config.chunk_size, 1024);
    }

    #[test]
    fn test_malformed_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "timeout = \"not a number").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.timeout, 10);
    }

    #[test]
    fn test_retry_strategy_from_config() {
        let config = Config::default();
        let strategy = config.retry_strategy();
        assert_eq!(strategy.max_attempts, 3);
        assert_eq!(strategy.get_delay(1), Duration::from_secs(2));
        assert_eq!(strategy.total_backoff(), Duration::from_secs(14));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_summary() {
        let summary = Config::default().get_summary();
        assert!(summary.contains("配置摘要"));
        assert!(summary.contains("下载目录"));
        assert!(summary.contains("重试次数"));
    }
}
