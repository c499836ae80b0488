//! CLI: 命令行接口和参数解析模块
//!
//! ## 主要功能
//!
//! - 命令行参数解析和验证
//! - 配置文件路径管理
//! - URL 列表处理（命令行参数和文件）
//!
//! ## 支持的命令
//!
//! - 批量下载：`batchdown <url>... -d <dir>`
//! - 从文件读取：`batchdown -f urls.txt`
//! - 编辑配置：`batchdown -e`
//! - 指定并发：`batchdown -j 8 <url>...`
//!
//! 下载过程中按 `p` 暂停、`r` 恢复、`c` 取消。

use clap::Parser;
use std::env;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::core::error::DownloadError;
use crate::utils::validator::validate_urls;

/// 获取平台默认配置文件路径
pub fn default_config_path() -> String {
    #[cfg(target_os = "windows")]
    {
        let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        format!("{}/batchdown/batchdown.toml", appdata)
    }
    #[cfg(target_os = "macos")]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/Library/Application Support/batchdown/batchdown.toml", home)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{}/.config/batchdown/batchdown.toml", home)
    }
}

/// 打开配置文件编辑器
pub fn open_config_in_editor(config_path: &str) {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("notepad").arg(config_path).status().ok();
    }
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg("-e").arg(config_path).status().ok();
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let editor = env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());
        let _ = std::process::Command::new(editor).arg(config_path).status();
    }
}

/// batchdown 命令行参数
///
/// 示例用法：
///   batchdown https://example.com/a.zip https://example.com/b.zip
///   batchdown -f urls.txt -d ./downloads
///   batchdown -e  # 编辑配置文件
#[derive(Parser, Debug, Clone)]
#[command(
    name = "batchdown",
    author = "panzhifu",
    version = env!("CARGO_PKG_VERSION"),
    about = "可断点续传的并发批量下载管理器",
    long_about = "按顺序下载多个文件，支持断点续传、失败重试、暂停/恢复/取消和完整性校验。\n\n示例：\n  batchdown https://example.com/a.zip https://example.com/b.zip\n  batchdown -f urls.txt -d ./downloads -j 4\n  batchdown -e\n"
)]
pub struct Args {
    /// 要下载的URL列表，顺序即优先级
    #[arg(required = false, help = "要下载的URL列表，越靠前优先级越高。")]
    pub urls: Vec<String>,

    /// 包含URL列表的文件路径
    #[arg(short, long, help = "包含URL列表的文件路径，每行一个URL，# 开头为注释。")]
    pub file: Option<String>,

    /// 配置文件路径
    #[arg(short = 'c', long, default_value_t = default_config_path(), help = "配置文件路径，默认为平台推荐路径。")]
    pub config: String,

    /// 编辑配置文件
    #[arg(short = 'e', long = "edit", help = "用系统默认编辑器打开配置文件并退出。")]
    pub edit_config: bool,

    /// 下载目录
    #[arg(long, short = 'd', help = "指定下载目录，覆盖配置文件中的设置。")]
    pub download_dir: Option<String>,

    /// 最大并发下载数
    #[arg(long = "max-concurrent", short = 'j', help = "同时进行的下载数，0 表示不限制。")]
    pub max_concurrent: Option<usize>,

    /// 完成后输出 SHA-256
    #[arg(long, help = "下载完成后计算并输出每个文件的 SHA-256。")]
    pub verify: bool,

    /// 以 JSON 输出结果
    #[arg(long, help = "以 JSON 格式输出下载结果。")]
    pub json: bool,

    /// 日志文件
    #[arg(long = "log-file", help = "把日志写入指定文件而不是标准错误。")]
    pub log_file: Option<String>,
}

impl Args {
    /// 解析命令行参数并加载合并后的配置
    pub fn parse_args() -> Result<(Self, Config), DownloadError> {
        let args = Args::parse();

        if args.edit_config {
            // 先确保配置文件存在
            Config::load(&args.config)?;
            open_config_in_editor(&args.config);
            std::process::exit(0);
        }

        let config = args.load_config()?;
        Ok((args, config))
    }

    /// 加载或创建配置文件，合并命令行参数并校验
    pub fn load_config(&self) -> Result<Config, DownloadError> {
        let mut config = Config::load(&self.config)?;
        config.merge_from_args(self);
        config.validate()?;
        Ok(config)
    }

    /// 汇总命令行和文件中的 URL，保持顺序
    pub fn get_urls(&self) -> Result<Vec<String>, DownloadError> {
        let mut urls = Vec::new();
        urls.extend_from_slice(&self.urls);

        if let Some(file_path) = &self.file {
            if !Path::new(file_path).exists() {
                return Err(DownloadError::ConfigError(format!("URL文件不存在: {}", file_path)));
            }
            let content = fs::read_to_string(file_path)?;

            // 按行读取URL，忽略空行和注释
            for line in content.lines() {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    urls.push(line.to_string());
                }
            }
        }

        validate_urls(&urls).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
        Ok(urls)
    }
}
