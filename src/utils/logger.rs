use chrono::Local; // 用于获取本地时间
use log::LevelFilter; // 用于设置日志级别
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// 日志行格式：`2024-01-01 12:00:00 [INFO] - message`
fn format_line(level: log::Level, message: &std::fmt::Arguments<'_>) -> String {
    format!("{} [{}] - {}", Local::now().format("%Y-%m-%d %H:%M:%S"), level, message)
}

/// 初始化全局日志，`file_path` 为空时写到 stderr
///
/// `RUST_LOG` 环境变量优先于传入的级别。重复初始化会被忽略。
pub fn init_logger(level: LevelFilter, file_path: Option<&str>) -> Result<(), std::io::Error> {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_env("RUST_LOG")
        .format(|buf, record| writeln!(buf, "{}", format_line(record.level(), record.args())));

    if let Some(path) = file_path {
        // 确保日志目录存在
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    if builder.try_init().is_err() {
        log::debug!("日志已经初始化，忽略重复初始化");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        let line = format_line(log::Level::Warn, &format_args!("重试 {}", 2));
        assert!(line.ends_with("[WARN] - 重试 2"));
        // 时间戳 "YYYY-mm-dd HH:MM:SS"
        assert_eq!(line.find(" [WARN]"), Some(19));
    }

    #[test]
    fn test_init_logger_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/app.log");
        init_logger(LevelFilter::Info, Some(path.to_str().unwrap())).unwrap();
        assert!(path.exists());
    }
}
