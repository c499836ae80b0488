use batchdown::cli;
use batchdown::core::task::util::file_name_from_url;
use batchdown::core::{hash_file, DownloadSession, SessionHandle, SessionState, TaskPhase};
use batchdown::ui::{self, DownloadSummary, ProgressManager};
use batchdown::utils::logger::init_logger;
use batchdown::utils::validator::validate_output_dir;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal,
};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const KEYBOARD_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("参数解析失败: {}", e);
            std::process::exit(2);
        }
    };
    init_logger(config.log_level_filter(), args.log_file.as_deref())?;

    let urls = match args.get_urls() {
        Ok(urls) => urls,
        Err(e) => {
            log::error!("获取URL列表失败: {}", e);
            eprintln!("获取URL列表失败: {}", e);
            std::process::exit(2);
        }
    };
    log::info!("解析到的URLs: {:?}", urls);
    log::info!("{}", config.get_summary());

    validate_output_dir(&config.download_dir)?;
    std::fs::create_dir_all(&config.download_dir)?;

    let labels: Vec<String> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| file_name_from_url(url, i))
        .collect();
    let progress = Arc::new(ProgressManager::new(&labels));
    let session = DownloadSession::new(config.clone(), progress.clone())?;
    let handle = session.handle();

    progress.println("开始下载... (按 'p' 暂停, 'r' 恢复, 'c' 取消)");

    // Ctrl-C 等同于取消，已写入的部分保留给下次续传
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.stop();
            }
        });
    }

    let done = Arc::new(AtomicBool::new(false));
    let keyboard = if std::io::stdin().is_terminal() {
        let handle = handle.clone();
        let done = Arc::clone(&done);
        let progress = Arc::clone(&progress);
        Some(tokio::task::spawn_blocking(move || run_keyboard_loop(&handle, &done, &progress)))
    } else {
        None
    };

    let started = Instant::now();
    let report = session.run_urls(urls, &config.download_dir).await?;

    done.store(true, Ordering::SeqCst);
    if let Some(keyboard) = keyboard {
        if let Ok(Err(e)) = keyboard.await {
            log::warn!("键盘监听异常: {}", e);
        }
    }

    if config.verify_after_download {
        for outcome in report.outcomes.iter().filter(|o| o.phase == TaskPhase::Succeeded) {
            match hash_file(&outcome.destination) {
                Ok(digest) => ui::print_success(&format!("{}  {}", digest, outcome.destination.display())),
                Err(e) => ui::print_error(&format!("无法校验 {}: {}", outcome.destination.display(), e)),
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for outcome in &report.outcomes {
            match (&outcome.phase, &outcome.error) {
                (TaskPhase::Succeeded, _) => ui::print_success(&outcome.destination.display().to_string()),
                (_, Some(error)) => ui::print_error(&format!("{}: {}", outcome.locator, error)),
                (phase, None) => ui::print_error(&format!("{}: {:?}", outcome.locator, phase)),
            }
        }
        println!("{}", DownloadSummary::from_report(&report, started.elapsed()));
    }

    if report.state == SessionState::PartiallyFailed {
        std::process::exit(1);
    }
    Ok(())
}

/// 监听键盘：p 暂停，r 恢复，c / q 取消（raw 模式下 Ctrl-C 也落在 c 上）
fn run_keyboard_loop(handle: &SessionHandle, done: &AtomicBool, progress: &ProgressManager) -> std::io::Result<()> {
    terminal::enable_raw_mode()?;
    let result = poll_keys(handle, done, progress);
    terminal::disable_raw_mode()?;
    result
}

fn poll_keys(handle: &SessionHandle, done: &AtomicBool, progress: &ProgressManager) -> std::io::Result<()> {
    while !done.load(Ordering::SeqCst) {
        if !event::poll(KEYBOARD_POLL_INTERVAL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else { continue };
        match key.code {
            KeyCode::Char('p') | KeyCode::Char('P') => {
                handle.pause();
                progress.println("下载已暂停");
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                handle.resume();
                progress.println("下载已恢复");
            }
            KeyCode::Char('c') | KeyCode::Char('C') | KeyCode::Char('q') | KeyCode::Char('Q') => {
                handle.stop();
                progress.println("下载已取消");
            }
            _ => {}
        }
    }
    Ok(())
}
