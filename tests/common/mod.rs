#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, OnceLock};

use batchdown::core::{DownloadObserver, Progress, SessionHandle, TaskId};
use batchdown::Config;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Progress(usize, Progress),
    Error(usize, String),
}

/// 记录全部回调；可选地在第一次进度回调时暂停或取消会话
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<Event>>,
    pub handle: OnceLock<SessionHandle>,
    pub pause_on_first_progress: bool,
    pub stop_on_first_progress: bool,
}

impl Recorder {
    pub fn pausing() -> Self {
        Self { pause_on_first_progress: true, ..Self::default() }
    }

    pub fn stopping() -> Self {
        Self { stop_on_first_progress: true, ..Self::default() }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress_of(&self, index: usize) -> Vec<Progress> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Progress(i, p) if i == index => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn errors_of(&self, index: usize) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Error(i, m) if i == index => Some(m),
                _ => None,
            })
            .collect()
    }
}

impl DownloadObserver for Recorder {
    fn on_progress(&self, task: TaskId, progress: Progress) {
        let first = {
            let mut events = self.events.lock().unwrap();
            events.push(Event::Progress(task.index, progress));
            events.len() == 1
        };
        if first {
            if let Some(handle) = self.handle.get() {
                if self.pause_on_first_progress {
                    handle.pause();
                }
                if self.stop_on_first_progress {
                    handle.stop();
                }
            }
        }
    }

    fn on_error(&self, task: TaskId, message: &str) {
        self.events.lock().unwrap().push(Event::Error(task.index, message.to_string()));
    }
}

pub fn test_config() -> Config {
    Config {
        retry_delay_ms: 10,
        ..Config::default()
    }
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// 百分比序列（不含失败哨兵）单调不减
pub fn assert_monotonic(progress: &[Progress]) {
    let values: Vec<f64> = progress
        .iter()
        .filter(|p| !p.is_failed())
        .filter_map(|p| p.as_value())
        .collect();
    for pair in values.windows(2) {
        assert!(pair[0] <= pair[1], "进度倒退: {:?}", values);
    }
}

/// 手写响应的 HTTP 服务器，用于 wiremock 表达不了的场景（缺少 Content-Length、响应体中途断开）
pub struct RawServer {
    pub addr: SocketAddr,
    /// 每个请求 Range 头里的起始偏移
    pub ranges: Arc<Mutex<Vec<u64>>>,
}

impl RawServer {
    /// `respond(请求序号, Range 起点)` 返回完整的原始响应字节，写完后关闭连接
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(usize, u64) -> Vec<u8> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ranges = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&ranges);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let head = read_request_head(&mut socket).await;
                let start = range_start(&head);
                let index = {
                    let mut seen = seen.lock().unwrap();
                    seen.push(start);
                    seen.len() - 1
                };
                let _ = socket.write_all(&respond(index, start)).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { addr, ranges }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ranges(&self) -> Vec<u64> {
        self.ranges.lock().unwrap().clone()
    }
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

fn range_start(head: &str) -> u64 {
    head.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if !name.trim().eq_ignore_ascii_case("range") {
                return None;
            }
            let spec = value.trim().strip_prefix("bytes=")?;
            spec.split('-').next()?.parse().ok()
        })
        .unwrap_or(0)
}

/// 拼出原始 HTTP/1.1 响应；`content_length` 为 None 时靠关闭连接结束响应体
pub fn raw_response(status: &str, content_length: Option<u64>, body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {}\r\nConnection: close\r\n", status);
    if let Some(len) = content_length {
        head.push_str(&format!("Content-Length: {}\r\n", len));
    }
    head.push_str("\r\n");

    let mut response = head.into_bytes();
    response.extend_from_slice(body);
    response
}
