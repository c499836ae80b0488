use std::io;
use std::path::Path;

use bytes::{Bytes, BytesMut};
use percent_encoding::percent_decode_str;
use url::Url;

/// 把任意大小的网络数据切成固定大小的块
#[derive(Debug)]
pub struct ChunkSplitter {
    buffer: BytesMut,
    chunk_size: usize,
}

impl ChunkSplitter {
    pub fn new(chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            buffer: BytesMut::with_capacity(chunk_size * 2),
            chunk_size,
        }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// 取出一个完整的块，不足一块时返回 None
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        if self.buffer.len() >= self.chunk_size {
            Some(self.buffer.split_to(self.chunk_size).freeze())
        } else {
            None
        }
    }

    /// 流结束后取出剩余的尾块
    pub fn finish(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }
}

/// 从 URL 最后一段路径推断文件名
pub fn file_name_from_url(locator: &str, index: usize) -> String {
    Url::parse(locator)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|segment| percent_decode_str(&segment).decode_utf8_lossy().to_string())
        .map(|name| name.replace('/', "_").replace('\\', "_"))
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| format!("download_{}", index))
}

/// 已存在的部分文件大小，即续传偏移量
pub async fn existing_len(path: &Path) -> io::Result<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}
