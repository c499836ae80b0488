//! 完整性校验：对下载完成的文件做流式 SHA-256

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::{DownloadError, DownloadResult};

/// 哈希读取块大小（字节）
pub const HASH_CHUNK_SIZE: usize = 4096;

/// 计算文件的 SHA-256，返回小写十六进制
pub fn hash_file(path: impl AsRef<Path>) -> DownloadResult<String> {
    let file = File::open(path.as_ref())?;
    Ok(hash_reader(BufReader::with_capacity(HASH_CHUNK_SIZE, file))?)
}

/// 对任意字节流做 SHA-256；被信号打断的读取会重试
pub fn hash_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// 与期望的摘要比较，大小写不敏感
pub fn verify_file(path: impl AsRef<Path>, expected: &str) -> DownloadResult<()> {
    let actual = hash_file(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(DownloadError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}
