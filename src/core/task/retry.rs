use std::time::Duration;

use crate::core::error::DownloadError;

/// 重试策略：第 n 次失败后等待 base_delay * 2^n
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryStrategy {
    /// `attempt` 是已经失败的次数
    pub fn should_retry(&self, error: &DownloadError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    pub fn get_delay(&self, attempt: u32) -> Duration {
        let delay_secs = self.base_delay.as_secs_f64() *
            self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(delay_secs).min(self.max_delay)
    }

    /// 用尽全部尝试时累计的退避时间
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_attempts).map(|attempt| self.get_delay(attempt)).sum()
    }
}

/// 单个任务的重试上下文
#[derive(Debug)]
pub struct RetryContext {
    pub strategy: RetryStrategy,
    pub retry_history: Vec<(String, Duration)>,
    pub total_retry_time: Duration,
}

impl RetryContext {
    pub fn new(strategy: RetryStrategy) -> Self {
        Self {
            strategy,
            retry_history: Vec::new(),
            total_retry_time: Duration::ZERO,
        }
    }

    /// 记录一次失败，返回应当等待的时长
    pub fn record_failure(&mut self, error: &DownloadError, attempt: u32) -> Duration {
        let delay = self.strategy.get_delay(attempt);
        self.retry_history.push((error.to_string(), delay));
        self.total_retry_time += delay;
        delay
    }

    pub fn should_retry(&self, error: &DownloadError, attempt: u32) -> bool {
        self.strategy.should_retry(error, attempt)
    }
}
