//! 进度/错误回调契约，以及跨 worker 串行化回调的闸门

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use super::queue::TaskId;

/// 一次进度回调的取值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Progress {
    /// 0..=100 的百分比
    Percent(f64),
    /// 服务器没有给出长度，只能报告已写入字节数
    Indeterminate { bytes_written: u64 },
    /// 失败哨兵，界面据此显示失败状态
    Failed,
}

impl Progress {
    pub const FAILED_SENTINEL: f64 = -1.0;

    pub fn from_bytes(bytes_written: u64, total_bytes: Option<u64>) -> Self {
        match total_bytes {
            Some(total) if total > 0 => {
                let percent = bytes_written as f64 / total as f64 * 100.0;
                Progress::Percent(percent.min(100.0))
            }
            _ => Progress::Indeterminate { bytes_written },
        }
    }

    pub fn complete() -> Self {
        Progress::Percent(100.0)
    }

    /// 数值形式；不确定进度没有百分比
    pub fn as_value(&self) -> Option<f64> {
        match self {
            Progress::Percent(p) => Some(*p),
            Progress::Indeterminate { .. } => None,
            Progress::Failed => Some(Self::FAILED_SENTINEL),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Progress::Failed)
    }
}

/// 由外部展示层实现的观察者
pub trait DownloadObserver: Send + Sync {
    fn on_progress(&self, task: TaskId, progress: Progress);
    fn on_error(&self, task: TaskId, message: &str);
}

/// 用一对闭包实现观察者
pub struct FnObserver<P, E> {
    on_progress: P,
    on_error: E,
}

impl<P, E> FnObserver<P, E>
where
    P: Fn(TaskId, Progress) + Send + Sync,
    E: Fn(TaskId, &str) + Send + Sync,
{
    pub fn new(on_progress: P, on_error: E) -> Self {
        Self { on_progress, on_error }
    }
}

impl<P, E> DownloadObserver for FnObserver<P, E>
where
    P: Fn(TaskId, Progress) + Send + Sync,
    E: Fn(TaskId, &str) + Send + Sync,
{
    fn on_progress(&self, task: TaskId, progress: Progress) {
        (self.on_progress)(task, progress)
    }

    fn on_error(&self, task: TaskId, message: &str) {
        (self.on_error)(task, message)
    }
}

/// 所有 worker 共用一把锁，观察者同一时刻只被调用一次
pub struct CallbackGate {
    observer: Arc<dyn DownloadObserver>,
    lock: Mutex<()>,
}

impl CallbackGate {
    pub fn new(observer: Arc<dyn DownloadObserver>) -> Self {
        Self {
            observer,
            lock: Mutex::new(()),
        }
    }

    pub fn progress(&self, task: TaskId, progress: Progress) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.observer.on_progress(task, progress);
    }

    pub fn error(&self, task: TaskId, message: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.observer.on_error(task, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn task_id(index: usize) -> TaskId {
        TaskId { uuid: Uuid::new_v4(), index }
    }

    #[test]
    fn test_progress_from_bytes() {
        assert_eq!(Progress::from_bytes(512, Some(1024)), Progress::Percent(50.0));
        assert_eq!(Progress::from_bytes(0, Some(1024)), Progress::Percent(0.0));
        assert_eq!(Progress::from_bytes(2048, Some(1024)), Progress::Percent(100.0));
    }

    #[test]
    fn test_unknown_total_is_indeterminate() {
        assert_eq!(
            Progress::from_bytes(4096, None),
            Progress::Indeterminate { bytes_written: 4096 }
        );
        // 长度为 0 时不做除法
        assert_eq!(
            Progress::from_bytes(10, Some(0)),
            Progress::Indeterminate { bytes_written: 10 }
        );
        assert_eq!(Progress::from_bytes(10, None).as_value(), None);
    }

    #[test]
    fn test_failed_sentinel() {
        assert_eq!(Progress::Failed.as_value(), Some(-1.0));
        assert!(Progress::Failed.is_failed());
        assert_eq!(Progress::complete().as_value(), Some(100.0));
    }

    #[test]
    fn test_gate_forwards_to_fn_observer() {
        let progress_calls = Arc::new(AtomicUsize::new(0));
        let error_calls = Arc::new(AtomicUsize::new(0));

        let observer = {
            let progress_calls = Arc::clone(&progress_calls);
            let error_calls = Arc::clone(&error_calls);
            FnObserver::new(
                move |_, _| {
                    progress_calls.fetch_add(1, Ordering::SeqCst);
                },
                move |_, message: &str| {
                    assert_eq!(message, "boom");
                    error_calls.fetch_add(1, Ordering::SeqCst);
                },
            )
        };

        let gate = CallbackGate::new(Arc::new(observer));
        gate.progress(task_id(0), Progress::Percent(10.0));
        gate.progress(task_id(0), Progress::complete());
        gate.error(task_id(1), "boom");

        assert_eq!(progress_calls.load(Ordering::SeqCst), 2);
        assert_eq!(error_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gate_serializes_calls() {
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let observer = {
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            FnObserver::new(
                move |_, _| {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(1));
                    inside.fetch_sub(1, Ordering::SeqCst);
                },
                |_, _: &str| {},
            )
        };
        let gate = Arc::new(CallbackGate::new(Arc::new(observer)));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        gate.progress(task_id(i), Progress::Percent(1.0));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
