//! 任务队列：按调用方给出的优先级排序，同优先级保持提交顺序

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::util::file_name_from_url;

/// 任务标识：提交时分配的稳定 UUID 加上提交序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub uuid: Uuid,
    pub index: usize,
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}({})", self.index, self.uuid)
    }
}

/// 下载任务，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub locator: String,
    pub priority: i64,
    pub destination: PathBuf,
}

#[derive(Debug)]
struct QueueEntry(Task);

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // BinaryHeap 是大顶堆，这里反转比较，让 (priority, index) 最小的先出队
    fn cmp(&self, other: &Self) -> Ordering {
        (other.0.priority, other.0.id.index).cmp(&(self.0.priority, self.0.id.index))
    }
}

/// 优先级任务队列
#[derive(Debug)]
pub struct TaskQueue {
    dest_dir: PathBuf,
    heap: BinaryHeap<QueueEntry>,
    submitted: usize,
}

impl TaskQueue {
    pub fn new(dest_dir: impl AsRef<Path>) -> Self {
        Self {
            dest_dir: dest_dir.as_ref().to_path_buf(),
            heap: BinaryHeap::new(),
            submitted: 0,
        }
    }

    /// 提交一批 (优先级, URL)，返回新任务的标识
    pub fn submit<I, S>(&mut self, entries: I) -> Vec<TaskId>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let mut ids = Vec::new();
        for (priority, locator) in entries {
            let locator = locator.into();
            let index = self.submitted;
            self.submitted += 1;

            let id = TaskId { uuid: Uuid::new_v4(), index };
            let destination = self.dest_dir.join(file_name_from_url(&locator, index));
            self.heap.push(QueueEntry(Task { id, locator, priority, destination }));
            ids.push(id);
        }
        ids
    }

    /// 取出下一个优先级最高的任务
    pub fn pop(&mut self) -> Option<Task> {
        self.heap.pop().map(|entry| entry.0)
    }

    /// 按出队顺序取出全部任务
    pub fn drain(&mut self) -> Vec<Task> {
        std::iter::from_fn(|| self.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_orders_by_priority() {
        let mut queue = TaskQueue::new("/tmp/downloads");
        queue.submit(vec![
            (1, "https://example.com/b.bin"),
            (0, "https://example.com/a.bin"),
            (2, "https://example.com/c.bin"),
        ]);

        let locators: Vec<_> = queue.drain().into_iter().map(|t| t.locator).collect();
        assert_eq!(locators, vec![
            "https://example.com/a.bin",
            "https://example.com/b.bin",
            "https://example.com/c.bin",
        ]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_equal_priority_keeps_submission_order() {
        let mut queue = TaskQueue::new(".");
        queue.submit(vec![
            (5, "https://example.com/1"),
            (1, "https://example.com/2"),
            (5, "https://example.com/3"),
            (1, "https://example.com/4"),
        ]);
        queue.submit(vec![(5, "https://example.com/5")]);

        let indices: Vec<_> = queue.drain().into_iter().map(|t| t.id.index).collect();
        assert_eq!(indices, vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_empty_submission() {
        let mut queue = TaskQueue::new(".");
        let ids = queue.submit(Vec::<(i64, String)>::new());
        assert!(ids.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn test_destination_joins_dest_dir() {
        let mut queue = TaskQueue::new("/data/out");
        let ids = queue.submit(vec![(0, "https://example.com/files/archive.zip?x=1")]);
        let task = queue.pop().unwrap();
        assert_eq!(task.id, ids[0]);
        assert_eq!(task.destination, PathBuf::from("/data/out/archive.zip"));
    }

    #[test]
    fn test_task_ids_are_unique() {
        let mut queue = TaskQueue::new(".");
        let ids = queue.submit(vec![(0, "https://a/x"), (0, "https://a/x")]);
        assert_ne!(ids[0].uuid, ids[1].uuid);
        assert_eq!(ids[0].index, 0);
        assert_eq!(ids[1].index, 1);
    }
}
