//! Priority ordered execution queue.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use super::QueueItem;
use crate::domain::{TaskArgs, TaskDefinition, TaskName};

/// Heap entry. Higher priority first, then lower sequence (FIFO).
#[derive(Debug)]
struct Pending(QueueItem);

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.priority, Reverse(self.0.seq)).cmp(&(other.0.priority, Reverse(other.0.seq)))
    }
}

/// Ordered multiset of pending invocations.
///
/// Owned by exactly one `BatchScheduler`; it has no internal locking.
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    heap: BinaryHeap<Pending>,
    next_seq: u64,

    /// Pending items per task name.
    per_task: HashMap<TaskName, usize>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an invocation of `definition`, snapshotting its priority.
    /// Returns the sequence number assigned to the new item.
    pub fn enqueue(&mut self, definition: &TaskDefinition, args: TaskArgs) -> u64 {
        self.push(QueueItem {
            task: definition.name().clone(),
            args,
            priority: definition.priority(),
            deferrals: 0,
            seq: 0,
        })
    }

    /// Put an item back at the end of its priority class.
    pub fn requeue(&mut self, item: QueueItem) -> u64 {
        self.push(item)
    }

    fn push(&mut self, mut item: QueueItem) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        item.seq = seq;
        *self.per_task.entry(item.task.clone()).or_default() += 1;
        self.heap.push(Pending(item));
        seq
    }

    /// Remove and return up to `batch_size` items, highest priority first,
    /// FIFO among equal priorities. Empty queue yields an empty vec.
    pub fn drain_batch(&mut self, batch_size: usize) -> Vec<QueueItem> {
        let take = batch_size.min(self.heap.len());
        let mut batch = Vec::with_capacity(take);
        while batch.len() < take {
            match self.heap.pop() {
                Some(Pending(item)) => {
                    self.forget(&item.task);
                    batch.push(item);
                }
                None => break,
            }
        }
        batch
    }

    fn forget(&mut self, task: &TaskName) {
        if let Some(count) = self.per_task.get_mut(task) {
            *count -= 1;
            if *count == 0 {
                self.per_task.remove(task);
            }
        }
    }

    /// At least one invocation of `task` is waiting in the queue.
    pub fn contains_task(&self, task: &TaskName) -> bool {
        self.per_task.contains_key(task)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
