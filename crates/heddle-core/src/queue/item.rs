use crate::domain::{TaskArgs, TaskName};

/// A pending invocation request.
///
/// `priority` is copied from the task definition at enqueue time, so later
/// changes to the definition never reorder items already in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub task: TaskName,
    pub args: TaskArgs,
    pub priority: i32,

    /// How many times this item has been put back because its
    /// dependencies were not yet satisfied.
    pub deferrals: u32,

    /// Insertion sequence; breaks priority ties FIFO.
    pub(crate) seq: u64,
}

impl QueueItem {
    /// Position assigned by the queue when the item was (re)inserted.
    pub fn sequence(&self) -> u64 {
        self.seq
    }
}
