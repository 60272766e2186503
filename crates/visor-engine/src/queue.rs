//! Bounded command queue between the receive and dispatch steps.

use std::collections::VecDeque;

use visor_protocol::Command;

/// Default queue capacity, matching the device configuration.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// An ordered, bounded FIFO of parsed commands.
///
/// The receive step enqueues, the dispatch step drains the whole queue
/// every cycle. On overflow the oldest command is evicted so the newest
/// host intent is never the one lost.
#[derive(Debug)]
pub struct CommandQueue {
    items: VecDeque<Command>,
    capacity: usize,
}

impl CommandQueue {
    /// Create a queue with the given capacity. A zero capacity is
    /// clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        CommandQueue {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueue a command. Returns the evicted oldest command if the
    /// queue was full.
    pub fn push(&mut self, command: Command) -> Option<Command> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(command);
        evicted
    }

    /// Dequeue the oldest command.
    pub fn pop(&mut self) -> Option<Command> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
