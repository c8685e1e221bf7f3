//! Aggregation queue connecting capture sources to the timeline consumer.
//!
//! A single bounded multi-producer/single-consumer channel. `publish` is
//! synchronous and never blocks: capture threads feeding real-time data
//! must not stall on timeline bookkeeping. When the queue is full the
//! oldest buffered event is dropped and counted; the consumer drains in
//! delivery order, which is not causal order — the timeline re-sorts by
//! timestamp.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::debug;

use crate::event::Event;

pub struct EventQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    capacity: usize,
}

struct QueueState {
    buf: VecDeque<Event>,
    closed: bool,
    dropped: u64,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                buf: VecDeque::with_capacity(capacity),
                closed: false,
                dropped: 0,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Publish an event. Never blocks; on overflow the oldest buffered
    /// event is dropped and counted. Returns `false` once the queue is
    /// closed (events published during teardown races are discarded).
    pub fn publish(&self, event: Event) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return false;
            }
            if state.buf.len() == self.capacity {
                state.buf.pop_front();
                state.dropped += 1;
                debug!(dropped = state.dropped, "event queue full, dropping oldest event");
            }
            state.buf.push_back(event);
        }
        self.notify.notify_one();
        true
    }

    /// Receive the next event in delivery order. Returns `None` once the
    /// queue has been closed and fully drained.
    pub async fn recv(&self) -> Option<Event> {
        loop {
            {
                let mut state = self.state.lock().unwrap();
                if let Some(event) = state.buf.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Non-blocking receive, used for the final drain during shutdown.
    pub fn try_recv(&self) -> Option<Event> {
        self.state.lock().unwrap().buf.pop_front()
    }

    /// Close the queue. Subsequent publishes are no-ops; the consumer
    /// drains whatever is buffered and then sees the end of stream.
    pub fn close(&self) {
        self.state.lock().unwrap().closed = true;
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events lost to overflow so far.
    pub fn dropped(&self) -> u64 {
        self.state.lock().unwrap().dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(ts: u64, content: &str) -> Event {
        Event::clipboard(ts, content).unwrap()
    }

    #[tokio::test]
    async fn delivers_in_publish_order() {
        let queue = EventQueue::new(8);
        assert!(queue.publish(clip(3, "a")));
        assert!(queue.publish(clip(1, "b")));
        assert!(queue.publish(clip(2, "c")));

        assert_eq!(queue.recv().await.unwrap().timestamp_ms(), 3);
        assert_eq!(queue.recv().await.unwrap().timestamp_ms(), 1);
        assert_eq!(queue.recv().await.unwrap().timestamp_ms(), 2);
    }

    #[tokio::test]
    async fn overflow_drops_oldest() {
        let queue = EventQueue::new(2);
        queue.publish(clip(1, "a"));
        queue.publish(clip(2, "b"));
        queue.publish(clip(3, "c"));

        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.recv().await.unwrap().timestamp_ms(), 2);
        assert_eq!(queue.recv().await.unwrap().timestamp_ms(), 3);
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let queue = EventQueue::new(8);
        queue.publish(clip(1, "a"));
        queue.close();

        assert!(!queue.publish(clip(2, "b")), "publish after close must be rejected");
        assert_eq!(queue.recv().await.unwrap().timestamp_ms(), 1);
        assert!(queue.recv().await.is_none());
    }
}
