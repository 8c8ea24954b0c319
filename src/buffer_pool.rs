//! Buffer pool: a bounded, thread-safe double queue of line buffers used to
//! hand input lines from the reader to workers with backpressure.
//!
//! Two FIFO queues, `free` and `active`, each guarded by its own
//! `parking_lot::Mutex` and `Condvar`. `get_free`/`get_active` block until
//! non-empty; `put_free`/`put_active` push and wake one waiter. Capacity is
//! fixed at `2 * worker_count` line buffers, which is also the backpressure
//! bound: the reader can never have more than that many lines in flight.
//!
//! End-of-input is signaled by a `Slot::Sentinel` pushed into `active` once
//! per worker, a plain enum variant standing in for a null-payload buffer.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

pub enum Slot {
    Line(String),
    Sentinel,
}

pub struct BufferPool {
    free: Mutex<VecDeque<String>>,
    free_cv: Condvar,
    active: Mutex<VecDeque<Slot>>,
    active_cv: Condvar,
}

impl BufferPool {
    /// Build a pool pre-stocked with `2 * worker_count` empty line buffers.
    pub fn new(worker_count: usize) -> Self {
        let capacity = 2 * worker_count.max(1);
        let mut free = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            free.push_back(String::new());
        }
        Self {
            free: Mutex::new(free),
            free_cv: Condvar::new(),
            active: Mutex::new(VecDeque::new()),
            active_cv: Condvar::new(),
        }
    }

    pub fn get_free(&self) -> String {
        let mut guard = self.free.lock();
        loop {
            if let Some(buf) = guard.pop_back() {
                return buf;
            }
            self.free_cv.wait(&mut guard);
        }
    }

    pub fn put_free(&self, mut buf: String) {
        buf.clear();
        let mut guard = self.free.lock();
        guard.push_front(buf);
        self.free_cv.notify_one();
    }

    pub fn get_active(&self) -> Slot {
        let mut guard = self.active.lock();
        loop {
            if let Some(slot) = guard.pop_back() {
                return slot;
            }
            self.active_cv.wait(&mut guard);
        }
    }

    pub fn put_active(&self, slot: Slot) {
        let mut guard = self.active.lock();
        guard.push_front(slot);
        self.active_cv.notify_one();
    }
}
