//! One-shot timers expressed as deadlines.
//!
//! The queue never sleeps or spawns anything; the owner polls it with
//! [`TimerQueue::pop_due`] from its event loop and sleeps until
//! [`TimerQueue::next_deadline`] in between.

use std::time::Instant;

/// Cancellation handle returned by [`TimerQueue::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Pending<K> {
    handle: TimerHandle,
    kind: K,
    deadline: Instant,
}

#[derive(Debug)]
pub struct TimerQueue<K> {
    pending: Vec<Pending<K>>,
    next_id: u64,
}

impl<K: Copy + PartialEq> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, kind: K, deadline: Instant) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            handle,
            kind,
            deadline,
        });
        handle
    }

    /// Returns `false` if the timer already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.pending.iter().position(|p| p.handle == handle) {
            Some(pos) => {
                self.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn cancel_kind(&mut self, kind: K) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| p.kind != kind);
        before - self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self, kind: K) -> usize {
        self.pending.iter().filter(|p| p.kind == kind).count()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    /// Remove and return the earliest timer due at `now`. Timers sharing a
    /// deadline come out in the order they were scheduled.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerHandle, K, Instant)> {
        let pos = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.deadline <= now)
            .min_by_key(|(_, p)| (p.deadline, p.handle.0))
            .map(|(pos, _)| pos)?;
        let fired = self.pending.remove(pos);
        Some((fired.handle, fired.kind, fired.deadline))
    }
}

impl<K: Copy + PartialEq> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        A,
        B,
    }

    #[test]
    fn pops_in_deadline_order() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(Kind::A, t0 + Duration::from_millis(300));
        q.schedule(Kind::B, t0 + Duration::from_millis(100));
        assert_eq!(q.next_deadline(), Some(t0 + Duration::from_millis(100)));

        assert!(q.pop_due(t0 + Duration::from_millis(50)).is_none());
        let (_, kind, at) = q.pop_due(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!((kind, at), (Kind::B, t0 + Duration::from_millis(100)));
        let (_, kind, _) = q.pop_due(t0 + Duration::from_millis(500)).unwrap();
        assert_eq!(kind, Kind::A);
        assert_eq!(q.next_deadline(), None);
    }

    #[test]
    fn equal_deadlines_fire_in_schedule_order() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        let first = q.schedule(Kind::B, t0);
        let second = q.schedule(Kind::A, t0);
        assert_eq!(q.pop_due(t0).map(|(h, _, _)| h), Some(first));
        assert_eq!(q.pop_due(t0).map(|(h, _, _)| h), Some(second));
    }

    #[test]
    fn cancel_is_idempotent() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        let h = q.schedule(Kind::A, t0);
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        assert!(q.pop_due(t0).is_none());
    }

    #[test]
    fn cancel_kind_leaves_others() {
        let t0 = Instant::now();
        let mut q = TimerQueue::new();
        q.schedule(Kind::A, t0);
        q.schedule(Kind::A, t0);
        q.schedule(Kind::B, t0);
        assert_eq!(q.cancel_kind(Kind::A), 2);
        assert_eq!(q.pending(Kind::A), 0);
        assert_eq!(q.pending(Kind::B), 1);
    }
}
