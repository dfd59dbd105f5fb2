//! # Batch — CPU-Side Vertex Accumulation With Flush-On-State-Change
//!
//! Every `draw_indexed`-style GPU submission carries driver overhead, so the
//! renderer buffers vertices CPU-side and submits them in runs that share one
//! piece of draw state: the primitive topology for colored geometry, or the
//! bound texture for quads. [`BatchBuffer`] is that accumulation policy,
//! extracted so all three batchers share it.
//!
//! The buffer is a small state machine:
//!
//! ```text
//!               push(key)                        push(key)
//!   ┌──────┐ ─────────────► ┌──────────────────┐ ───┐ (same key, fits)
//!   │ Idle │                │ Accumulating(key) │ ◄──┘
//!   └──────┘ ◄───────────── └──────────────────┘
//!               reset()        │          ▲
//!                              │ push(k') │  k' ≠ key, or capacity reached:
//!                              └──────────┘  hand the pending run to `flush`,
//!                                            then accumulate under k'
//! ```
//!
//! Two invariants matter for correctness:
//!
//! - **Order**: the pending run is always drained before a new key is
//!   accepted, so vertices reach the GPU in submission order.
//! - **Capacity**: the live count never exceeds the fixed capacity; a push
//!   that would overflow drains first, so nothing is dropped and nothing
//!   writes out of bounds.
//!
//! A push hands *whole primitives* to the buffer (a quad's six vertices, a
//! circle's full fan), so a capacity drain never splits a primitive across
//! two draw calls. The vertex storage is allocated once and reused for the
//! process lifetime; only the live count resets.

/// Fixed-capacity vertex accumulator keyed by draw state.
///
/// `K` is whatever must stay constant within one GPU submission (topology,
/// texture handle). The flush callback receives the key and the live vertex
/// run; it is invoked at most once per push.
pub(crate) struct BatchBuffer<K, V> {
    vertices: Vec<V>,
    capacity: usize,
    key: Option<K>,
}

impl<K: Copy + PartialEq, V: Copy> BatchBuffer<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
            capacity,
            key: None,
        }
    }

    /// Append vertices under a draw key, draining the pending run first when
    /// the key changes or the append would exceed capacity.
    pub fn push(&mut self, key: K, vertices: &[V], mut flush: impl FnMut(K, &[V])) {
        debug_assert!(vertices.len() <= self.capacity);

        if let Some(current) = self.key {
            let key_change = current != key;
            let overflow = self.vertices.len() + vertices.len() > self.capacity;
            if (key_change || overflow) && !self.vertices.is_empty() {
                flush(current, &self.vertices);
                self.vertices.clear();
            }
        }

        self.key = Some(key);
        self.vertices.extend_from_slice(vertices);
    }

    /// Drain the pending run, if any. The key survives the drain so further
    /// pushes under the same state accumulate without a transition.
    pub fn drain(&mut self, mut flush: impl FnMut(K, &[V])) {
        if let Some(key) = self.key {
            if !self.vertices.is_empty() {
                flush(key, &self.vertices);
                self.vertices.clear();
            }
        }
    }

    /// Clear the live count and forget the key (start-of-frame state).
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.key = None;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> Vec<(u8, Vec<i32>)> {
        Vec::new()
    }

    #[test]
    fn same_key_accumulates_without_flush() {
        let mut buf = BatchBuffer::new(16);
        let mut runs = recording();

        buf.push(0u8, &[1, 2], |k, v| runs.push((k, v.to_vec())));
        buf.push(0u8, &[3, 4], |k, v| runs.push((k, v.to_vec())));

        assert!(runs.is_empty());
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn key_change_flushes_pending_run_first() {
        let mut buf = BatchBuffer::new(16);
        let mut runs = recording();

        buf.push(0u8, &[1, 2], |k, v| runs.push((k, v.to_vec())));
        buf.push(1u8, &[3], |k, v| runs.push((k, v.to_vec())));

        assert_eq!(runs, vec![(0, vec![1, 2])]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn capacity_overflow_flushes_exactly_once_before_append() {
        let capacity = 8;
        let mut buf = BatchBuffer::new(capacity);
        let mut runs = recording();

        for i in 0..capacity as i32 {
            buf.push(0u8, &[i], |k, v| runs.push((k, v.to_vec())));
        }
        assert!(runs.is_empty(), "N = capacity appends must fit");
        assert_eq!(buf.len(), capacity);

        // The N+1-th append triggers exactly one flush, then lands alone.
        buf.push(0u8, &[99], |k, v| runs.push((k, v.to_vec())));
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].1.len(), capacity);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn submission_order_is_preserved_across_flush_boundaries() {
        let mut buf = BatchBuffer::new(4);
        let mut drained = Vec::new();

        for i in 0..10 {
            buf.push(0u8, &[i], |_, v| drained.extend_from_slice(v));
        }
        buf.drain(|_, v| drained.extend_from_slice(v));

        assert_eq!(drained, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn alternating_keys_produce_one_run_each() {
        // texA, texB, texA must yield three runs, not two.
        let mut buf = BatchBuffer::new(64);
        let mut runs = recording();

        buf.push(7u8, &[1], |k, v| runs.push((k, v.to_vec())));
        buf.push(8u8, &[2], |k, v| runs.push((k, v.to_vec())));
        buf.push(7u8, &[3], |k, v| runs.push((k, v.to_vec())));
        buf.drain(|k, v| runs.push((k, v.to_vec())));

        assert_eq!(runs, vec![(7, vec![1]), (8, vec![2]), (7, vec![3])]);
    }

    #[test]
    fn key_persists_across_drain() {
        let mut buf = BatchBuffer::new(16);
        let mut runs = recording();

        buf.push(3u8, &[1], |k, v| runs.push((k, v.to_vec())));
        buf.drain(|k, v| runs.push((k, v.to_vec())));
        // Accumulating again under the same key must not trigger a flush.
        buf.push(3u8, &[2], |k, v| runs.push((k, v.to_vec())));

        assert_eq!(runs, vec![(3, vec![1])]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn drain_on_empty_buffer_is_a_no_op() {
        let mut buf: BatchBuffer<u8, i32> = BatchBuffer::new(16);
        let mut runs = recording();

        buf.drain(|k, v| runs.push((k, v.to_vec())));
        assert!(runs.is_empty());
    }

    #[test]
    fn key_change_with_empty_buffer_switches_silently() {
        let mut buf = BatchBuffer::new(16);
        let mut runs = recording();

        buf.push(0u8, &[1], |k, v| runs.push((k, v.to_vec())));
        buf.drain(|k, v| runs.push((k, v.to_vec())));
        buf.push(1u8, &[2], |k, v| runs.push((k, v.to_vec())));

        // Only the explicit drain produced a run; the key switch after it
        // found an empty buffer and flushed nothing.
        assert_eq!(runs, vec![(0, vec![1])]);
    }

    #[test]
    fn reset_clears_count_and_key() {
        let mut buf = BatchBuffer::new(16);
        let mut runs = recording();

        buf.push(0u8, &[1, 2, 3], |k, v| runs.push((k, v.to_vec())));
        buf.reset();
        assert_eq!(buf.len(), 0);

        buf.push(1u8, &[4], |k, v| runs.push((k, v.to_vec())));
        assert!(runs.is_empty(), "reset must not leave a stale run behind");
    }
}
