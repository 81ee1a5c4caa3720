use std::collections::VecDeque;

use common::Bar;
use tracing::warn;

/// Bounded, time-ordered window of one-minute bars for the underlying.
///
/// Appending at capacity evicts the oldest bar. Bars arriving with a
/// timestamp older than the tail are rejected with a log instead of
/// silently corrupting the order; a bar with the tail's timestamp replaces
/// it (the live update of the still-forming minute).
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarWindow {
    pub const DEFAULT_CAPACITY: usize = 200;

    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "bar window capacity must be > 0");
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, bar: Bar) {
        if let Some(tail) = self.bars.back() {
            if bar.timestamp < tail.timestamp {
                warn!(
                    bar_ts = %bar.timestamp,
                    tail_ts = %tail.timestamp,
                    "Rejecting out-of-order bar"
                );
                return;
            }
            if bar.timestamp == tail.timestamp {
                *self.bars.back_mut().unwrap() = bar;
                return;
            }
        }
        if self.bars.len() == self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Ordered view of the window, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    /// Closing prices, oldest first. The indicator engine works on this.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }
}

impl Default for BarWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
