//! ---
//! meterlink_section: "01-core-functionality"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Bounded FIFO window of accepted readings."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::collections::VecDeque;

use meterlink_sim::Reading;
use parking_lot::Mutex;

/// Window length used when none is configured.
pub const DEFAULT_CAPACITY: usize = 10;

/// Most recently accepted readings, oldest first, never longer than `capacity`.
///
/// All operations take the internal lock, so a [`snapshot`](Self::snapshot)
/// always observes a complete append or clear.
#[derive(Debug)]
pub struct SlidingWindow {
    capacity: usize,
    buffer: Mutex<VecDeque<Reading>>,
}

impl SlidingWindow {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, evicting the oldest reading first when full. Returns the new length.
    pub fn append(&self, reading: Reading) -> usize {
        let mut buffer = self.buffer.lock();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(reading);
        buffer.len()
    }

    /// Copy of the contents, oldest to newest.
    pub fn snapshot(&self) -> Vec<Reading> {
        self.buffer.lock().iter().copied().collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterlink_sim::NominalProfile;
    use std::sync::Arc;

    fn reading(voltage: f64) -> Reading {
        Reading {
            voltage,
            ..NominalProfile::default().reading()
        }
    }

    fn voltages(window: &SlidingWindow) -> Vec<f64> {
        window.snapshot().iter().map(|r| r.voltage).collect()
    }

    #[test]
    fn full_window_evicts_oldest_first() {
        let window = SlidingWindow::new(10);
        for v in 1..=10 {
            window.append(reading(v as f64));
        }
        assert_eq!(window.len(), 10);

        window.append(reading(11.0));
        assert_eq!(window.len(), 10);
        let expected: Vec<f64> = (2..=11).map(|v| v as f64).collect();
        assert_eq!(voltages(&window), expected);
    }

    #[test]
    fn snapshot_is_detached_from_buffer() {
        let window = SlidingWindow::new(3);
        window.append(reading(1.0));
        let mut copy = window.snapshot();
        copy.push(reading(2.0));
        copy[0].voltage = 99.0;
        assert_eq!(voltages(&window), vec![1.0]);
    }

    #[test]
    fn clear_empties_window() {
        let window = SlidingWindow::default();
        window.append(reading(1.0));
        window.append(reading(2.0));
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let window = SlidingWindow::new(0);
        window.append(reading(1.0));
        window.append(reading(2.0));
        assert_eq!(voltages(&window), vec![2.0]);
    }

    #[test]
    fn concurrent_appends_respect_bound_and_order() {
        let window = Arc::new(SlidingWindow::new(5));
        let writers: Vec<_> = (0..4)
            .map(|worker| {
                let window = window.clone();
                std::thread::spawn(move || {
                    for i in 0..250 {
                        window.append(reading((worker * 1000 + i) as f64));
                        assert!(window.snapshot().len() <= 5);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 5);
        // Each worker's values arrive in increasing order, so within one
        // worker the snapshot must stay sorted.
        for worker in 0..4 {
            let mine: Vec<f64> = snapshot
                .iter()
                .map(|r| r.voltage)
                .filter(|v| (*v as usize) / 1000 == worker)
                .collect();
            assert!(mine.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }
}
