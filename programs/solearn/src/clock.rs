//! Slot source for deadline checks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic slot height supplied by the host.
pub trait SlotClock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall-clock slots: `start_slot` at construction, one more every
/// `slot_duration`.
#[derive(Debug, Clone)]
pub struct SystemSlotClock {
    origin: Instant,
    start_slot: u64,
    slot_duration: Duration,
}

impl SystemSlotClock {
    /// A zero `slot_duration` is treated as one millisecond.
    pub fn new(start_slot: u64, slot_duration: Duration) -> Self {
        Self {
            origin: Instant::now(),
            start_slot,
            slot_duration: slot_duration.max(Duration::from_millis(1)),
        }
    }
}

impl SlotClock for SystemSlotClock {
    fn now(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_nanos() / self.slot_duration.as_nanos();
        self.start_slot
            .saturating_add(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// Clock advanced explicitly by the caller.
#[derive(Debug, Default)]
pub struct ManualClock {
    slot: AtomicU64,
}

impl ManualClock {
    pub fn new(slot: u64) -> Self {
        Self {
            slot: AtomicU64::new(slot),
        }
    }

    pub fn set(&self, slot: u64) {
        self.slot.store(slot, Ordering::SeqCst);
    }

    pub fn advance(&self, slots: u64) -> u64 {
        self.slot.fetch_add(slots, Ordering::SeqCst) + slots
    }
}

impl SlotClock for ManualClock {
    fn now(&self) -> u64 {
        self.slot.load(Ordering::SeqCst)
    }
}

impl<T: SlotClock + ?Sized> SlotClock for std::sync::Arc<T> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.now(), 10);
        assert_eq!(clock.advance(5), 15);
        clock.set(3);
        assert_eq!(clock.now(), 3);
    }

    #[test]
    fn test_system_clock_counts_from_start_slot() {
        let slow = SystemSlotClock::new(500, Duration::from_secs(3600));
        assert_eq!(slow.now(), 500);

        let fast = SystemSlotClock::new(0, Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));
        let first = fast.now();
        assert!(first >= 5);
        assert!(fast.now() >= first);
    }
}
