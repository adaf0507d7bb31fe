//! Logical-clock timer wheel driven by the simulation tick.
//!
//! Time only moves when [`Scheduler::advance`] is called, so timers fire
//! deterministically in tests and in the live tick loop alike.

use std::collections::{BTreeMap, HashMap};

/// Handle to a scheduled timer, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
pub struct Scheduler<E> {
    now: u64,
    next_id: u64,
    /// Pending events keyed by (due tick, timer id) so they fire in due order,
    /// then in scheduling order.
    pending: BTreeMap<(u64, u64), E>,
    due_by_id: HashMap<u64, u64>,
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_id: 1,
            pending: BTreeMap::new(),
            due_by_id: HashMap::new(),
        }
    }

    /// Current logical time in ticks.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Schedules `event` to fire `delay_ticks` ticks from now. A zero delay
    /// fires on the next advance.
    pub fn schedule_in(&mut self, delay_ticks: u64, event: E) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;

        let due = self.now + delay_ticks.max(1);
        self.pending.insert((due, id), event);
        self.due_by_id.insert(id, due);

        TimerHandle(id)
    }

    /// Cancels a pending timer. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.due_by_id.remove(&handle.0) {
            Some(due) => self.pending.remove(&(due, handle.0)).is_some(),
            None => false,
        }
    }

    /// Advances the clock by one tick and returns every event now due.
    pub fn advance(&mut self) -> Vec<E> {
        self.now += 1;

        let mut fired = Vec::new();
        while let Some(entry) = self.pending.first_entry() {
            let (due, id) = *entry.key();
            if due > self.now {
                break;
            }
            self.due_by_id.remove(&id);
            fired.push(entry.remove());
        }
        fired
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_after_delay() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_in(3, "countdown");

        assert!(scheduler.advance().is_empty());
        assert!(scheduler.advance().is_empty());
        assert_eq!(scheduler.advance(), vec!["countdown"]);
        assert!(scheduler.advance().is_empty());
        assert_eq!(scheduler.now(), 4);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_events_fire_in_due_then_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_in(2, "b");
        scheduler.schedule_in(1, "a");
        scheduler.schedule_in(2, "c");

        assert_eq!(scheduler.advance(), vec!["a"]);
        assert_eq!(scheduler.advance(), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_delay_fires_next_tick() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_in(0, 1);
        assert_eq!(scheduler.advance(), vec![1]);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule_in(2, "cancelled");
        scheduler.schedule_in(2, "kept");

        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));

        scheduler.advance();
        assert_eq!(scheduler.advance(), vec!["kept"]);
    }

    #[test]
    fn test_cancel_after_fire_is_noop() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule_in(1, ());
        assert_eq!(scheduler.advance().len(), 1);
        assert!(!scheduler.cancel(handle));
    }
}
