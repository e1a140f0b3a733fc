//! Key hold timing.
//!
//! A key press on the host is a single event, but the calculator core samples
//! its key lines on its own schedule and needs them held for many clock
//! cycles. The debouncer asserts a key's line when the event arrives and
//! drops it again a fixed number of ticks later. Time is counted in ticks, so
//! the hold is the same however fast the simulation runs.

use crate::bus::{BusInputs, Key, DISPLAY_SELECT_MAX};
use tracing::debug;

/// default hold time, in ticks
pub const HOLD_TICKS: u64 = 50_000;

/// switch position at power on
pub const DEFAULT_DISPLAY_SELECT: u8 = 5;

pub struct InputDebouncer {
    inputs: BusInputs,
    hold_ticks: u64,
    release_at: u64,
    release_pending: bool,
    held: Option<Key>,
}

impl InputDebouncer {
    pub fn new(hold_ticks: u64, display_select: u8) -> Self {
        InputDebouncer {
            inputs: BusInputs {
                display_select: display_select.min(DISPLAY_SELECT_MAX),
                ..BusInputs::default()
            },
            hold_ticks,
            release_at: 0,
            release_pending: false,
            held: None,
        }
    }

    /// hold `key` from `tick` for the hold time. A key already held is
    /// replaced and its release time forgotten. A hold running past the end
    /// of time just never releases.
    pub fn on_key_event(&mut self, key: Key, tick: u64) {
        self.inputs.keys.clear();
        self.inputs.keys.set(key, true);
        self.held = Some(key);
        self.release_at = tick.saturating_add(self.hold_ticks);
        self.release_pending = true;
        debug!(key = key.label(), tick, release_at = self.release_at, "key held");
    }

    /// call once per tick; returns true on the tick the lines are released
    pub fn advance(&mut self, tick: u64) -> bool {
        if self.release_pending && tick == self.release_at {
            self.inputs.keys.clear();
            self.release_pending = false;
            self.held = None;
            debug!(tick, "keys released");
            return true;
        }
        false
    }

    pub fn display_select_up(&mut self) {
        if self.inputs.display_select < DISPLAY_SELECT_MAX {
            self.inputs.display_select += 1;
        }
    }

    pub fn display_select_down(&mut self) {
        self.inputs.display_select = self.inputs.display_select.saturating_sub(1);
    }

    /// the line state to put on the bus this tick
    pub fn inputs(&self) -> &BusInputs {
        &self.inputs
    }

    pub fn display_select(&self) -> u8 {
        self.inputs.display_select
    }

    /// the key currently held, if any
    pub fn held(&self) -> Option<Key> {
        self.held
    }

    /// tick at which the held key will be let go
    pub fn release_at(&self) -> Option<u64> {
        self.release_pending.then(|| self.release_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_until(d: &mut InputDebouncer, from: u64, to: u64) {
        for t in from..to {
            d.advance(t);
        }
    }

    #[test]
    fn test_held_for_exactly_hold_ticks() {
        let mut d = InputDebouncer::new(HOLD_TICKS, DEFAULT_DISPLAY_SELECT);
        d.on_key_event(Key::Digit5, 0);
        for t in 0..HOLD_TICKS {
            assert!(!d.advance(t));
            assert!(d.inputs().keys.get(Key::Digit5), "released early at {}", t);
        }
        assert!(d.advance(HOLD_TICKS));
        assert!(!d.inputs().keys.get(Key::Digit5));
        run_until(&mut d, HOLD_TICKS + 1, HOLD_TICKS + 100);
        assert!(!d.inputs().keys.any());
        assert_eq!(d.held(), None);
    }

    #[test]
    fn test_huge_hold_does_not_wrap() {
        let mut d = InputDebouncer::new(u64::MAX, 0);
        d.on_key_event(Key::Digit5, 1);
        assert_eq!(d.release_at(), Some(u64::MAX));
        run_until(&mut d, 1, 1000);
        assert!(!d.advance(u64::MAX - 1));
        assert_eq!(d.held(), Some(Key::Digit5));
        assert!(d.advance(u64::MAX));
        assert!(!d.inputs().keys.any());
    }

    #[test]
    fn test_later_event_moves_release() {
        let mut d = InputDebouncer::new(10, 0);
        d.on_key_event(Key::Add, 0);
        run_until(&mut d, 0, 4);
        d.on_key_event(Key::Subtract, 4);
        assert_eq!(d.release_at(), Some(14));
        run_until(&mut d, 4, 14);
        assert!(d.inputs().keys.get(Key::Subtract));
        assert!(d.advance(14));
        assert!(!d.inputs().keys.any());
    }

    #[test]
    fn test_at_most_one_line_held() {
        let mut d = InputDebouncer::new(7, 0);
        let keys = [Key::Digit1, Key::Store, Key::Store, Key::Enter, Key::Digit9];
        for t in 0..200u64 {
            // presses on an irregular cadence, some before the last released
            if t % 3 == 0 || t % 11 == 0 {
                d.on_key_event(keys[(t as usize) % keys.len()], t);
            }
            d.advance(t);
            assert!(d.inputs().keys.held().count() <= 1, "tick {}", t);
        }
    }

    #[test]
    fn test_display_select_clamps() {
        let mut d = InputDebouncer::new(HOLD_TICKS, DEFAULT_DISPLAY_SELECT);
        for _ in 0..20 {
            d.display_select_up();
        }
        assert_eq!(d.display_select(), 13);
        for _ in 0..30 {
            d.display_select_down();
        }
        assert_eq!(d.display_select(), 0);
        d.display_select_up();
        assert_eq!(d.display_select(), 1);
    }

    #[test]
    fn test_display_select_never_holds_a_line() {
        let mut d = InputDebouncer::new(HOLD_TICKS, DEFAULT_DISPLAY_SELECT);
        d.display_select_up();
        d.display_select_down();
        assert!(!d.inputs().keys.any());
        assert_eq!(d.release_at(), None);
    }

    #[test]
    fn test_display_select_leaves_timer_alone() {
        let mut d = InputDebouncer::new(5, 3);
        d.on_key_event(Key::Recall, 0);
        d.display_select_up();
        assert_eq!(d.release_at(), Some(5));
        assert!(d.inputs().keys.get(Key::Recall));
    }

    #[test]
    fn test_initial_display_select_is_clamped() {
        let d = InputDebouncer::new(HOLD_TICKS, 99);
        assert_eq!(d.display_select(), DISPLAY_SELECT_MAX);
    }
}
