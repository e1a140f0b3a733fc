//! # simulator
//!
//! Owns one running machine: the bus, the key timer, the display decoder and
//! the quit flag, plus borrowed input, display, core and (optionally) trace.
//! Nothing lives in globals, so several simulators can run side by side.
//!
//! Each `run_tick()`:
//!
//!  * polls for at most one input event, without blocking
//!  * releases held keys whose time is up
//!  * clocks the core through both phases, decoding scan pulses as it goes
//!  * hands the display the bus status (every `redraw_interval` ticks)
//!
//! `main_loop()` repeats that until the quit key, optionally paced to a tick
//! rate, then closes the trace and finalises the core.
use crate::bus::SignalBus;
use crate::clock::ClockSequencer;
use crate::config::Config;
use crate::debounce::InputDebouncer;
use crate::decode::ScanDisplayDecoder;
use crate::display::{Display, Frame};
use crate::error::Result;
use crate::input::{Input, InputEvent};
use crate::logic::Core;
use crate::trace::TraceSink;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// time between ticks at `rate` ticks per second. Rates too slow to express
/// as a `Duration`, and rates that aren't positive, run unpaced.
fn tick_period(rate: f64) -> Option<Duration> {
    if rate.is_nan() || rate <= 0.0 {
        warn!(rate, "tick rate must be positive, running unpaced");
        return None;
    }
    match Duration::try_from_secs_f64(1.0 / rate) {
        Ok(period) => Some(period),
        Err(e) => {
            warn!(rate, error = %e, "tick rate out of range, running unpaced");
            None
        }
    }
}

pub struct Simulator<'a> {
    sequencer: ClockSequencer<'a>,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    bus: SignalBus,
    debouncer: InputDebouncer,
    decoder: ScanDisplayDecoder,
    tick: u64,
    quit: bool,
    finished: bool,
    key_label: Option<String>,
    redraw_interval: u64,
    tick_period: Option<Duration>,
}

impl<'a> Simulator<'a> {
    pub fn new(
        core: &'a mut dyn Core,
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        config: &Config,
    ) -> Simulator<'a> {
        let debouncer = InputDebouncer::new(config.hold_ticks, config.display_select);
        let mut bus = SignalBus::default();
        bus.inputs = *debouncer.inputs();
        // let the core settle on its power-on inputs before the first edge
        core.eval(&mut bus);

        Simulator {
            sequencer: ClockSequencer::new(core),
            display,
            input,
            bus,
            debouncer,
            decoder: ScanDisplayDecoder::new(),
            tick: 0,
            quit: false,
            finished: false,
            key_label: None,
            redraw_interval: config.redraw_interval.max(1),
            tick_period: config.tick_rate.and_then(tick_period),
        }
    }

    /// dump every clock phase to `trace`
    pub fn with_trace(mut self, trace: &'a mut dyn TraceSink) -> Self {
        self.sequencer = self.sequencer.with_trace(trace);
        self
    }

    fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::Press(key) => {
                self.debouncer.on_key_event(key, self.tick);
                self.key_label = Some(format!("key press: {}", key.label()));
                info!(key = key.label(), tick = self.tick, "key press");
            }
            InputEvent::DisplaySelectUp => {
                self.debouncer.display_select_up();
                debug!(sw_dp = self.debouncer.display_select(), "display select");
            }
            InputEvent::DisplaySelectDown => {
                self.debouncer.display_select_down();
                debug!(sw_dp = self.debouncer.display_select(), "display select");
            }
            InputEvent::Quit => {
                info!(tick = self.tick, "quit requested");
                self.quit = true;
            }
            InputEvent::Unknown(code) => {
                self.key_label = Some(format!("unknown key press: 0x{:03x}", code));
                warn!(code, "unknown key press");
            }
        }
    }

    /// advance the machine by one tick
    pub fn run_tick(&mut self) -> Result<()> {
        if let Some(event) = self.input.poll_event()? {
            self.handle(event);
        }
        if self.debouncer.advance(self.tick) {
            self.key_label = None;
        }

        self.sequencer.tick(
            self.tick,
            self.debouncer.inputs(),
            &mut self.bus,
            &mut self.decoder,
            &mut *self.display,
        )?;

        if self.tick % self.redraw_interval == 0 {
            let frame = Frame {
                tick: self.tick,
                outputs: &self.bus.outputs,
                display_select: self.debouncer.display_select(),
                key_label: self.key_label.as_deref(),
            };
            self.display.present(&frame)?;
        }

        self.tick += 1;
        Ok(())
    }

    /// run until quit, or until `limit` ticks have gone by; returns the number
    /// of ticks run
    pub fn main_loop(&mut self, limit: Option<u64>) -> Result<u64> {
        let start = self.tick;
        let mut deadline = Instant::now();
        while !self.quit && limit.map_or(true, |l| self.tick - start < l) {
            self.run_tick()?;
            if let Some(period) = self.tick_period {
                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    spin_sleep::sleep(deadline - now);
                } else {
                    // fell behind; don't try to catch up in a burst
                    deadline = now;
                }
            }
        }
        self.shutdown()?;
        Ok(self.tick - start)
    }

    /// close the trace and finalise the core; only the first call does anything
    pub fn shutdown(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.sequencer.shutdown()?;
        info!(ticks = self.tick, frames = self.decoder.frames(), "simulation stopped");
        Ok(())
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn debouncer(&self) -> &InputDebouncer {
        &self.debouncer
    }

    pub fn decoder(&self) -> &ScanDisplayDecoder {
        &self.decoder
    }

    pub fn key_label(&self) -> Option<&str> {
        self.key_label.as_deref()
    }

    pub fn is_quit(&self) -> bool {
        self.quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{Key, ScanOutputs};
    use crate::display::{DrawCall, DummyDisplay};
    use crate::input::DummyInput;
    use crate::logic::{ScriptedCore, TestCardCore, TEST_CARD_PULSES};
    use crate::trace::MemoryTrace;

    #[test]
    fn test_key_held_for_hold_ticks() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[InputEvent::Press(Key::Digit5)]);
        let config = Config {
            redraw_interval: 1000,
            ..Config::default()
        };
        let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
        for t in 0..=50_001u64 {
            sim.run_tick()?;
            let held = sim.bus().inputs.keys.get(Key::Digit5);
            assert_eq!(held, t < 50_000, "tick {}", t);
            assert_eq!(sim.key_label().is_some(), t < 50_000, "tick {}", t);
        }
        Ok(())
    }

    #[test]
    fn test_tick_period() {
        assert_eq!(tick_period(4.0), Some(Duration::from_millis(250)));
        assert_eq!(tick_period(f64::INFINITY), Some(Duration::ZERO));
        assert_eq!(tick_period(1e-20), None);
        assert_eq!(tick_period(0.0), None);
        assert_eq!(tick_period(f64::NAN), None);
    }

    #[test]
    fn test_tiny_tick_rate_runs_unpaced() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let config = Config {
            tick_rate: Some(1e-20),
            ..Config::default()
        };
        let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
        assert_eq!(sim.main_loop(Some(5))?, 5);
        Ok(())
    }

    #[test]
    fn test_label_follows_hold() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[InputEvent::Press(Key::Store)]);
        let config = Config {
            hold_ticks: 3,
            ..Config::default()
        };
        {
            let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
            sim.run_tick()?;
            assert_eq!(sim.key_label(), Some("key press: STORE"));
            sim.main_loop(Some(3))?;
            assert_eq!(sim.key_label(), None);
        }
        assert_eq!(display.last_label, None);
        Ok(())
    }

    #[test]
    fn test_second_key_replaces_first() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[InputEvent::Press(Key::Add)]);
        input.wait(4);
        input.push(InputEvent::Press(Key::Subtract));
        let config = Config {
            hold_ticks: 10,
            ..Config::default()
        };
        let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
        sim.main_loop(Some(15))?;
        // pressed at tick 5, still down at tick 14
        assert!(sim.bus().inputs.keys.get(Key::Subtract));
        assert!(!sim.bus().inputs.keys.get(Key::Add));
        assert_eq!(sim.debouncer().release_at(), Some(15));
        sim.run_tick()?;
        assert!(!sim.bus().inputs.keys.any());
        Ok(())
    }

    #[test]
    fn test_one_line_at_a_time() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[
            InputEvent::Press(Key::Add),
            InputEvent::Press(Key::Digit1),
            InputEvent::Press(Key::Enter),
        ]);
        let config = Config {
            hold_ticks: 10,
            ..Config::default()
        };
        {
            let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
            for t in 0..20 {
                sim.run_tick()?;
                assert!(sim.bus().inputs.keys.held().count() <= 1, "tick {}", t);
            }
            // the last press, at tick 2, decides the release
            assert_eq!(sim.debouncer().release_at(), None);
        }
        let enter_ticks = core
            .seen
            .iter()
            .filter(|(_, i)| i.keys.get(Key::Enter))
            .count();
        // two phases for each of ticks 2 to 11
        assert_eq!(enter_ticks, 20);
        Ok(())
    }

    #[test]
    fn test_display_select_events() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[
            InputEvent::DisplaySelectUp,
            InputEvent::DisplaySelectUp,
            InputEvent::DisplaySelectUp,
        ]);
        let config = Config::default();
        let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
        sim.main_loop(Some(5))?;
        assert_eq!(sim.bus().inputs.display_select, 8);
        assert!(!sim.bus().inputs.keys.any());
        assert_eq!(sim.debouncer().release_at(), None);
        Ok(())
    }

    #[test]
    fn test_unknown_key_only_labels() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[InputEvent::Unknown(0x7a)]);
        let config = Config::default();
        let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
        let before = *sim.bus();
        sim.run_tick()?;
        assert_eq!(sim.key_label(), Some("unknown key press: 0x07a"));
        assert_eq!(sim.bus().inputs, before.inputs);
        Ok(())
    }

    #[test]
    fn test_quit_stops_finalises_and_closes() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let mut trace = MemoryTrace::default();
        input.push(InputEvent::Quit);
        let config = Config::default();
        {
            let mut sim =
                Simulator::new(&mut core, &mut display, &mut input, &config).with_trace(&mut trace);
            let ran = sim.main_loop(None)?;
            assert_eq!(ran, 1);
            assert!(sim.is_quit());
            // a second shutdown is harmless
            sim.shutdown()?;
        }
        assert!(core.finalized);
        assert!(trace.closed);
        assert_eq!(trace.times, vec![0, 5]);
        Ok(())
    }

    #[test]
    fn test_redraw_interval() -> Result<()> {
        let mut core = ScriptedCore::new(&[]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let config = Config {
            redraw_interval: 10,
            ..Config::default()
        };
        {
            let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
            sim.main_loop(Some(25))?;
        }
        assert_eq!(display.presents(), 3);
        Ok(())
    }

    #[test]
    fn test_scripted_frame_reaches_display() -> Result<()> {
        let erase = ScanOutputs {
            erase: true,
            ..ScanOutputs::default()
        };
        let bar = ScanOutputs {
            seg_samp: true,
            v_dot: 2,
            h_dot: 2,
            v_seg: true,
            seg_len: 48,
            ..ScanOutputs::default()
        };
        let mut core = ScriptedCore::new(&[erase, bar, erase]);
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let config = Config::default();
        {
            let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
            sim.main_loop(Some(3))?;
            assert!(sim.decoder().buffer().is_empty());
            assert_eq!(sim.decoder().visible().len(), 1);
        }
        let lines = display
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Line(..)))
            .count();
        assert_eq!(lines, 1);
        let line_at = display.calls.iter().position(|c| matches!(c, DrawCall::Line(..)));
        let last_swap = display.calls.iter().rposition(|c| *c == DrawCall::Swap);
        assert!(line_at < last_swap);
        Ok(())
    }

    #[test]
    fn test_card_fills_a_frame() -> Result<()> {
        let mut core = TestCardCore::new();
        let mut display = DummyDisplay::new();
        let mut input = DummyInput::new(&[]);
        let config = Config::default();
        let mut sim = Simulator::new(&mut core, &mut display, &mut input, &config);
        sim.main_loop(Some(TEST_CARD_PULSES as u64 + 1))?;
        assert_eq!(sim.decoder().frames(), 2);
        assert_eq!(sim.decoder().visible().len(), TEST_CARD_PULSES);
        Ok(())
    }
}
