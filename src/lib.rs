//! Front end for a simulated Friden EC-130 electronic calculator.
//!
//! ## Design
//!
//! * the calculator logic itself is a black box behind `logic::Core`; this crate
//!   only drives its bus
//! * time is measured in ticks, one full two-phase clock cycle each, never in
//!   wall-clock time, so behaviour doesn't depend on how fast we run
//! * key presses become held key lines, released a fixed number of ticks
//!   later; one key at a time, the newest wins
//! * the display arrives as scan pulses, one segment at a time, and has to be
//!   rebuilt into a steady picture between erase pulses
//! * abstract the display so the same decoder serves a text view of the
//!   registers and a drawing of the tube face
//!
//! Model
//!
//! ```text
//! main
//!  |-- config, input, display, core, trace (optional)
//!  |-- simulator(core, display, input, config)
//!  |    |-- bus
//!  |    |-- input debouncer(hold ticks, display select)
//!  |    |-- clock sequencer(core, trace)
//!  |    `-- scan display decoder
//!  `-- main loop
//!       |-- poll one input event, no waiting
//!       |-- debouncer.advance(tick)         // maybe release keys
//!       |-- for clk in 0, 1 {
//!       |     core.eval(bus); trace.dump(10*tick + 5*clk);
//!       |     decoder.observe(bus.scan, display)
//!       |   }
//!       `-- display.present(frame)
//! ```
pub mod bus;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod decode;
pub mod display;
pub mod error;
pub mod input;
pub mod logic;
pub mod simulator;
pub mod trace;

pub use error::{Error, Result};
