use crate::debounce::{DEFAULT_DISPLAY_SELECT, HOLD_TICKS};
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;

/// which display to run
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// register contents and status flags as text
    Grid,
    /// the tube face, drawn from scan pulses
    Vector,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Grid => write!(f, "grid"),
            Backend::Vector => write!(f, "vector"),
        }
    }
}

/// how a simulator run is set up
#[derive(Clone, Debug)]
pub struct Config {
    pub backend: Backend,
    /// ticks a key stays down after it's pressed
    pub hold_ticks: u64,
    /// decimal point switch at power on
    pub display_select: u8,
    /// write a VCD waveform here
    pub trace: Option<PathBuf>,
    /// ticks per second; None runs as fast as possible
    pub tick_rate: Option<f64>,
    /// ticks between status redraws
    pub redraw_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: Backend::Grid,
            hold_ticks: HOLD_TICKS,
            display_select: DEFAULT_DISPLAY_SELECT,
            trace: None,
            tick_rate: None,
            redraw_interval: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_machine() {
        let c = Config::default();
        assert_eq!(c.hold_ticks, 50_000);
        assert_eq!(c.display_select, 5);
        assert_eq!(c.backend, Backend::Grid);
        assert_eq!(c.redraw_interval, 1);
    }

    #[test]
    fn test_backend_names() {
        assert_eq!(Backend::Grid.to_string(), "grid");
        assert_eq!(Backend::Vector.to_string(), "vector");
    }
}
