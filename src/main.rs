use clap::Parser;
use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ec130::config::{Backend, Config};
use ec130::debounce::{DEFAULT_DISPLAY_SELECT, HOLD_TICKS};
use ec130::display::{Display, GridDisplay, VectorDisplay};
use ec130::input::StdinInput;
use ec130::logic::TestCardCore;
use ec130::simulator::Simulator;
use ec130::trace::VcdTrace;

/// Friden EC-130 simulator front end
#[derive(Parser, Debug)]
#[command(name = "ec130", version, about, long_about = None)]
struct Args {
    /// Display to run
    #[arg(short, long, value_enum, default_value_t = Backend::Grid)]
    backend: Backend,

    /// Ticks a key stays down after it's pressed
    #[arg(long, default_value_t = HOLD_TICKS, value_parser = clap::value_parser!(u64).range(1..))]
    hold_ticks: u64,

    /// Decimal point switch position at power on (0-13)
    #[arg(long, default_value_t = DEFAULT_DISPLAY_SELECT, value_parser = clap::value_parser!(u8).range(0..=13))]
    display_select: u8,

    /// Write a VCD waveform of the bus to this file
    #[arg(long, value_name = "PATH")]
    trace: Option<PathBuf>,

    /// Ticks per second (default: as fast as possible)
    #[arg(long, value_parser = parse_tick_rate)]
    tick_rate: Option<f64>,

    /// Ticks between redraws of the register view
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    redraw_interval: u64,

    /// Log to this file (the terminal belongs to the display)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Log filter, e.g. `info` or `ec130=debug`
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// slowest pace we'll keep: one tick a day
const MIN_TICK_RATE: f64 = 1.0 / 86_400.0;

fn parse_tick_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if rate.is_finite() && rate >= MIN_TICK_RATE {
        Ok(rate)
    } else {
        Err(format!("must be a number of ticks per second, at least {:e}", MIN_TICK_RATE))
    }
}

fn init_logging(path: &Path, level: &str) -> Result<(), Box<dyn Error>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(level)?)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn open_display(backend: Backend) -> ec130::Result<Box<dyn Display>> {
    let display: Result<Box<dyn Display>, _> = match backend {
        Backend::Grid => GridDisplay::new().map(|d| Box::new(d) as Box<dyn Display>),
        Backend::Vector => VectorDisplay::new().map(|d| Box::new(d) as Box<dyn Display>),
    };
    display.map_err(|source| ec130::Error::DisplayInit { backend, source })
}

/// everything terminal-related is dropped, and the terminal restored, on return
fn run(config: &Config) -> ec130::Result<u64> {
    let mut trace = match &config.trace {
        Some(path) => {
            let file = File::create(path).map_err(|source| ec130::Error::TraceOpen {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "tracing to file");
            Some(VcdTrace::new(BufWriter::new(file)))
        }
        None => None,
    };

    let mut input = StdinInput::new().map_err(|source| ec130::Error::DisplayInit {
        backend: config.backend,
        source,
    })?;
    let mut display = open_display(config.backend)?;
    let mut core = TestCardCore::new();

    let mut sim = Simulator::new(&mut core, display.as_mut(), &mut input, config);
    if let Some(t) = trace.as_mut() {
        sim = sim.with_trace(t);
    }
    let ticks = sim.main_loop(None)?;
    Ok(ticks)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path, &args.log_level)?;
    }

    let config = Config {
        backend: args.backend,
        hold_ticks: args.hold_ticks,
        display_select: args.display_select,
        trace: args.trace,
        tick_rate: args.tick_rate,
        redraw_interval: args.redraw_interval,
    };
    info!(?config, "starting simulation");

    let ticks = run(&config)?;

    info!(ticks, "exiting");
    println!("\nexiting...");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_rate_bounds() {
        assert_eq!(parse_tick_rate("1000"), Ok(1000.0));
        assert!(parse_tick_rate("1e-20").is_err());
        assert!(parse_tick_rate("0").is_err());
        assert!(parse_tick_rate("-5").is_err());
        assert!(parse_tick_rate("inf").is_err());
        assert!(parse_tick_rate("NaN").is_err());
        assert!(parse_tick_rate("fast").is_err());
    }

    #[test]
    fn test_args_reject_tiny_tick_rate() {
        assert!(Args::try_parse_from(["ec130", "--tick-rate", "1e-20"]).is_err());
        let args = Args::try_parse_from(["ec130", "--tick-rate", "60"]).expect("valid rate");
        assert_eq!(args.tick_rate, Some(60.0));
    }
}
