//! Waveform dumps of the signal bus, in VCD format.

use crate::bus::{Sample, SignalBus};
use std::collections::HashMap;
use std::io::{self, Write};

/// receives the bus state at each clock phase
pub trait TraceSink {
    /// record the bus at sample index `time` (`10*tick + 5*phase`). Called
    /// after the core has evaluated that phase, so the sample holds its result.
    fn dump(&mut self, bus: &SignalBus, time: u64) -> Result<(), io::Error>;

    /// flush and let go of whatever we're writing to
    fn close(&mut self) -> Result<(), io::Error>;
}

/// sample index for a clock phase of a tick
pub fn sample_index(tick: u64, phase: u8) -> u64 {
    10 * tick + 5 * phase as u64
}

/// VCD identifiers are short printable strings; this makes the n'th one
fn identifier(mut n: usize) -> String {
    const FIRST: u8 = b'!';
    const RANGE: usize = (b'~' - b'!' + 1) as usize;
    let mut id = String::new();
    loop {
        id.push((FIRST + (n % RANGE) as u8) as char);
        n /= RANGE;
        if n == 0 {
            return id;
        }
        n -= 1;
    }
}

fn value_change(sample: &Sample, id: &str) -> String {
    if sample.width == 1 {
        format!("{}{}", sample.value & 1, id)
    } else {
        format!("b{:b} {}", sample.value, id)
    }
}

/// writes a value change dump to any writer, header on the first sample
pub struct VcdTrace<W: Write> {
    out: W,
    ids: HashMap<&'static str, String>,
    last: HashMap<&'static str, u64>,
    started: bool,
    closed: bool,
}

impl<W: Write> VcdTrace<W> {
    pub fn new(out: W) -> Self {
        VcdTrace {
            out,
            ids: HashMap::new(),
            last: HashMap::new(),
            started: false,
            closed: false,
        }
    }

    fn header(&mut self, samples: &[Sample]) -> Result<(), io::Error> {
        writeln!(self.out, "$version ec130 {} $end", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.out, "$timescale 1ns $end")?;
        writeln!(self.out, "$scope module top $end")?;
        for (n, s) in samples.iter().enumerate() {
            let id = identifier(n);
            writeln!(self.out, "$var wire {} {} {} $end", s.width, id, s.name)?;
            self.ids.insert(s.name, id);
        }
        writeln!(self.out, "$upscope $end")?;
        writeln!(self.out, "$enddefinitions $end")?;
        Ok(())
    }

    /// hand back the writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for VcdTrace<W> {
    fn dump(&mut self, bus: &SignalBus, time: u64) -> Result<(), io::Error> {
        if self.closed {
            return Ok(());
        }
        let samples = bus.samples();
        if !self.started {
            self.header(&samples)?;
            self.started = true;
        }
        let changed = samples
            .iter()
            .filter(|s| self.last.get(s.name) != Some(&s.value))
            .collect::<Vec<_>>();
        if changed.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "#{}", time)?;
        for s in changed {
            let id = match self.ids.get(s.name) {
                Some(id) => id,
                None => continue,
            };
            writeln!(self.out, "{}", value_change(s, id))?;
            self.last.insert(s.name, s.value);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), io::Error> {
        self.closed = true;
        self.out.flush()
    }
}

/// keeps every dump in memory, for tests
#[derive(Default)]
pub struct MemoryTrace {
    pub times: Vec<u64>,
    pub clocks: Vec<bool>,
    pub timings: Vec<u16>,
    pub closed: bool,
}

impl TraceSink for MemoryTrace {
    fn dump(&mut self, bus: &SignalBus, time: u64) -> Result<(), io::Error> {
        self.times.push(time);
        self.clocks.push(bus.clk);
        self.timings.push(bus.outputs.timing);
        Ok(())
    }

    fn close(&mut self) -> Result<(), io::Error> {
        self.closed = true;
        Ok(())
    }
}
