//! Two-phase clocking of the core.
//!
//! The core's flip-flops act on clock edges, so every tick it must see the
//! clock low and then high, in that order, with the inputs already on the bus.

use crate::bus::{BusInputs, SignalBus};
use crate::decode::ScanDisplayDecoder;
use crate::display::Display;
use crate::logic::Core;
use crate::trace::{sample_index, TraceSink};
use std::io;

pub struct ClockSequencer<'a> {
    core: &'a mut dyn Core,
    trace: Option<&'a mut dyn TraceSink>,
}

impl<'a> ClockSequencer<'a> {
    pub fn new(core: &'a mut dyn Core) -> Self {
        ClockSequencer { core, trace: None }
    }

    /// record every phase into `trace` from now on
    pub fn with_trace(mut self, trace: &'a mut dyn TraceSink) -> Self {
        self.trace = Some(trace);
        self
    }

    /// run one full clock cycle: inputs on the bus, evaluate at clock 0 and
    /// clock 1, and let the decoder see the scan lines after each
    pub fn tick(
        &mut self,
        tick: u64,
        inputs: &BusInputs,
        bus: &mut SignalBus,
        decoder: &mut ScanDisplayDecoder,
        display: &mut dyn Display,
    ) -> Result<(), io::Error> {
        bus.inputs = *inputs;
        for phase in 0..2u8 {
            bus.clk = phase == 1;
            self.core.eval(bus);
            if let Some(trace) = self.trace.as_mut() {
                trace.dump(bus, sample_index(tick, phase))?;
            }
            decoder.observe(&bus.outputs.scan, display)?;
        }
        Ok(())
    }

    /// let the core tidy up and close the trace, if there is one
    pub fn shutdown(&mut self) -> Result<(), io::Error> {
        if let Some(trace) = self.trace.as_mut() {
            trace.close()?;
        }
        self.core.finalize();
        Ok(())
    }
}
