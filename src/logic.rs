//! The calculator core, seen from outside.
//!
//! The real core is a synchronous logic model that lives outside this crate;
//! all the front end knows is that it reads the bus inputs and the clock,
//! and drives the bus outputs, each time it is evaluated. Two stand-ins are
//! provided: a test card that exercises the whole display, and a scripted
//! core for tests.

use crate::bus::{BusInputs, Key, ScanOutputs, SignalBus};

/// a clocked core evaluated once per clock phase
pub trait Core {
    /// settle the core's logic against the current bus state
    fn eval(&mut self, bus: &mut SignalBus);

    /// last chance to tidy up before the process exits
    fn finalize(&mut self) {}
}

/// full segment length, in the units of `ScanOutputs::seg_len`
const FULL_SEGMENT: u8 = 48;

/// strokes of an `8.`: (v_dot, h_dot, vertical, seg_len)
const FIGURE_EIGHT: [(u8, u8, bool, u8); 8] = [
    (2, 2, false, FULL_SEGMENT), // top
    (2, 2, true, FULL_SEGMENT),  // upper right
    (2, 1, true, FULL_SEGMENT),  // upper left
    (1, 2, false, FULL_SEGMENT), // middle
    (1, 2, true, FULL_SEGMENT),  // lower right
    (1, 1, true, FULL_SEGMENT),  // lower left
    (0, 2, false, FULL_SEGMENT), // bottom
    (0, 0, false, 0),            // decimal point
];

const TEST_CARD_DIGITS: usize = 14;
const TEST_CARD_ROWS: usize = 4;

/// pulses in one test card frame
pub const TEST_CARD_PULSES: usize = TEST_CARD_DIGITS * TEST_CARD_ROWS * FIGURE_EIGHT.len();

/// A deterministic stand-in for the calculator core.
///
/// Scans an `8.` into every digit position of four display rows, one segment
/// per clock cycle, with an erase cycle between frames. It also acknowledges
/// held keys, shifts digit keys into register S, clears on CLEAR ALL and
/// counts clock cycles on `timing`.
pub struct TestCardCore {
    step: usize,
    last_clk: bool,
    last_keys: BusInputs,
}

impl TestCardCore {
    pub fn new() -> Self {
        TestCardCore {
            step: 0,
            last_clk: false,
            last_keys: BusInputs::default(),
        }
    }

    fn scan_for(step: usize) -> ScanOutputs {
        if step == 0 {
            return ScanOutputs {
                erase: true,
                ..ScanOutputs::default()
            };
        }
        let k = step - 1;
        let (v_dot, h_dot, v_seg, seg_len) = FIGURE_EIGHT[k % FIGURE_EIGHT.len()];
        let cell = k / FIGURE_EIGHT.len();
        ScanOutputs {
            erase: false,
            seg_samp: true,
            v_staircase: (cell / TEST_CARD_DIGITS) as u8,
            h_staircase: (cell % TEST_CARD_DIGITS) as u8,
            v_dot,
            h_dot,
            v_seg,
            seg_len,
            shift1: false,
            shift7: false,
        }
    }

    fn rising_edge(&mut self, bus: &mut SignalBus) {
        let out = &mut bus.outputs;
        self.step = (self.step + 1) % (TEST_CARD_PULSES + 1);
        out.timing = out.timing.wrapping_add(1);

        let newly_held = bus
            .inputs
            .keys
            .held()
            .find(|k| !self.last_keys.keys.get(*k));
        match newly_held {
            Some(Key::ClearAll) => {
                out.reg_s = [0; 16];
            }
            Some(k) => {
                if let Some(d) = k.digit() {
                    out.reg_s.copy_within(2..14, 3);
                    out.reg_s[2] = d;
                }
            }
            None => {}
        }
        self.last_keys = bus.inputs;
    }
}

impl Default for TestCardCore {
    fn default() -> Self {
        Self::new()
    }
}

impl Core for TestCardCore {
    fn eval(&mut self, bus: &mut SignalBus) {
        if bus.clk && !self.last_clk {
            self.rising_edge(bus);
        }
        self.last_clk = bus.clk;

        let out = &mut bus.outputs;
        out.phase = bus.clk as u8;
        out.kbd_ack = bus.inputs.keys.any();
        out.dp_cnt = bus.inputs.display_select;
        out.scan = Self::scan_for(self.step);
    }
}

/// Plays back a fixed list of scan outputs, one entry per clock cycle, and
/// remembers what it was shown. Both phases of cycle `n` see entry `n`; past
/// the end of the script the scan lines are idle.
pub struct ScriptedCore {
    script: Vec<ScanOutputs>,
    cycle: usize,
    last_clk: bool,
    /// (clk, inputs) at every evaluation
    pub seen: Vec<(bool, BusInputs)>,
    pub finalized: bool,
}

impl ScriptedCore {
    pub fn new(script: &[ScanOutputs]) -> Self {
        ScriptedCore {
            script: Vec::from(script),
            cycle: 0,
            last_clk: false,
            seen: Vec::new(),
            finalized: false,
        }
    }
}

impl Core for ScriptedCore {
    fn eval(&mut self, bus: &mut SignalBus) {
        // the falling edge starts the next cycle
        if !bus.clk && self.last_clk {
            self.cycle += 1;
        }
        self.last_clk = bus.clk;
        self.seen.push((bus.clk, bus.inputs));
        bus.outputs.scan = self.script.get(self.cycle).copied().unwrap_or_default();
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }
}
