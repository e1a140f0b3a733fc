//! # signal bus
//!
//! Everything the front end and the calculator core exchange during one clock
//! phase. The front end writes `inputs` before each evaluation and reads
//! `outputs` after it; the core does the opposite. There is no logic here.
//!
//! Register nibbles are stored least significant first, so `reg[1]` is the
//! sign digit and `reg[2..15]` hold the thirteen display digits.

/// number of key lines on the keyboard
pub const KEY_COUNT: usize = 23;

/// highest display-select switch position
pub const DISPLAY_SELECT_MAX: u8 = 13;

/// nibbles per register
pub const REGISTER_NIBBLES: usize = 16;

/// one key line on the calculator keyboard
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    Enter,
    ClearEntry,
    ClearAll,
    DecimalPoint,
    ChangeSign,
    Repeat,
    OverflowLock,
    Store,
    Recall,
    Multiply,
    Divide,
    Add,
    Subtract,
}

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::Digit0,
        Key::Digit1,
        Key::Digit2,
        Key::Digit3,
        Key::Digit4,
        Key::Digit5,
        Key::Digit6,
        Key::Digit7,
        Key::Digit8,
        Key::Digit9,
        Key::Enter,
        Key::ClearEntry,
        Key::ClearAll,
        Key::DecimalPoint,
        Key::ChangeSign,
        Key::Repeat,
        Key::OverflowLock,
        Key::Store,
        Key::Recall,
        Key::Multiply,
        Key::Divide,
        Key::Add,
        Key::Subtract,
    ];

    /// position of this key's line in `KeyLines`
    pub fn index(self) -> usize {
        self as usize
    }

    /// digit value for the ten number keys
    pub fn digit(self) -> Option<u8> {
        match self.index() {
            i @ 0..=9 => Some(i as u8),
            _ => None,
        }
    }

    /// text shown while the key is held
    pub fn label(self) -> &'static str {
        match self {
            Key::Digit0 => "0",
            Key::Digit1 => "1",
            Key::Digit2 => "2",
            Key::Digit3 => "3",
            Key::Digit4 => "4",
            Key::Digit5 => "5",
            Key::Digit6 => "6",
            Key::Digit7 => "7",
            Key::Digit8 => "8",
            Key::Digit9 => "9",
            Key::Enter => "ENTER",
            Key::ClearEntry => "CLEAR ENTRY",
            Key::ClearAll => "CLEAR ALL",
            Key::DecimalPoint => "DECIMAL POINT",
            Key::ChangeSign => "CHANGE SIGN",
            Key::Repeat => "REPEAT",
            Key::OverflowLock => "OVERFLOW LOCK",
            Key::Store => "STORE",
            Key::Recall => "RECALL",
            Key::Multiply => "MUL",
            Key::Divide => "DIV",
            Key::Add => "ADD",
            Key::Subtract => "SUB",
        }
    }

    /// signal name used in waveform traces
    pub fn signal_name(self) -> &'static str {
        match self {
            Key::Digit0 => "key_0",
            Key::Digit1 => "key_1",
            Key::Digit2 => "key_2",
            Key::Digit3 => "key_3",
            Key::Digit4 => "key_4",
            Key::Digit5 => "key_5",
            Key::Digit6 => "key_6",
            Key::Digit7 => "key_7",
            Key::Digit8 => "key_8",
            Key::Digit9 => "key_9",
            Key::Enter => "key_enter",
            Key::ClearEntry => "key_clr_ent",
            Key::ClearAll => "key_clr_all",
            Key::DecimalPoint => "key_dp",
            Key::ChangeSign => "key_chg_sign",
            Key::Repeat => "key_repeat",
            Key::OverflowLock => "key_of_lock",
            Key::Store => "key_store",
            Key::Recall => "key_recall",
            Key::Multiply => "key_mult",
            Key::Divide => "key_div",
            Key::Add => "key_add",
            Key::Subtract => "key_sub",
        }
    }
}

/// one boolean per key
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyLines([bool; KEY_COUNT]);

impl KeyLines {
    pub fn get(&self, key: Key) -> bool {
        self.0[key.index()]
    }

    pub fn set(&mut self, key: Key, level: bool) {
        self.0[key.index()] = level;
    }

    /// drop every line
    pub fn clear(&mut self) {
        self.0 = [false; KEY_COUNT];
    }

    /// keys whose lines are currently asserted
    pub fn held(&self) -> impl Iterator<Item = Key> + '_ {
        Key::ALL.iter().copied().filter(move |k| self.get(*k))
    }

    pub fn any(&self) -> bool {
        self.0.iter().any(|l| *l)
    }
}

/// lines driven by the front end
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BusInputs {
    pub keys: KeyLines,
    /// decimal point switch, 0..=13
    pub display_select: u8,
}

/// the scan-pulse fields of the display generator
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutputs {
    /// start of a new display frame
    pub erase: bool,
    /// a segment sample is valid this phase
    pub seg_samp: bool,
    pub v_staircase: u8,
    /// digit position, 0..=13
    pub h_staircase: u8,
    pub v_dot: u8,
    pub h_dot: u8,
    /// vertical segment when set, horizontal otherwise
    pub v_seg: bool,
    /// segment length in 1/48ths of a digit cell; 0 is a decimal point
    pub seg_len: u8,
    pub shift1: bool,
    pub shift7: bool,
}

/// the core's internal latches exposed for the status view
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LatchFlags {
    pub start: bool,
    pub home: bool,
    pub shift_down: bool,
    pub chg_sign: bool,
    pub store: bool,
    pub recall: bool,
    pub repeat: bool,
    pub add_sub: bool,
    pub mult: bool,
    pub div: bool,
    pub com_fun: bool,
    pub com_dig: bool,
    pub cfs: bool,
    pub sign_cont: bool,
    pub dps: bool,
    pub of: bool,
    pub carry: bool,
    pub carry_of: bool,
}

pub type Register = [u8; REGISTER_NIBBLES];

/// lines driven by the core
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BusOutputs {
    pub reg_s: Register,
    pub reg_0: Register,
    pub reg_1: Register,
    pub reg_2: Register,
    pub reg_3: Register,
    pub reg_4: Register,
    pub lamp_overflow: bool,
    pub kbd_lock: bool,
    pub kbd_ack: bool,
    pub timing: u16,
    pub phase: u8,
    pub a_cnt: u8,
    pub b_cnt: u8,
    pub c_cnt: u8,
    pub d_cnt: u8,
    pub dp_cnt: u8,
    pub flags: LatchFlags,
    pub scan: ScanOutputs,
}

impl BusOutputs {
    /// registers in the order they appear on the display, top row first
    pub fn display_rows(&self) -> [&Register; 6] {
        [
            &self.reg_4,
            &self.reg_3,
            &self.reg_2,
            &self.reg_1,
            &self.reg_0,
            &self.reg_s,
        ]
    }
}

/// the whole bus, owned by the controller for the duration of a tick
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalBus {
    pub clk: bool,
    pub inputs: BusInputs,
    pub outputs: BusOutputs,
}

/// a sampled signal value for waveform dumps
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub name: &'static str,
    pub width: u8,
    pub value: u64,
}

impl Sample {
    fn bit(name: &'static str, level: bool) -> Self {
        Sample {
            name,
            width: 1,
            value: level as u64,
        }
    }

    fn vector(name: &'static str, width: u8, value: u64) -> Self {
        Sample { name, width, value }
    }
}

/// pack a register into a 64 bit vector, nibble `i` at bits `4i..4i+3`
pub fn pack_register(reg: &Register) -> u64 {
    reg.iter()
        .enumerate()
        .fold(0, |acc, (i, n)| acc | (((*n & 0x0f) as u64) << (4 * i)))
}

impl SignalBus {
    /// every line on the bus, in a fixed order
    pub fn samples(&self) -> Vec<Sample> {
        let i = &self.inputs;
        let o = &self.outputs;
        let f = &o.flags;
        let s = &o.scan;
        let mut v = vec![Sample::bit("clk", self.clk)];
        v.extend(
            Key::ALL
                .iter()
                .map(|k| Sample::bit(k.signal_name(), i.keys.get(*k))),
        );
        v.extend([
            Sample::vector("sw_dp", 4, i.display_select as u64),
            Sample::vector("reg_s", 64, pack_register(&o.reg_s)),
            Sample::vector("reg_0", 64, pack_register(&o.reg_0)),
            Sample::vector("reg_1", 64, pack_register(&o.reg_1)),
            Sample::vector("reg_2", 64, pack_register(&o.reg_2)),
            Sample::vector("reg_3", 64, pack_register(&o.reg_3)),
            Sample::vector("reg_4", 64, pack_register(&o.reg_4)),
            Sample::bit("lamp_overflow", o.lamp_overflow),
            Sample::bit("kbd_lock", o.kbd_lock),
            Sample::bit("kbd_ack", o.kbd_ack),
            Sample::vector("timing", 16, o.timing as u64),
            Sample::vector("phase", 8, o.phase as u64),
            Sample::vector("a_cnt", 8, o.a_cnt as u64),
            Sample::vector("b_cnt", 8, o.b_cnt as u64),
            Sample::vector("c_cnt", 8, o.c_cnt as u64),
            Sample::vector("d_cnt", 8, o.d_cnt as u64),
            Sample::vector("dp_cnt", 8, o.dp_cnt as u64),
            Sample::bit("ff_start", f.start),
            Sample::bit("ff_home", f.home),
            Sample::bit("ff_shift_down", f.shift_down),
            Sample::bit("ff_chg_sign", f.chg_sign),
            Sample::bit("ff_store", f.store),
            Sample::bit("ff_recall", f.recall),
            Sample::bit("ff_repeat", f.repeat),
            Sample::bit("ff_add_sub", f.add_sub),
            Sample::bit("ff_mult", f.mult),
            Sample::bit("ff_div", f.div),
            Sample::bit("ff_com_fun", f.com_fun),
            Sample::bit("ff_com_dig", f.com_dig),
            Sample::bit("ff_cfs", f.cfs),
            Sample::bit("ff_sign_cont", f.sign_cont),
            Sample::bit("ff_dps", f.dps),
            Sample::bit("ff_of", f.of),
            Sample::bit("ff_carry", f.carry),
            Sample::bit("ff_carry_of", f.carry_of),
            Sample::bit("erase", s.erase),
            Sample::bit("seg_samp", s.seg_samp),
            Sample::vector("v_staircase", 8, s.v_staircase as u64),
            Sample::vector("h_staircase", 8, s.h_staircase as u64),
            Sample::vector("v_dot", 2, s.v_dot as u64),
            Sample::vector("h_dot", 2, s.h_dot as u64),
            Sample::bit("v_seg", s.v_seg),
            Sample::vector("seg_len", 8, s.seg_len as u64),
            Sample::bit("shift1", s.shift1),
            Sample::bit("shift7", s.shift7),
        ]);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_indices_cover_lines() {
        for (i, k) in Key::ALL.iter().enumerate() {
            assert_eq!(k.index(), i);
        }
    }

    #[test]
    fn test_digit_keys() {
        assert_eq!(Key::Digit7.digit(), Some(7));
        assert_eq!(Key::Enter.digit(), None);
    }

    #[test]
    fn test_key_lines_held() {
        let mut l = KeyLines::default();
        assert!(!l.any());
        l.set(Key::Store, true);
        assert_eq!(l.held().collect::<Vec<_>>(), vec![Key::Store]);
        l.clear();
        assert!(!l.any());
    }

    #[test]
    fn test_pack_register() {
        let mut r = [0u8; REGISTER_NIBBLES];
        r[0] = 0x1;
        r[15] = 0xf;
        assert_eq!(pack_register(&r), 0xf000_0000_0000_0001);
    }

    #[test]
    fn test_sample_names_unique() {
        let b = SignalBus::default();
        let s = b.samples();
        let mut names = s.iter().map(|s| s.name).collect::<Vec<_>>();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), s.len());
    }
}
