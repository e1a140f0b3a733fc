use crate::bus::Key;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::Duration;
use tracing::{trace, warn};

/// printable characters on the host keyboard and the calculator key they press
const EC130_KEYMAP: [(char, Key); 21] = [
    ('0', Key::Digit0),
    ('1', Key::Digit1),
    ('2', Key::Digit2),
    ('3', Key::Digit3),
    ('4', Key::Digit4),
    ('5', Key::Digit5),
    ('6', Key::Digit6),
    ('7', Key::Digit7),
    ('8', Key::Digit8),
    ('9', Key::Digit9),
    ('c', Key::ClearAll),
    ('.', Key::DecimalPoint),
    ('s', Key::ChangeSign),
    ('r', Key::Repeat),
    ('o', Key::OverflowLock),
    ('t', Key::Store),
    ('e', Key::Recall),
    ('*', Key::Multiply),
    ('/', Key::Divide),
    ('+', Key::Add),
    ('-', Key::Subtract),
];

/// one thing the user did at the keyboard
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// a calculator key, to be held on its line for a while
    Press(Key),
    /// move the decimal point switch one place left
    DisplaySelectUp,
    /// ... or right
    DisplaySelectDown,
    Quit,
    /// anything we couldn't map; carries the raw code for the diagnostic label
    Unknown(u32),
}

/// reads keypresses without ever blocking the simulation
pub trait Input {
    /// the next pending event, if there is one
    fn poll_event(&mut self) -> Result<Option<InputEvent>, io::Error>;
}

/// map a host key code to what the calculator would see
pub fn map_key(code: KeyCode, keymap: &HashMap<char, Key>) -> InputEvent {
    match code {
        KeyCode::Char('q') => InputEvent::Quit,
        KeyCode::Char('\r') | KeyCode::Char('\n') | KeyCode::Enter => {
            InputEvent::Press(Key::Enter)
        }
        KeyCode::Backspace | KeyCode::Delete => InputEvent::Press(Key::ClearEntry),
        KeyCode::Up => InputEvent::DisplaySelectUp,
        KeyCode::Down => InputEvent::DisplaySelectDown,
        KeyCode::Char(c) => match keymap.get(&c) {
            Some(key) => InputEvent::Press(*key),
            None => InputEvent::Unknown(c as u32),
        },
        KeyCode::F(n) => InputEvent::Unknown(0x100 + n as u32),
        _ => InputEvent::Unknown(0),
    }
}

/// keyboard input from the controlling terminal, in raw mode
pub struct StdinInput {
    keymap: HashMap<char, Key>,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(EC130_KEYMAP),
        })
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "failed to leave raw mode");
        }
    }
}

impl Input for StdinInput {
    fn poll_event(&mut self) -> Result<Option<InputEvent>, io::Error> {
        while poll(Duration::from_millis(0))? {
            match read()? {
                Event::Key(evt) => {
                    // raw mode swallows the usual ^C handling
                    if evt.code == KeyCode::Char('c')
                        && evt.modifiers.contains(KeyModifiers::CONTROL)
                    {
                        return Ok(Some(InputEvent::Quit));
                    }
                    return Ok(Some(map_key(evt.code, &self.keymap)));
                }
                other => trace!(event = ?other, "ignoring terminal event"),
            }
        }
        Ok(None)
    }
}

/// dummy Input implementation for testing; hands out one event per poll
pub struct DummyInput {
    events: VecDeque<Option<InputEvent>>,
}

impl DummyInput {
    pub fn new(events: &[InputEvent]) -> Self {
        DummyInput {
            events: events.iter().copied().map(Some).collect(),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(Some(event));
    }

    /// nothing pressed for the next `polls` polls
    pub fn wait(&mut self, polls: usize) {
        self.events.extend(std::iter::repeat(None).take(polls));
    }
}

impl Input for DummyInput {
    fn poll_event(&mut self) -> Result<Option<InputEvent>, io::Error> {
        Ok(self.events.pop_front().flatten())
    }
}
