use crate::bus::{BusOutputs, Register};
use crate::decode::{Point, Primitive, X_BOUNDS, Y_BOUNDS};
use std::io;
use tui::backend::{Backend, CrosstermBackend};
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::text::Spans;
use tui::widgets::canvas::{Canvas, Line, Points};
use tui::widgets::{Block, Borders, Paragraph};
use tui::Terminal;

/// Display is what the simulator draws on. The decoder feeds it primitives as
/// they light up and tells it when a frame is complete; the simulator hands it
/// the bus status every so often. Implementations only draw, they never
/// decode.
pub trait Display {
    /// a decimal point lit in the frame being built
    fn draw_point(&mut self, p: Point) -> Result<(), io::Error>;

    /// a segment lit in the frame being built
    fn draw_line(&mut self, from: Point, to: Point) -> Result<(), io::Error>;

    /// the frame being built is complete; show it and start a new one
    fn swap_frame(&mut self) -> Result<(), io::Error>;

    /// show the state of the machine after a tick
    fn present(&mut self, frame: &Frame) -> Result<(), io::Error>;
}

/// everything a display might want to show after a tick
pub struct Frame<'a> {
    pub tick: u64,
    pub outputs: &'a BusOutputs,
    pub display_select: u8,
    /// "key press: ..." while a key is held, or the last unknown key
    pub key_label: Option<&'a str>,
}

/// width of the left-hand status column in the grid view
const GRID_COLUMN: u16 = 30;

/// row the right-hand status column starts on
const GRID_RIGHT_TOP: usize = 9;

/// a register as the calculator shows it: 13 digits most significant first,
/// a point after digit `display_select`, then the sign
pub fn format_register(reg: &Register, display_select: u8) -> String {
    let mut s = String::with_capacity(16);
    for i in (2..=15).rev() {
        if i < 15 {
            s.push_str(&format!("{:x}", reg[i] & 0x0f));
        }
        if display_select as usize + 2 == i {
            s.push('.');
        }
    }
    s.push(if reg[1] != 0 { '-' } else { ' ' });
    s
}

fn flag(on: bool, label: &str) -> String {
    if on {
        label.to_string()
    } else {
        String::new()
    }
}

/// text for the grid view; left column from row 0, right column from row 0
/// too but padded down to `GRID_RIGHT_TOP`
pub fn grid_lines(frame: &Frame) -> (Vec<String>, Vec<String>) {
    let o = frame.outputs;
    let f = &o.flags;
    let dp = frame.display_select;

    let mut left: Vec<String> = o
        .display_rows()
        .iter()
        .map(|r| format_register(r, dp))
        .collect();
    left.resize(8, String::new());
    left.push(frame.key_label.unwrap_or_default().to_string());
    left.push(String::new());
    left.extend([
        flag(o.kbd_lock, "LOCK"),
        flag(o.lamp_overflow, "OVERFLOW"),
        format!("sw_dp:     {}", dp),
        format!("kbd_ack:   {}", o.kbd_ack as u8),
        format!("timing:    {:04x}", o.timing),
        format!("phase:     {}", o.phase),
        format!("a_cnt:     {:x}", o.a_cnt),
        format!("b_cnt:     {:x}", o.b_cnt),
        format!("c_cnt:     {:x}", o.c_cnt),
        format!("d_cnt:     {:x}", o.d_cnt),
        format!("dp_cnt:    {:x}", o.dp_cnt),
        format!("start:     {:x}", f.start as u8),
        format!("home:      {:x}", f.home as u8),
        format!("shft_dwn:  {:x}", f.shift_down as u8),
    ]);

    let mut right = vec![String::new(); GRID_RIGHT_TOP];
    right.extend(
        [
            ("chg_sign", f.chg_sign),
            ("store", f.store),
            ("recall", f.recall),
            ("repeat", f.repeat),
            ("add_sub", f.add_sub),
            ("mult", f.mult),
            ("div", f.div),
            ("com_fun", f.com_fun),
            ("com_dig", f.com_dig),
            ("cfs", f.cfs),
            ("sign_cont", f.sign_cont),
            ("dps", f.dps),
            ("of", f.of),
            ("carry", f.carry),
            ("carry_of", f.carry_of),
        ]
        .iter()
        .map(|(name, on)| format!("{:<11}{:x}", format!("{}:", name), *on as u8)),
    );
    (left, right)
}

type TermBackend = CrosstermBackend<io::Stdout>;

fn open_terminal<B: Backend>(backend: B) -> Result<Terminal<B>, io::Error> {
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

fn close_terminal<B: Backend>(terminal: &mut Terminal<B>) {
    if let Err(e) = terminal.show_cursor() {
        tracing::warn!(error = %e, "failed to restore cursor");
    }
}

/// register and status readout in a terminal, as text
pub struct GridDisplay<B: Backend> {
    terminal: Terminal<B>,
}

impl GridDisplay<TermBackend> {
    pub fn new() -> Result<Self, io::Error> {
        Self::with_backend(CrosstermBackend::new(io::stdout()))
    }
}

impl<B: Backend> GridDisplay<B> {
    pub fn with_backend(backend: B) -> Result<Self, io::Error> {
        Ok(GridDisplay {
            terminal: open_terminal(backend)?,
        })
    }
}

impl<B: Backend> Drop for GridDisplay<B> {
    fn drop(&mut self) {
        close_terminal(&mut self.terminal);
    }
}

impl<B: Backend> Display for GridDisplay<B> {
    // the grid view reads registers, not the tube face
    fn draw_point(&mut self, _p: Point) -> Result<(), io::Error> {
        Ok(())
    }

    fn draw_line(&mut self, _from: Point, _to: Point) -> Result<(), io::Error> {
        Ok(())
    }

    fn swap_frame(&mut self) -> Result<(), io::Error> {
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), io::Error> {
        let (left, right) = grid_lines(frame);
        self.terminal.draw(|f| {
            let size = f.size();
            let split = GRID_COLUMN.min(size.width);
            let left_area = Rect::new(size.x, size.y, split, size.height);
            let right_area =
                Rect::new(size.x + split, size.y, size.width - split, size.height);
            let to_spans =
                |lines: &[String]| lines.iter().cloned().map(Spans::from).collect::<Vec<_>>();
            f.render_widget(Paragraph::new(to_spans(&left[..])), left_area);
            f.render_widget(Paragraph::new(to_spans(&right[..])), right_area);
        })?;
        Ok(())
    }
}

/// the tube face, drawn on a TUI canvas with braille dots
pub struct VectorDisplay<B: Backend> {
    terminal: Terminal<B>,
    back: Vec<Primitive>,
    front: Vec<Primitive>,
    label: String,
}

impl VectorDisplay<TermBackend> {
    pub fn new() -> Result<Self, io::Error> {
        Self::with_backend(CrosstermBackend::new(io::stdout()))
    }
}

impl<B: Backend> VectorDisplay<B> {
    pub fn with_backend(backend: B) -> Result<Self, io::Error> {
        Ok(VectorDisplay {
            terminal: open_terminal(backend)?,
            back: Vec::new(),
            front: Vec::new(),
            label: String::new(),
        })
    }

    fn redraw(&mut self) -> Result<(), io::Error> {
        let points = self
            .front
            .iter()
            .filter_map(|p| match p {
                Primitive::Point(p) => Some((p.x, p.y)),
                Primitive::Line(..) => None,
            })
            .collect::<Vec<_>>();
        let lines = self
            .front
            .iter()
            .filter_map(|p| match p {
                Primitive::Line(a, b) => Some(Line {
                    x1: a.x,
                    y1: a.y,
                    x2: b.x,
                    y2: b.y,
                    color: Color::Green,
                }),
                Primitive::Point(_) => None,
            })
            .collect::<Vec<_>>();
        let title = if self.label.is_empty() {
            "Friden EC-130".to_string()
        } else {
            format!("Friden EC-130 - {}", self.label)
        };

        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title.clone())
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(X_BOUNDS)
                .y_bounds(Y_BOUNDS)
                .marker(Marker::Braille)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &points,
                        color: Color::Green,
                    });
                    for line in &lines {
                        ctx.draw(line);
                    }
                });
            f.render_widget(canvas, f.size());
        })?;
        Ok(())
    }
}

impl<B: Backend> Drop for VectorDisplay<B> {
    fn drop(&mut self) {
        close_terminal(&mut self.terminal);
    }
}

impl<B: Backend> Display for VectorDisplay<B> {
    fn draw_point(&mut self, p: Point) -> Result<(), io::Error> {
        self.back.push(Primitive::Point(p));
        Ok(())
    }

    fn draw_line(&mut self, from: Point, to: Point) -> Result<(), io::Error> {
        self.back.push(Primitive::Line(from, to));
        Ok(())
    }

    fn swap_frame(&mut self) -> Result<(), io::Error> {
        self.front = std::mem::take(&mut self.back);
        self.redraw()
    }

    // the canvas is redrawn on swap; only the title follows the tick
    fn present(&mut self, frame: &Frame) -> Result<(), io::Error> {
        self.label.clear();
        self.label.push_str(frame.key_label.unwrap_or_default());
        Ok(())
    }
}

/// one call made on a `DummyDisplay`
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DrawCall {
    Point(Point),
    Line(Point, Point),
    Swap,
    Present { tick: u64 },
}

/// useful for testing non-display routines; remembers what it was asked to do
pub struct DummyDisplay {
    pub calls: Vec<DrawCall>,
    pub last_label: Option<String>,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay {
            calls: Vec::new(),
            last_label: None,
        }
    }

    pub fn presents(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Present { .. }))
            .count()
    }
}

impl Default for DummyDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DummyDisplay {
    fn draw_point(&mut self, p: Point) -> Result<(), io::Error> {
        self.calls.push(DrawCall::Point(p));
        Ok(())
    }

    fn draw_line(&mut self, from: Point, to: Point) -> Result<(), io::Error> {
        self.calls.push(DrawCall::Line(from, to));
        Ok(())
    }

    fn swap_frame(&mut self) -> Result<(), io::Error> {
        self.calls.push(DrawCall::Swap);
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), io::Error> {
        self.calls.push(DrawCall::Present { tick: frame.tick });
        self.last_label = frame.key_label.map(str::to_string);
        Ok(())
    }
}
