//! # scan display decoder
//!
//! The core paints its display the way the real CRT did: one segment at a
//! time, each visible only while it is being sampled, with an erase pulse at
//! the start of every frame. The decoder collects those pulses into a buffer
//! that holds everything lit since the last erase, so a renderer can show a
//! steady picture.
//!
//! Geometry is in display units, origin at the bottom left of the rightmost
//! digit of the bottom row, y up. Digits are slanted like the real tube face.

use crate::bus::ScanOutputs;
use crate::display::Display;
use std::collections::BTreeMap;
use std::io;
use tracing::{trace, warn};

// vertical dot positions, bottom to top
const V_LUT: [f64; 3] = [0.0, 1.0, 2.0];
// horizontal dot positions, left to right
const H_LUT: [f64; 3] = [-0.2, 0.0, 1.0];

const V_SCALE: f64 = 6.0;
const H_SCALE: f64 = 6.0;
const SLANT_FACTOR: f64 = 0.2;

const H_SPACING: f64 = 9.0;
const V_SPACING: f64 = 18.0;

// row staggering
const SHIFT_1: f64 = 0.3 * H_SPACING;
const SHIFT_7: f64 = -0.1 * H_SPACING;

/// `seg_len` units per digit cell height
const SEG_LEN_UNITS: f64 = 48.0;

/// rightmost digit position
const LAST_DIGIT: u8 = 13;

/// area the display occupies, for renderers that need bounds
pub const X_BOUNDS: [f64; 2] = [-15.0, 145.0];
pub const Y_BOUNDS: [f64; 2] = [-8.0, 72.0];

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// something lit on the display
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Primitive {
    Point(Point),
    Line(Point, Point),
}

/// which segment of a digit cell a pulse lit, shifts included since they
/// move it on screen
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId {
    pub row: u8,
    pub v_dot: u8,
    pub h_dot: u8,
    pub vertical: bool,
    pub len: u8,
    pub shift1: bool,
    pub shift7: bool,
}

/// digit position plus the segment within it
pub type SegmentKey = (u8, SegmentId);

/// everything lit during one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplayBuffer {
    lit: BTreeMap<SegmentKey, Primitive>,
}

impl DisplayBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// record a lit primitive; returns false if it was already there
    pub fn insert(&mut self, key: SegmentKey, p: Primitive) -> bool {
        self.lit.insert(key, p).is_none()
    }

    pub fn clear(&mut self) {
        self.lit.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lit.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lit.len()
    }

    /// lit entries for one digit position
    pub fn digit(&self, position: u8) -> impl Iterator<Item = (&SegmentId, &Primitive)> + '_ {
        self.lit
            .iter()
            .filter(move |((d, _), _)| *d == position)
            .map(|((_, s), p)| (s, p))
    }
}

/// where a scan pulse lands on screen; None if the dot indices are off the
/// lookup tables
pub fn segment_geometry(scan: &ScanOutputs) -> Option<Primitive> {
    let v = *V_LUT.get(scan.v_dot as usize)?;
    let h = *H_LUT.get(scan.h_dot as usize)?;
    let digit = LAST_DIGIT.checked_sub(scan.h_staircase)?;

    let v_off = scan.v_staircase as f64 * V_SPACING;
    let h_off = scan.shift1 as u8 as f64 * SHIFT_1
        + scan.shift7 as u8 as f64 * SHIFT_7
        + digit as f64 * H_SPACING;

    let at = |h: f64, v: f64| Point {
        x: h_off + h * H_SCALE + SLANT_FACTOR * v * V_SCALE,
        y: v_off + v * V_SCALE,
    };

    let start = at(h, v);
    if scan.seg_len == 0 {
        return Some(Primitive::Point(start));
    }
    let len = scan.seg_len as f64 / SEG_LEN_UNITS;
    let end = if scan.v_seg {
        at(h, v - len)
    } else {
        at(h - len, v)
    };
    Some(Primitive::Line(start, end))
}

fn segment_key(scan: &ScanOutputs) -> SegmentKey {
    (
        scan.h_staircase,
        SegmentId {
            row: scan.v_staircase,
            v_dot: scan.v_dot,
            h_dot: scan.h_dot,
            vertical: scan.v_seg,
            len: scan.seg_len,
            shift1: scan.shift1,
            shift7: scan.shift7,
        },
    )
}

/// Builds frames out of scan pulses.
///
/// `accumulating` fills up between erases; on erase it becomes `visible` and
/// the renderer is told to swap. An erase held high over several
/// observations counts once.
pub struct ScanDisplayDecoder {
    accumulating: DisplayBuffer,
    visible: DisplayBuffer,
    erase_active: bool,
    frames: u64,
}

impl ScanDisplayDecoder {
    pub fn new() -> Self {
        ScanDisplayDecoder {
            accumulating: DisplayBuffer::new(),
            visible: DisplayBuffer::new(),
            erase_active: false,
            frames: 0,
        }
    }

    /// look at the scan lines after one clock phase
    pub fn observe(
        &mut self,
        scan: &ScanOutputs,
        display: &mut dyn Display,
    ) -> Result<(), io::Error> {
        if scan.erase {
            if !self.erase_active {
                self.erase_active = true;
                self.visible = std::mem::take(&mut self.accumulating);
                self.frames += 1;
                trace!(frame = self.frames, lit = self.visible.len(), "erase");
                display.swap_frame()?;
            }
            return Ok(());
        }
        self.erase_active = false;

        if !scan.seg_samp {
            return Ok(());
        }
        let primitive = match segment_geometry(scan) {
            Some(p) => p,
            None => {
                warn!(?scan, "scan pulse off the display, dropped");
                return Ok(());
            }
        };
        if self.accumulating.insert(segment_key(scan), primitive) {
            match primitive {
                Primitive::Point(p) => display.draw_point(p)?,
                Primitive::Line(a, b) => display.draw_line(a, b)?,
            }
        }
        Ok(())
    }

    /// what has been lit since the last erase
    pub fn buffer(&self) -> &DisplayBuffer {
        &self.accumulating
    }

    /// the last complete frame
    pub fn visible(&self) -> &DisplayBuffer {
        &self.visible
    }

    /// erases seen so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Default for ScanDisplayDecoder {
    fn default() -> Self {
        Self::new()
    }
}
