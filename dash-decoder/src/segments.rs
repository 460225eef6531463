//! 7-segment digit recognition
//!
//! Each digit slot is calibrated as one pixel per segment stroke. A digit is
//! read by collecting the set of lit strokes and looking that exact set up in
//! the table of the ten canonical patterns. There is no nearest-match logic:
//! anything that is not an exact pattern resolves to 0.

use crate::types::{PixelSource, Point, RawReadout, READOUT_DIGITS};
use std::fmt;

/// One stroke of a 7-segment digit
///
/// ```text
///  aaa
/// f   b
///  ggg
/// e   c
///  ddd
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl Segment {
    pub const ALL: [Segment; 7] = [
        Segment::A,
        Segment::B,
        Segment::C,
        Segment::D,
        Segment::E,
        Segment::F,
        Segment::G,
    ];

    /// Lowercase calibration label (`a`..`g`)
    pub fn label(self) -> char {
        match self {
            Segment::A => 'a',
            Segment::B => 'b',
            Segment::C => 'c',
            Segment::D => 'd',
            Segment::E => 'e',
            Segment::F => 'f',
            Segment::G => 'g',
        }
    }

    /// Parse a calibration label, case-insensitive
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "a" => Some(Segment::A),
            "b" => Some(Segment::B),
            "c" => Some(Segment::C),
            "d" => Some(Segment::D),
            "e" => Some(Segment::E),
            "f" => Some(Segment::F),
            "g" => Some(Segment::G),
            _ => None,
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// A set of segments, stored as a 7-bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SegmentSet(u8);

impl SegmentSet {
    pub const EMPTY: SegmentSet = SegmentSet(0);

    /// Const constructor used to build the digit table
    pub const fn of(segments: &[Segment]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < segments.len() {
            bits |= segments[i].bit();
            i += 1;
        }
        SegmentSet(bits)
    }

    pub fn insert(&mut self, segment: Segment) {
        self.0 |= segment.bit();
    }

    pub fn contains(&self, segment: Segment) -> bool {
        self.0 & segment.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Segment> + '_ {
        Segment::ALL.into_iter().filter(|s| self.contains(*s))
    }
}

impl FromIterator<Segment> for SegmentSet {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        let mut set = SegmentSet::EMPTY;
        for segment in iter {
            set.insert(segment);
        }
        set
    }
}

impl fmt::Display for SegmentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        for segment in self.iter() {
            write!(f, "{}", segment.label())?;
        }
        Ok(())
    }
}

/// Canonical lit patterns, indexed by digit value
const DIGIT_PATTERNS: [SegmentSet; 10] = {
    use Segment::*;
    [
        SegmentSet::of(&[A, B, C, D, E, F]),
        SegmentSet::of(&[B, C]),
        SegmentSet::of(&[A, B, D, E, G]),
        SegmentSet::of(&[A, B, C, D, G]),
        SegmentSet::of(&[B, C, F, G]),
        SegmentSet::of(&[A, C, D, F, G]),
        SegmentSet::of(&[A, C, D, E, F, G]),
        SegmentSet::of(&[A, B, C]),
        SegmentSet::of(&[A, B, C, D, E, F, G]),
        SegmentSet::of(&[A, B, C, D, F, G]),
    ]
};

/// Pixel coordinate of every stroke of one digit slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentMap {
    points: [Point; 7],
}

impl SegmentMap {
    /// Create a map from coordinates in `a`..`g` order
    pub fn new(points: [Point; 7]) -> Self {
        Self { points }
    }

    /// Coordinate of one stroke
    pub fn point(&self, segment: Segment) -> Point {
        self.points[segment as usize]
    }

    /// All strokes with their coordinates, in `a`..`g` order
    pub fn iter(&self) -> impl Iterator<Item = (Segment, Point)> + '_ {
        Segment::ALL.into_iter().zip(self.points.iter().copied())
    }

    /// A map with the standard stroke layout anchored at `origin`
    ///
    /// Strokes sit on a `width`×`2·width` cell; handy for synthetic frames.
    pub fn grid(origin: Point, width: u32) -> Self {
        let Point { x, y } = origin;
        let half = width / 2;
        Self::new([
            Point::new(x + half, y),
            Point::new(x + width, y + half),
            Point::new(x + width, y + width + half),
            Point::new(x + half, y + 2 * width),
            Point::new(x, y + width + half),
            Point::new(x, y + half),
            Point::new(x + half, y + width),
        ])
    }
}

/// Reads digits from calibrated segment maps
#[derive(Debug, Clone, Copy)]
pub struct SegmentDecoder {
    threshold: u8,
}

impl SegmentDecoder {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// The lit pattern for `digit`, if it is a decimal digit
    pub fn pattern(digit: u8) -> Option<SegmentSet> {
        DIGIT_PATTERNS.get(usize::from(digit)).copied()
    }

    /// Exact lookup of a lit set in the digit table
    pub fn classify(lit: SegmentSet) -> Option<u8> {
        DIGIT_PATTERNS
            .iter()
            .position(|pattern| *pattern == lit)
            .map(|digit| digit as u8)
    }

    /// Collect the strokes of one slot that are lit in `frame`
    pub fn lit_segments<P: PixelSource + ?Sized>(&self, frame: &P, map: &SegmentMap) -> SegmentSet {
        map.iter()
            .filter(|(_, point)| frame.is_lit(*point, self.threshold))
            .map(|(segment, _)| segment)
            .collect()
    }

    /// Read one digit, `None` when the lit set is not a known pattern
    pub fn read_digit<P: PixelSource + ?Sized>(&self, frame: &P, map: &SegmentMap) -> Option<u8> {
        let lit = self.lit_segments(frame, map);
        let digit = Self::classify(lit);
        if digit.is_none() {
            log::trace!("Unrecognised segment pattern '{}'", lit);
        }
        digit
    }

    /// Read one digit, resolving unknown patterns to 0
    pub fn decode_digit<P: PixelSource + ?Sized>(&self, frame: &P, map: &SegmentMap) -> u8 {
        self.read_digit(frame, map).unwrap_or(0)
    }

    /// Read every slot of the layout in order
    pub fn decode_readout<P: PixelSource + ?Sized>(
        &self,
        frame: &P,
        layout: &[SegmentMap; READOUT_DIGITS],
    ) -> RawReadout {
        let mut slots = [None; READOUT_DIGITS];
        for (slot, map) in slots.iter_mut().zip(layout.iter()) {
            *slot = self.read_digit(frame, map);
        }
        RawReadout::from_slots(slots)
    }
}
