//! Anchoring ranges: stream and time intervals, location boxes.

use std::collections::BTreeSet;
use std::fmt;

use crate::schema::Dimension;

/// A half-open integer interval `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lo: i64,
    pub hi: i64,
}

impl Interval {
    /// Create an interval. Returns `None` unless `hi > lo`.
    pub fn new(lo: i64, hi: i64) -> Option<Self> {
        (hi > lo).then_some(Self { lo, hi })
    }

    /// Smallest interval covering both.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
        }
    }

    pub fn len(&self) -> i64 {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.hi <= self.lo
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.lo, self.hi)
    }
}

/// An axis-aligned box with lower-left `(x1, y1)` and upper-right `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XyBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl XyBox {
    /// Create a box. Returns `None` unless both axes strictly increase.
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Option<Self> {
        (x2 > x1 && y2 > y1).then_some(Self { x1, y1, x2, y2 })
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &XyBox) -> XyBox {
        XyBox {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

impl fmt::Display for XyBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}),({},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

/// The anchoring state of one layer instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anchors {
    pub stream: Option<Interval>,
    pub time: Option<Interval>,
    pub location: Option<XyBox>,
}

impl Anchors {
    /// Returns true if the dimension is set.
    pub fn has(&self, dimension: Dimension) -> bool {
        match dimension {
            Dimension::Stream => self.stream.is_some(),
            Dimension::Time => self.time.is_some(),
            Dimension::Location => self.location.is_some(),
        }
    }

    /// Dimensions that are set, in column order.
    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        Dimension::ALL.into_iter().filter(|d| self.has(*d))
    }

    /// Unset a dimension.
    pub fn clear(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::Stream => self.stream = None,
            Dimension::Time => self.time = None,
            Dimension::Location => self.location = None,
        }
    }

    /// Grow every dimension set on `other` to cover it.
    pub fn absorb(&mut self, other: &Anchors) {
        self.stream = merge(self.stream, other.stream, |a, b| a.union(b));
        self.time = merge(self.time, other.time, |a, b| a.union(b));
        self.location = merge(self.location, other.location, |a, b| a.union(b));
    }

    /// Copy dimensions from `derived`, leaving those in `pinned` untouched.
    pub fn fill_from(&mut self, derived: &Anchors, pinned: &BTreeSet<Dimension>) {
        if !pinned.contains(&Dimension::Stream) {
            self.stream = derived.stream;
        }
        if !pinned.contains(&Dimension::Time) {
            self.time = derived.time;
        }
        if !pinned.contains(&Dimension::Location) {
            self.location = derived.location;
        }
    }

    /// Render one dimension as a table cell, if set.
    pub fn render(&self, dimension: Dimension) -> Option<String> {
        match dimension {
            Dimension::Stream => self.stream.map(|i| i.to_string()),
            Dimension::Time => self.time.map(|i| i.to_string()),
            Dimension::Location => self.location.map(|b| b.to_string()),
        }
    }
}

fn merge<T: Copy>(current: Option<T>, other: Option<T>, union: impl Fn(&T, &T) -> T) -> Option<T> {
    match (current, other) {
        (Some(a), Some(b)) => Some(union(&a, &b)),
        (a, b) => a.or(b),
    }
}
