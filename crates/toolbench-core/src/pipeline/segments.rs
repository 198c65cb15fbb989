//! Ordered page ranges over a document, edited permissively.
//!
//! Edits never fail: bad input is dropped and values are clamped into the
//! document. Strict checks happen when a split is submitted.

use std::fmt;

use uuid::Uuid;

use crate::util::{Direction, move_adjacent};

/// Stable identity of a segment across edits and reorders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous, inclusive, 1-based page range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub id: SegmentId,
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            id: SegmentId::new(),
            start,
            end,
        }
    }

    /// Number of pages covered (0 if the range is inverted)
    pub const fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Page numbers in order
    pub fn pages(&self) -> Vec<u32> {
        (self.start..=self.end).collect()
    }

    /// Clamp both ends into `[1, page_count]`, collapsing an inverted range
    /// onto its start.
    #[must_use]
    pub fn normalized(self, page_count: u32) -> Self {
        if page_count == 0 {
            return self;
        }
        let start = self.start.clamp(1, page_count);
        let end = self.end.clamp(1, page_count);
        Self {
            start,
            end: end.max(start),
            ..self
        }
    }
}

/// Which end of a segment an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentField {
    Start,
    End,
}

/// Keeps an ordered list of page ranges valid for a fixed page count.
#[derive(Debug, Clone, Default)]
pub struct SegmentManager {
    page_count: u32,
    segments: Vec<PageRange>,
}

impl SegmentManager {
    /// A manager for a freshly loaded document: one segment covering it all.
    pub fn new(page_count: u32) -> Self {
        let mut manager = Self::default();
        manager.reset(page_count);
        manager
    }

    /// Replace everything with a single `[1, page_count]` segment.
    pub fn reset(&mut self, page_count: u32) {
        self.page_count = page_count;
        self.segments.clear();
        if page_count > 0 {
            self.segments.push(PageRange::new(1, page_count));
        }
    }

    /// Drop all segments and forget the page count.
    pub fn clear(&mut self) {
        self.page_count = 0;
        self.segments.clear();
    }

    pub const fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn segments(&self) -> &[PageRange] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a segment running from just after the last one to the end.
    ///
    /// Returns `None` when no document is loaded.
    pub fn add_segment(&mut self) -> Option<SegmentId> {
        if self.page_count == 0 {
            return None;
        }

        let start = self
            .segments
            .last()
            .map_or(1, |last| last.end.saturating_add(1))
            .clamp(1, self.page_count);
        let segment = PageRange::new(start, self.page_count).normalized(self.page_count);
        let id = segment.id;
        self.segments.push(segment);
        Some(id)
    }

    /// Apply a raw text edit to one end of a segment.
    ///
    /// Blank or non-integer input is ignored. The value is clamped to the
    /// document; if that leaves `start > end`, both collapse onto it.
    pub fn update_segment(&mut self, id: SegmentId, field: SegmentField, raw: &str) {
        let Ok(parsed) = raw.trim().parse::<i64>() else {
            return;
        };
        if self.page_count == 0 {
            return;
        }
        let Some(segment) = self.segments.iter_mut().find(|s| s.id == id) else {
            return;
        };

        let value = u32::try_from(parsed.clamp(1, i64::from(self.page_count)))
            .unwrap_or(self.page_count);

        match field {
            SegmentField::Start => segment.start = value,
            SegmentField::End => segment.end = value,
        }
        if segment.start > segment.end {
            segment.start = value;
            segment.end = value;
        }
    }

    /// Remove a segment unless it is the only one left.
    pub fn remove_segment(&mut self, id: SegmentId) -> bool {
        if self.segments.len() <= 1 {
            return false;
        }
        let before = self.segments.len();
        self.segments.retain(|s| s.id != id);
        self.segments.len() != before
    }

    /// Swap a segment with its neighbour; no-op at either end.
    pub fn reorder(&mut self, id: SegmentId, direction: Direction) -> bool {
        self.segments
            .iter()
            .position(|s| s.id == id)
            .is_some_and(|index| move_adjacent(&mut self.segments, index, direction))
    }

    /// Segments re-clamped to the document, in list order, for submission.
    pub fn normalized(&self) -> Vec<PageRange> {
        self.segments
            .iter()
            .map(|s| s.normalized(self.page_count))
            .collect()
    }
}
