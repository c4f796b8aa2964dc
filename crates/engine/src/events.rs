//! Event types for group header change notifications.
//!
//! The header emits these after every structural change so layers above it
//! (and the renderer) know which positions to refresh. They're also used by
//! tests to verify which structural changes a command produced.

use std::ops::Range;

use gridgroup_core::Rectangle;

/// Events emitted by the group header layer.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderEvent {
    /// Rows disappeared. Ranges are positions before the change.
    RowsHidden(StructuralChange),

    /// Rows appeared. Ranges are positions after the change.
    RowsShown(StructuralChange),

    /// Rows moved. Ranges are positions after the change.
    RowsReordered(StructuralChange),

    /// Group membership or flags changed without rows moving.
    GroupsChanged,

    /// A group was collapsed or expanded.
    CollapseStateChanged(CollapseStateChangedEvent),

    /// The group column changed width (pixels).
    GroupColumnResized { width: i32 },

    /// The client area the header renders into changed.
    ClientAreaResized(Rectangle),
}

/// Position ranges affected by a structural change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralChange {
    /// Half-open position ranges, ascending and non-overlapping.
    /// INVARIANT: no range ends past `row_count`.
    pub ranges: Vec<Range<usize>>,
    /// Visible row count after the change.
    pub row_count: usize,
}

impl StructuralChange {
    /// Collapse positions into contiguous ranges, clamped to `row_count`
    pub fn from_positions(positions: &[usize], row_count: usize) -> Self {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges: Vec<Range<usize>> = Vec::new();
        for position in sorted {
            match ranges.last_mut() {
                Some(last) if last.end == position => last.end += 1,
                _ => ranges.push(position..position + 1),
            }
        }

        let ranges = ranges
            .into_iter()
            .map(|r| r.start.min(row_count)..r.end.min(row_count))
            .filter(|r| !r.is_empty())
            .collect();
        Self { ranges, row_count }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of positions covered
    pub fn len(&self) -> usize {
        self.ranges.iter().map(|r| r.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseStateChangedEvent {
    pub group: String,
    pub collapsed: bool,
}

/// Callback type for receiving header events.
pub type EventCallback = Box<dyn FnMut(&HeaderEvent)>;

/// Simple event collector for testing.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<HeaderEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: HeaderEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[HeaderEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Filter to only RowsHidden events.
    pub fn rows_hidden(&self) -> Vec<&StructuralChange> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HeaderEvent::RowsHidden(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Filter to only RowsShown events.
    pub fn rows_shown(&self) -> Vec<&StructuralChange> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HeaderEvent::RowsShown(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Filter to only RowsReordered events.
    pub fn rows_reordered(&self) -> Vec<&StructuralChange> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HeaderEvent::RowsReordered(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    /// Filter to only CollapseStateChanged events.
    pub fn collapse_changes(&self) -> Vec<&CollapseStateChangedEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HeaderEvent::CollapseStateChanged(c) => Some(c),
                _ => None,
            })
            .collect()
    }
}
