//! Test harness for group header commands with event tracking.
//!
//! This module provides `HeaderHarness`, a wrapper around a
//! `GroupHeaderLayer<RowView>` that:
//! - Starts from the standard 14-row, four-group fixture
//! - Collects every event the layer fires
//! - Provides `apply` with atomic/non-atomic semantics over command batches
//!
//! Use this harness to test header invariants without a renderer.

use std::cell::RefCell;
use std::rc::Rc;

use gridgroup_core::labels::ROW_HEADER;

use crate::commands::HeaderCommand;
use crate::events::EventCollector;
use crate::header_layer::{GroupHeaderCell, GroupHeaderLayer, HeaderCellValue};
use crate::mapping::PositionIndexMapping;
use crate::row_view::RowView;

/// Rows in the fixture
pub const ROW_COUNT: usize = 14;

/// Fixture groups as (name, start index, span)
pub const FIXTURE_GROUPS: [(&str, usize, usize); 4] = [
    ("Person", 0, 4),
    ("Address", 4, 4),
    ("Facts", 8, 3),
    ("Personal", 11, 3),
];

/// Result of applying a command batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    /// Number of commands that went through.
    pub applied: usize,
    /// Batch position of the first rejected command.
    pub rejected_at: Option<usize>,
}

/// Test harness wrapping a group header layer with event tracking.
pub struct HeaderHarness {
    layer: GroupHeaderLayer<RowView>,
    events: Rc<RefCell<EventCollector>>,
}

impl HeaderHarness {
    /// Create a harness over the standard fixture.
    pub fn new() -> Self {
        let mut layer = GroupHeaderLayer::new(RowView::new(ROW_COUNT));
        for (name, start, span) in FIXTURE_GROUPS {
            layer.add_group(name, start, span).unwrap();
        }
        Self::with_layer(layer)
    }

    /// Create a harness wrapping an existing layer.
    pub fn with_layer(mut layer: GroupHeaderLayer<RowView>) -> Self {
        let events = Rc::new(RefCell::new(EventCollector::new()));
        let sink = Rc::clone(&events);
        layer.add_listener(move |event| sink.borrow_mut().push(event.clone()));
        Self { layer, events }
    }

    pub fn layer(&self) -> &GroupHeaderLayer<RowView> {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut GroupHeaderLayer<RowView> {
        &mut self.layer
    }

    /// Get collected events.
    pub fn events(&self) -> std::cell::Ref<'_, EventCollector> {
        self.events.borrow()
    }

    /// Clear collected events.
    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }

    /// Send one command to the layer.
    pub fn command(&mut self, command: HeaderCommand) -> bool {
        self.layer.do_command(command)
    }

    /// Apply commands in order until one is rejected.
    ///
    /// - `atomic=true`: All-or-nothing. A rejection restores the state from
    ///   before the batch.
    /// - `atomic=false`: Commands before the rejected one stay applied.
    pub fn apply(&mut self, commands: &[HeaderCommand], atomic: bool) -> ApplyResult {
        let before = self.layer.snapshot();

        for (at, command) in commands.iter().enumerate() {
            if !self.layer.do_command(command.clone()) {
                if atomic {
                    self.layer.restore(before);
                    return ApplyResult {
                        applied: 0,
                        rejected_at: Some(at),
                    };
                }
                return ApplyResult {
                    applied: at,
                    rejected_at: Some(at),
                };
            }
        }

        ApplyResult {
            applied: commands.len(),
            rejected_at: None,
        }
    }

    pub fn cell(&self, column: usize, row: usize) -> GroupHeaderCell {
        self.layer
            .cell_by_position(column, row)
            .unwrap_or_else(|| panic!("no cell at ({column}, {row})"))
    }

    /// Assert the fixture is fully visible, in order, with default geometry.
    pub fn verify_clean_state(&self) {
        let layer = &self.layer;
        assert_eq!(layer.row_count(), ROW_COUNT);
        assert_eq!(layer.column_count(), 2);
        assert_eq!(layer.row_height(), 20);
        assert_eq!(layer.group_column_width(), 20);
        assert_eq!(layer.row_header_width(), 40);
        assert_eq!(layer.width(), 60);
        assert!(layer.collapse_hidden_indexes().is_empty());

        for position in 0..ROW_COUNT {
            assert_eq!(layer.body().index_of(position), Some(position));
        }

        for (name, start, span) in FIXTURE_GROUPS {
            let group = layer.group_by_name(name).unwrap();
            assert!(!group.is_collapsed(), "{name} should be expanded");
            assert_eq!(group.visible_start_position(), Some(start));
            assert_eq!(group.visible_span(), span);

            for row in start..start + span {
                let cell = self.cell(0, row);
                assert_eq!(cell.row_position, start);
                assert_eq!(cell.row_span, span);
                assert_eq!(cell.column_span, 1);
                assert_eq!(cell.value, HeaderCellValue::GroupName(name.to_string()));
                assert_eq!(cell.bounds.y, 20 * start as i32);
                assert_eq!(cell.bounds.height, 20 * span as i32);

                let label = self.cell(1, row);
                assert_eq!(label.value, HeaderCellValue::RowLabel(row + 1));
                assert!(layer.config_labels_by_position(1, row).has_label(ROW_HEADER));
            }
        }
    }
}

impl Default for HeaderHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_fixture_is_clean() {
        let harness = HeaderHarness::new();
        harness.verify_clean_state();
        assert!(harness.events().is_empty());
    }

    #[test]
    fn test_harness_non_atomic_apply() {
        let mut harness = HeaderHarness::new();
        let commands = vec![
            HeaderCommand::CollapseExpand { position: 0 },
            HeaderCommand::RemoveGroup("Nope".into()),
            HeaderCommand::CollapseExpand { position: 1 },
        ];

        let result = harness.apply(&commands, false);
        assert_eq!(result.applied, 1);
        assert_eq!(result.rejected_at, Some(1));
        assert!(harness.layer().group_by_name("Person").unwrap().is_collapsed());
        assert_eq!(harness.layer().row_count(), 11);
    }

    #[test]
    fn test_harness_atomic_rollback() {
        let mut harness = HeaderHarness::new();
        let commands = vec![
            HeaderCommand::CollapseExpand { position: 0 },
            HeaderCommand::HideRows { positions: vec![5] },
            HeaderCommand::RemoveGroup("Nope".into()),
        ];

        let result = harness.apply(&commands, true);
        assert_eq!(result.applied, 0);
        assert_eq!(result.rejected_at, Some(2));
        harness.verify_clean_state();
    }

    #[test]
    fn test_harness_collects_events() {
        let mut harness = HeaderHarness::new();
        assert!(harness.command(HeaderCommand::HideRows { positions: vec![3] }));

        let events = harness.events();
        assert_eq!(events.rows_hidden().len(), 1);
        assert_eq!(events.rows_hidden()[0].ranges, vec![3..4]);
        assert_eq!(events.rows_hidden()[0].row_count, 13);
    }
}
