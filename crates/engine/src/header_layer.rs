//! Group Header Layer
//!
//! The row header of a grid with row grouping. It renders two columns:
//! - Column 0: the group column, one merged cell per visible group
//! - Column 1: the row header (1-based row labels)
//!
//! Rows outside any group get a single cell spanning both columns.
//!
//! The layer owns the group model and drives the row transform beneath it
//! for collapse/expand, hiding, and reordering.
//!
//! Key invariants:
//! - Group projections are recomputed after every structural change
//! - Rows hidden to collapse a group are tracked apart from rows hidden by
//!   the user, so expanding never reveals a user-hidden row
//! - A rejected command leaves the model and the body untouched

use std::collections::BTreeSet;
use std::fmt::Display;
use std::ops::Range;
use std::str::FromStr;

use rustc_hash::FxHashSet;

use gridgroup_config::HeaderSettings;
use gridgroup_core::labels::{
    GROUP_COLLAPSED_CONFIG_TYPE, GROUP_EXPANDED_CONFIG_TYPE, ROW_GROUP_HEADER, ROW_HEADER,
};
use gridgroup_core::{
    CharCellMeasure, ConfigLabelAccumulator, DpiConverter, IntegerScale, LabelStack, Rectangle,
    TextMeasure,
};

use crate::commands::{GroupRef, HeaderCommand};
use crate::error::GroupError;
use crate::events::{CollapseStateChangedEvent, EventCallback, HeaderEvent, StructuralChange};
use crate::group::{Group, GroupId};
use crate::group_model::GroupModel;
use crate::mapping::{PositionIndexMapping, RowTransform};
use crate::reorder::{self, BlockRow, MembershipChange};
use crate::state::{namespace, Properties};
use crate::translator::PositionCoordinateTranslator;

/// Column of the merged group cells
pub const GROUP_COLUMN: usize = 0;

/// Column of the row labels
pub const ROW_HEADER_COLUMN: usize = 1;

const COLUMN_COUNT: usize = 2;

/// What a header cell displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderCellValue {
    GroupName(String),
    /// 1-based row label
    RowLabel(usize),
}

/// A header cell. Spanning cells are returned identically for every
/// position they cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupHeaderCell {
    /// Origin column
    pub column_position: usize,
    /// Origin row
    pub row_position: usize,
    pub column_span: usize,
    pub row_span: usize,
    /// Row index the cell stands for; a group cell's representative member
    pub index: usize,
    pub value: HeaderCellValue,
    pub bounds: Rectangle,
}

impl GroupHeaderCell {
    pub fn is_spanning(&self) -> bool {
        self.column_span > 1 || self.row_span > 1
    }
}

/// State captured by [`GroupHeaderLayer::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSnapshot<T> {
    body: T,
    model: GroupModel,
    collapse_hidden: BTreeSet<usize>,
}

pub struct GroupHeaderLayer<T: RowTransform> {
    body: T,
    model: GroupModel,
    /// Rows this layer hid to collapse groups
    collapse_hidden: BTreeSet<usize>,
    settings: HeaderSettings,
    dpi: Box<dyn DpiConverter>,
    measure: Box<dyn TextMeasure>,
    /// Unscaled width of the group column
    group_column_width: i32,
    calculate_width: bool,
    label_accumulator: Option<Box<dyn ConfigLabelAccumulator>>,
    listeners: Vec<EventCallback>,
    /// Origin of a drag-style row reorder in progress
    reorder_start: Option<usize>,
    client_area: Rectangle,
}

impl<T: RowTransform> GroupHeaderLayer<T> {
    pub fn new(body: T) -> Self {
        Self::with_settings(body, HeaderSettings::default())
    }

    pub fn with_settings(body: T, settings: HeaderSettings) -> Self {
        Self {
            body,
            model: GroupModel::new(),
            collapse_hidden: BTreeSet::new(),
            dpi: Box::new(IntegerScale::new(settings.dpi_scale)),
            measure: Box::new(CharCellMeasure::new(settings.char_width, settings.label_padding)),
            group_column_width: settings.group_column_width,
            calculate_width: settings.calculate_width,
            label_accumulator: None,
            listeners: Vec::new(),
            reorder_start: None,
            client_area: Rectangle::default(),
            settings,
        }
    }

    pub fn set_dpi_converter(&mut self, dpi: Box<dyn DpiConverter>) {
        self.dpi = dpi;
    }

    pub fn set_text_measure(&mut self, measure: Box<dyn TextMeasure>) {
        self.measure = measure;
    }

    pub fn set_config_label_accumulator(&mut self, accumulator: Box<dyn ConfigLabelAccumulator>) {
        self.label_accumulator = Some(accumulator);
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&HeaderEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn body(&self) -> &T {
        &self.body
    }

    pub fn model(&self) -> &GroupModel {
        &self.model
    }

    pub fn settings(&self) -> &HeaderSettings {
        &self.settings
    }

    /// Change the rows beneath the header, then bring groups up to date
    pub fn update_body<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.body);
        self.refresh_from_body();
        result
    }

    /// Change the group model directly, then bring rows up to date
    pub fn update_model<R>(&mut self, f: impl FnOnce(&mut GroupModel) -> R) -> R {
        let result = f(&mut self.model);
        self.refresh_from_body();
        result
    }

    /// Create a group over consecutive indexes
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        start_index: usize,
        span: usize,
    ) -> Result<GroupId, GroupError> {
        let id = self.model.add_group(name, start_index, span)?;
        self.refresh_from_body();
        Ok(id)
    }

    /// Re-derive collapse hiding and every group projection after the rows
    /// beneath changed on their own
    pub fn refresh_from_body(&mut self) {
        self.reconcile();
    }

    // -------------------------------------------------------------------------
    // Lookups (positions are translated at call time)
    // -------------------------------------------------------------------------

    pub fn group_by_position(&self, position: usize) -> Option<&Group> {
        self.model.group_by_position(position, &self.body)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.model.group_by_name(name)
    }

    pub fn group_by_index(&self, index: usize) -> Option<&Group> {
        self.model.group_by_index(index)
    }

    pub fn is_part_of_a_group(&self, position: usize) -> bool {
        self.group_by_position(position).is_some()
    }

    pub fn is_part_of_an_unbreakable_group(&self, position: usize) -> bool {
        self.group_by_position(position).is_some_and(Group::is_unbreakable)
    }

    pub fn is_collapsed(&self, position: usize) -> bool {
        self.group_by_position(position).is_some_and(Group::is_collapsed)
    }

    pub fn is_static_index(&self, position: usize) -> bool {
        self.body
            .index_of(position)
            .is_some_and(|index| self.model.is_static_index(index))
    }

    /// Visible positions of a group's members, ascending
    pub fn group_positions(&self, group: impl Into<GroupRef>) -> Vec<usize> {
        let Some(group) = self.resolve(&group.into()).and_then(|id| self.model.group(id)) else {
            return Vec::new();
        };
        PositionCoordinateTranslator::new(&self.body)
            .visible_members(group)
            .into_iter()
            .map(|(position, _)| position)
            .collect()
    }

    /// Rows this layer currently keeps hidden for collapsed groups
    pub fn collapse_hidden_indexes(&self) -> &BTreeSet<usize> {
        &self.collapse_hidden
    }

    // -------------------------------------------------------------------------
    // Cells
    // -------------------------------------------------------------------------

    pub fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    pub fn row_count(&self) -> usize {
        self.body.row_count()
    }

    /// Cell at `(column, row)`, `None` outside the layer
    pub fn cell_by_position(&self, column: usize, row: usize) -> Option<GroupHeaderCell> {
        if column >= COLUMN_COUNT {
            return None;
        }
        let index = self.body.index_of(row)?;

        match self.model.group_by_index(index) {
            Some(group) if column == GROUP_COLUMN => {
                let projection = group.visible();
                let start = projection.start_position.unwrap_or(row);
                let span = projection.span.max(1);
                Some(GroupHeaderCell {
                    column_position: GROUP_COLUMN,
                    row_position: start,
                    column_span: 1,
                    row_span: span,
                    index: projection.start_index.unwrap_or(index),
                    value: HeaderCellValue::GroupName(group.name().to_string()),
                    bounds: self.cell_bounds(GROUP_COLUMN, 1, start, span),
                })
            }
            Some(_) => Some(GroupHeaderCell {
                column_position: ROW_HEADER_COLUMN,
                row_position: row,
                column_span: 1,
                row_span: 1,
                index,
                value: HeaderCellValue::RowLabel(index + 1),
                bounds: self.cell_bounds(ROW_HEADER_COLUMN, 1, row, 1),
            }),
            None => Some(GroupHeaderCell {
                column_position: GROUP_COLUMN,
                row_position: row,
                column_span: COLUMN_COUNT,
                row_span: 1,
                index,
                value: HeaderCellValue::RowLabel(index + 1),
                bounds: self.cell_bounds(GROUP_COLUMN, COLUMN_COUNT, row, 1),
            }),
        }
    }

    /// Labels for styling the cell at `(column, row)`. Region and state labels
    /// come first, then whatever the accumulator adds.
    pub fn config_labels_by_position(&self, column: usize, row: usize) -> LabelStack {
        let mut labels = LabelStack::new();
        if column >= COLUMN_COUNT {
            return labels;
        }
        let Some(index) = self.body.index_of(row) else {
            return labels;
        };

        match self.model.group_by_index(index) {
            Some(group) if column == GROUP_COLUMN => {
                labels.add_label(ROW_GROUP_HEADER);
                labels.add_label(if group.is_collapsed() {
                    GROUP_COLLAPSED_CONFIG_TYPE
                } else {
                    GROUP_EXPANDED_CONFIG_TYPE
                });
            }
            _ => labels.add_label(ROW_HEADER),
        }

        if let Some(accumulator) = &self.label_accumulator {
            accumulator.accumulate_config_labels(&mut labels, column, row);
        }
        labels
    }

    // -------------------------------------------------------------------------
    // Geometry (pixels, DPI applied)
    // -------------------------------------------------------------------------

    pub fn row_height(&self) -> i32 {
        self.dpi.upscale(self.settings.row_height)
    }

    pub fn height(&self) -> i32 {
        to_px(self.row_count()).saturating_mul(self.row_height())
    }

    pub fn start_y_of_row(&self, row: usize) -> i32 {
        to_px(row).saturating_mul(self.row_height())
    }

    /// Row at a pixel offset, `None` past the last row
    pub fn row_position_by_y(&self, y: i32) -> Option<usize> {
        let height = self.row_height();
        if y < 0 || height <= 0 {
            return None;
        }
        let row = usize::try_from(y / height).ok()?;
        (row < self.row_count()).then_some(row)
    }

    pub fn group_column_width(&self) -> i32 {
        if self.calculate_width {
            self.calculated_group_column_width()
        } else {
            self.dpi.upscale(self.group_column_width)
        }
    }

    pub fn row_header_width(&self) -> i32 {
        self.dpi.upscale(self.settings.row_header_width)
    }

    pub fn column_width_by_position(&self, column: usize) -> i32 {
        match column {
            GROUP_COLUMN => self.group_column_width(),
            ROW_HEADER_COLUMN => self.row_header_width(),
            _ => 0,
        }
    }

    pub fn start_x_of_column(&self, column: usize) -> i32 {
        self.columns_width(0..column.min(COLUMN_COUNT))
    }

    pub fn width(&self) -> i32 {
        self.start_x_of_column(COLUMN_COUNT)
    }

    pub fn is_calculate_width(&self) -> bool {
        self.calculate_width
    }

    pub fn client_area(&self) -> Rectangle {
        self.client_area
    }

    /// Rows that fit into the client area, starting at the top
    pub fn rows_in_client_area(&self) -> Range<usize> {
        let height = self.row_height();
        if height <= 0 || self.client_area.height <= 0 {
            return 0..0;
        }
        let area = self.client_area.height;
        let fitting = area / height + i32::from(area % height != 0);
        let fitting = usize::try_from(fitting).unwrap_or(0);
        0..fitting.min(self.row_count())
    }

    /// Widest visible group name, in device pixels
    fn calculated_group_column_width(&self) -> i32 {
        let measured = self
            .model
            .groups()
            .iter()
            .filter(|g| g.visible().is_visible())
            .map(|g| self.measure.text_width(g.name()))
            .max()
            .unwrap_or(self.group_column_width);
        self.dpi.upscale(measured)
    }

    fn columns_width(&self, columns: Range<usize>) -> i32 {
        columns
            .map(|c| self.column_width_by_position(c))
            .fold(0, i32::saturating_add)
    }

    fn cell_bounds(&self, column: usize, column_span: usize, row: usize, row_span: usize) -> Rectangle {
        let width = self.columns_width(column..column + column_span);
        Rectangle::new(
            self.start_x_of_column(column),
            self.start_y_of_row(row),
            width,
            to_px(row_span).saturating_mul(self.row_height()),
        )
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Dispatch a command. Returns whether it was handled; rejected commands
    /// change nothing.
    pub fn do_command(&mut self, command: HeaderCommand) -> bool {
        let kind = command.kind();
        log::debug!("group header command: {kind}");

        let handled = match command {
            HeaderCommand::HideRows { positions } => self.hide_row_positions(&positions),
            HeaderCommand::ShowAllRows => self.show_all_rows(),
            HeaderCommand::ShowRowIndexes { indexes } => self.show_row_indexes(&indexes),
            HeaderCommand::ReorderRow { from, to } => self.reorder_row(from, to),
            HeaderCommand::ReorderRowStart { from } => self.reorder_row_start(from),
            HeaderCommand::ReorderRowEnd { to } => self.reorder_row_end(to),
            HeaderCommand::MultiReorderRows { from, to } => self.reorder_rows(&from, to),
            HeaderCommand::ResetRowReorder => self.reset_row_reorder(),
            HeaderCommand::ReorderGroup { from, to } => self.reorder_group(from, to),
            HeaderCommand::ReorderGroupRange { from, to } => self.reorder_groups(&from, to),
            HeaderCommand::CreateGroup { name, positions } => self.create_group(name, &positions),
            HeaderCommand::RemoveGroup(group) => self.remove_group(group),
            HeaderCommand::Ungroup { positions } => self.ungroup(&positions),
            HeaderCommand::ClearAllGroups => self.clear_all_groups(),
            HeaderCommand::AddPositionsToGroup { group, positions } => {
                self.add_positions_to_group(group, &positions)
            }
            HeaderCommand::RemovePositionsFromGroup { group, positions } => {
                self.remove_positions_from_group(group, &positions)
            }
            HeaderCommand::SetGroupUnbreakable { group, unbreakable } => {
                self.set_group_unbreakable(group, unbreakable)
            }
            HeaderCommand::AddStaticIndexes { group, indexes } => {
                self.add_static_indexes(group, &indexes)
            }
            HeaderCommand::RemoveStaticIndexes { group, indexes } => {
                self.remove_static_indexes(group, &indexes)
            }
            HeaderCommand::CollapseExpand { position } => self.toggle_group(position),
            HeaderCommand::CollapseAll => self.collapse_all(),
            HeaderCommand::ExpandAll => self.expand_all(),
            HeaderCommand::ResizeGroupColumn { width, downscale } => {
                self.resize_group_column(width, downscale)
            }
            HeaderCommand::SetCalculateWidth(calculate) => self.set_calculate_width(calculate),
            HeaderCommand::ClientAreaResized { width, height } => {
                self.client_area_resized(width, height)
            }
        };

        if !handled {
            log::debug!("group header command rejected: {kind}");
        }
        handled
    }

    // -------------------------------------------------------------------------
    // Collapse / expand
    // -------------------------------------------------------------------------

    pub fn collapse_group(&mut self, group: impl Into<GroupRef>) -> bool {
        self.set_collapsed(&group.into(), true)
    }

    pub fn expand_group(&mut self, group: impl Into<GroupRef>) -> bool {
        self.set_collapsed(&group.into(), false)
    }

    /// Collapse an expanded group or expand a collapsed one
    pub fn toggle_group(&mut self, position: usize) -> bool {
        let Some(group) = self.group_by_position(position) else {
            return false;
        };
        let collapse = !group.is_collapsed();
        self.set_collapsed(&GroupRef::Position(position), collapse)
    }

    pub fn collapse_all(&mut self) -> bool {
        self.set_all_collapsed(true)
    }

    pub fn expand_all(&mut self) -> bool {
        self.set_all_collapsed(false)
    }

    /// Already in the requested state counts as handled
    fn set_collapsed(&mut self, group: &GroupRef, collapsed: bool) -> bool {
        let Some(id) = self.resolve(group) else {
            return false;
        };
        let changed = if collapsed {
            self.model.collapse(id)
        } else {
            self.model.expand(id)
        };
        match changed {
            Ok(true) => {
                self.reconcile();
                self.fire_collapse_changed(id);
                true
            }
            Ok(false) => true,
            Err(err) => {
                log::warn!("collapse state change failed: {err}");
                false
            }
        }
    }

    fn set_all_collapsed(&mut self, collapsed: bool) -> bool {
        let ids: Vec<GroupId> = self
            .model
            .groups()
            .iter()
            .filter(|g| g.is_collapsed() != collapsed)
            .map(Group::id)
            .collect();
        let mut changed = Vec::with_capacity(ids.len());
        for id in ids {
            let result = if collapsed {
                self.model.collapse(id)
            } else {
                self.model.expand(id)
            };
            if matches!(result, Ok(true)) {
                changed.push(id);
            }
        }

        if !changed.is_empty() {
            self.reconcile();
            for id in changed {
                self.fire_collapse_changed(id);
            }
        }
        true
    }

    fn fire_collapse_changed(&mut self, id: GroupId) {
        let Some(group) = self.model.group(id) else {
            return;
        };
        let event = CollapseStateChangedEvent {
            group: group.name().to_string(),
            collapsed: group.is_collapsed(),
        };
        self.fire(HeaderEvent::CollapseStateChanged(event));
    }

    // -------------------------------------------------------------------------
    // Hide / show
    // -------------------------------------------------------------------------

    pub fn hide_row_positions(&mut self, positions: &[usize]) -> bool {
        let indexes = self.indexes_at(positions);
        if indexes.is_empty() {
            return false;
        }
        self.hide_row_indexes(&indexes)
    }

    /// Hide rows by index. Rows hidden this way stay hidden when their group
    /// expands.
    pub fn hide_row_indexes(&mut self, indexes: &[usize]) -> bool {
        // A collapsed row hidden again by the user stays hidden on expand
        let claimed = indexes
            .iter()
            .filter(|index| self.collapse_hidden.remove(*index))
            .count();
        let hidden = self.hide_with_event(indexes);
        self.reconcile();
        claimed > 0 || !hidden.is_empty()
    }

    /// Show every row the user hid. Rows of collapsed groups stay hidden.
    pub fn show_all_rows(&mut self) -> bool {
        let user_hidden: Vec<usize> = self
            .hidden_indexes()
            .into_iter()
            .filter(|index| !self.collapse_hidden.contains(index))
            .collect();
        self.show_with_event(&user_hidden);
        self.reconcile();
        true
    }

    pub fn show_row_indexes(&mut self, indexes: &[usize]) -> bool {
        let user_hidden: Vec<usize> = indexes
            .iter()
            .copied()
            .filter(|index| !self.collapse_hidden.contains(index))
            .collect();
        let shown = self.show_with_event(&user_hidden);
        self.reconcile();
        !shown.is_empty()
    }

    /// Hidden indexes in full-order sequence
    fn hidden_indexes(&self) -> Vec<usize> {
        (0..self.body.slot_count())
            .filter_map(|slot| self.body.index_at_slot(slot))
            .filter(|&index| self.body.is_index_hidden(index))
            .collect()
    }

    fn hide_with_event(&mut self, indexes: &[usize]) -> Vec<usize> {
        let positions: Vec<usize> = indexes
            .iter()
            .filter_map(|&index| self.body.position_of(index))
            .collect();
        let hidden = self.body.hide_indexes(indexes);
        if !hidden.is_empty() {
            let change = StructuralChange::from_positions(&positions, self.body.row_count());
            self.fire(HeaderEvent::RowsHidden(change));
        }
        hidden
    }

    fn show_with_event(&mut self, indexes: &[usize]) -> Vec<usize> {
        let shown = self.body.show_indexes(indexes);
        if !shown.is_empty() {
            let positions: Vec<usize> = shown
                .iter()
                .filter_map(|&index| self.body.position_of(index))
                .collect();
            let change = StructuralChange::from_positions(&positions, self.body.row_count());
            self.fire(HeaderEvent::RowsShown(change));
        }
        shown
    }

    // -------------------------------------------------------------------------
    // Row reorder
    // -------------------------------------------------------------------------

    /// Move the row at `from` in front of the row shown at `to`
    /// (`to == row_count` appends).
    ///
    /// The row's group follows from where it lands. Dropping the visible row
    /// of a collapsed group moves the whole group.
    pub fn reorder_row(&mut self, from: usize, to: usize) -> bool {
        let row_count = self.row_count();
        if from >= row_count || to > row_count {
            return false;
        }
        if to == from || to == from + 1 {
            return true;
        }
        self.reorder_rows(&[from], to)
    }

    /// Move several rows, kept in position order, in front of `to`
    pub fn reorder_rows(&mut self, from: &[usize], to: usize) -> bool {
        let row_count = self.row_count();
        if from.is_empty() || to > row_count || from.iter().any(|&p| p >= row_count) {
            return false;
        }

        let block = self.block_rows(from);
        let indexes: Vec<usize> = block.iter().map(|row| row.index).collect();
        let moving: FxHashSet<usize> = indexes.iter().copied().collect();
        let target = reorder::drop_target(&self.body, &moving, to);
        if reorder::is_in_place(&self.body, &indexes, target.before) {
            return true;
        }

        let changes = match reorder::plan_membership(&self.model, &block, &target) {
            Ok(changes) => changes,
            Err(err) => {
                log::warn!("row reorder rejected: {err}");
                return false;
            }
        };

        self.apply_move(&indexes, target.before);
        if !changes.is_empty() {
            self.apply_membership(&changes);
            self.fire(HeaderEvent::GroupsChanged);
        }
        self.reconcile();
        true
    }

    pub fn reorder_row_start(&mut self, from: usize) -> bool {
        if from >= self.row_count() {
            return false;
        }
        self.reorder_start = Some(from);
        true
    }

    /// Finish a reorder begun by [`reorder_row_start`](Self::reorder_row_start)
    pub fn reorder_row_end(&mut self, to: usize) -> bool {
        match self.reorder_start.take() {
            Some(from) => self.reorder_row(from, to),
            None => false,
        }
    }

    /// Put every row back in index order. Group membership is kept.
    pub fn reset_row_reorder(&mut self) -> bool {
        if self.body.reset_order() {
            let positions: Vec<usize> = (0..self.body.row_count()).collect();
            let change = StructuralChange::from_positions(&positions, self.body.row_count());
            self.fire(HeaderEvent::RowsReordered(change));
            self.reconcile();
        }
        true
    }

    /// Dragged rows in position order. A collapsed group's visible row drags
    /// all of its members along.
    fn block_rows(&self, positions: &[usize]) -> Vec<BlockRow> {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut seen = FxHashSet::default();
        let mut rows = Vec::new();
        for position in sorted {
            let Some(index) = self.body.index_of(position) else {
                continue;
            };
            match self.model.group_by_index(index).filter(|g| g.is_collapsed()) {
                Some(group) => {
                    for member in reorder::members_in_slot_order(&self.body, group) {
                        if seen.insert(member) {
                            rows.push(BlockRow::locked(member));
                        }
                    }
                }
                None => {
                    if seen.insert(index) {
                        rows.push(BlockRow::loose(index));
                    }
                }
            }
        }
        rows
    }

    fn apply_move(&mut self, indexes: &[usize], before: Option<usize>) -> bool {
        if !self.body.move_indexes(indexes, before) {
            return false;
        }
        let positions: Vec<usize> = indexes
            .iter()
            .filter_map(|&index| self.body.position_of(index))
            .collect();
        let change = StructuralChange::from_positions(&positions, self.body.row_count());
        self.fire(HeaderEvent::RowsReordered(change));
        true
    }

    fn apply_membership(&mut self, changes: &[MembershipChange]) {
        let mut by_target: Vec<(Option<GroupId>, Vec<usize>)> = Vec::new();
        for &(index, target) in changes {
            match by_target.iter_mut().find(|(t, _)| *t == target) {
                Some((_, indexes)) => indexes.push(index),
                None => by_target.push((target, vec![index])),
            }
        }
        for (target, indexes) in by_target {
            if let Err(err) = self.model.move_members(&indexes, target) {
                log::warn!("membership update failed: {err}");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Group reorder
    // -------------------------------------------------------------------------

    /// Move the whole group at `from`, hidden members included, in front of
    /// the row shown at `to`. Membership never changes.
    pub fn reorder_group(&mut self, from: usize, to: usize) -> bool {
        if to > self.row_count() {
            return false;
        }
        let Some(group) = self.group_by_position(from) else {
            return false;
        };
        let indexes = reorder::members_in_slot_order(&self.body, group);
        self.move_whole(&indexes, to)
    }

    /// Move the groups (or ungrouped rows) at `from` together, in position
    /// order, in front of the row shown at `to`.
    pub fn reorder_groups(&mut self, from: &[usize], to: usize) -> bool {
        let row_count = self.row_count();
        if from.is_empty() || to > row_count || from.iter().any(|&p| p >= row_count) {
            return false;
        }

        let mut sorted = from.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut seen = FxHashSet::default();
        let mut indexes = Vec::new();
        for position in sorted {
            let Some(index) = self.body.index_of(position) else {
                continue;
            };
            let unit = match self.model.group_by_index(index) {
                Some(group) => reorder::members_in_slot_order(&self.body, group),
                None => vec![index],
            };
            indexes.extend(unit.into_iter().filter(|i| seen.insert(*i)));
        }
        self.move_whole(&indexes, to)
    }

    fn move_whole(&mut self, indexes: &[usize], to: usize) -> bool {
        let moving: FxHashSet<usize> = indexes.iter().copied().collect();
        let target = reorder::drop_target(&self.body, &moving, to);
        if reorder::is_in_place(&self.body, indexes, target.before) {
            return true;
        }
        if let Err(err) = reorder::check_not_nested(&self.model, &target) {
            log::warn!("group reorder rejected: {err}");
            return false;
        }
        self.apply_move(indexes, target.before);
        self.reconcile();
        true
    }

    // -------------------------------------------------------------------------
    // Membership
    // -------------------------------------------------------------------------

    /// Group the rows at `positions` under a new group.
    ///
    /// Selected rows leave their current groups first. A scattered selection
    /// is gathered at its first row.
    pub fn create_group(&mut self, name: impl Into<String>, positions: &[usize]) -> bool {
        let indexes = self.indexes_at(positions);
        if indexes.is_empty() {
            return false;
        }
        if let Err(err) = self.check_breakable(&indexes) {
            log::warn!("create group rejected: {err}");
            return false;
        }

        self.detach(&indexes);

        let ordered = reorder::slot_ordered(&self.body, &indexes);
        if !reorder::is_contiguous(&self.body, &ordered) {
            if let Some(first_slot) = ordered.first().and_then(|&i| self.body.slot_of(i)) {
                let selected: FxHashSet<usize> = ordered.iter().copied().collect();
                let before = (first_slot..self.body.slot_count())
                    .filter_map(|slot| self.body.index_at_slot(slot))
                    .find(|index| !selected.contains(index));
                self.apply_move(&ordered, before);
            }
        }

        if let Err(err) = self.model.add_group_with_members(name, &ordered) {
            log::warn!("create group failed: {err}");
            self.reconcile();
            return false;
        }
        self.fire(HeaderEvent::GroupsChanged);
        self.reconcile();
        true
    }

    /// Remove a whole group. Its rows stay where they are.
    pub fn remove_group(&mut self, group: impl Into<GroupRef>) -> bool {
        let Some(id) = self.resolve(&group.into()) else {
            return false;
        };
        if self.model.remove_group(id).is_none() {
            return false;
        }
        self.fire(HeaderEvent::GroupsChanged);
        self.reconcile();
        true
    }

    /// Take the rows at `positions` out of their groups
    pub fn ungroup(&mut self, positions: &[usize]) -> bool {
        let indexes = self.indexes_at(positions);
        if indexes.is_empty() {
            return false;
        }
        if let Err(err) = self.check_breakable(&indexes) {
            log::warn!("ungroup rejected: {err}");
            return false;
        }
        self.detach(&indexes);
        self.fire(HeaderEvent::GroupsChanged);
        self.reconcile();
        true
    }

    pub fn clear_all_groups(&mut self) -> bool {
        if !self.model.is_empty() {
            self.model.clear();
            self.fire(HeaderEvent::GroupsChanged);
            self.reconcile();
        }
        true
    }

    /// Add ungrouped rows to a group. Rows that are not next to the group
    /// are moved up against it. Fails when any row belongs to another group.
    pub fn add_positions_to_group(&mut self, group: impl Into<GroupRef>, positions: &[usize]) -> bool {
        let Some(id) = self.resolve(&group.into()) else {
            return false;
        };
        let indexes: Vec<usize> = self
            .indexes_at(positions)
            .into_iter()
            .filter(|&index| !self.model.group(id).is_some_and(|g| g.has_member(index)))
            .collect();
        if indexes.is_empty() {
            return true;
        }

        if let Err(err) = self.model.add_members(id, &indexes) {
            log::warn!("add to group rejected: {err}");
            return false;
        }
        self.gather_into(id, &indexes);
        self.fire(HeaderEvent::GroupsChanged);
        self.reconcile();
        true
    }

    /// Remove rows from a group. Removing a row from the middle also removes
    /// every row after it.
    pub fn remove_positions_from_group(
        &mut self,
        group: impl Into<GroupRef>,
        positions: &[usize],
    ) -> bool {
        let Some(id) = self.resolve(&group.into()) else {
            return false;
        };
        let requested = self.indexes_at(positions);
        let Some(group) = self.model.group(id) else {
            return false;
        };
        let doomed = reorder::removal_set(&self.body, group, &requested);
        if doomed.is_empty() {
            return false;
        }

        if let Err(err) = self.model.remove_members(id, &doomed) {
            log::warn!("remove from group failed: {err}");
            return false;
        }
        self.fire(HeaderEvent::GroupsChanged);
        self.reconcile();
        true
    }

    pub fn set_group_unbreakable(&mut self, group: impl Into<GroupRef>, unbreakable: bool) -> bool {
        let Some(id) = self.resolve(&group.into()) else {
            return false;
        };
        match self.model.set_group_unbreakable(id, unbreakable) {
            Ok(changed) => {
                if changed {
                    self.fire(HeaderEvent::GroupsChanged);
                }
                true
            }
            Err(err) => {
                log::warn!("unbreakable flag change failed: {err}");
                false
            }
        }
    }

    /// Mark member indexes as static: they stay visible while the group is
    /// collapsed
    pub fn add_static_indexes(&mut self, group: impl Into<GroupRef>, indexes: &[usize]) -> bool {
        let Some(id) = self.resolve(&group.into()) else {
            return false;
        };
        let result = self.model.add_static_indexes(id, indexes);
        self.after_static_change(result)
    }

    pub fn remove_static_indexes(&mut self, group: impl Into<GroupRef>, indexes: &[usize]) -> bool {
        let Some(id) = self.resolve(&group.into()) else {
            return false;
        };
        let result = self.model.remove_static_indexes(id, indexes);
        self.after_static_change(result)
    }

    fn after_static_change(&mut self, result: Result<bool, GroupError>) -> bool {
        match result {
            Ok(true) => {
                self.fire(HeaderEvent::GroupsChanged);
                self.reconcile();
                true
            }
            Ok(false) => true,
            Err(err) => {
                log::warn!("static index change failed: {err}");
                false
            }
        }
    }

    /// Rows that could not change group without breaking an unbreakable one
    fn check_breakable(&self, indexes: &[usize]) -> Result<(), GroupError> {
        match indexes
            .iter()
            .find_map(|&index| self.model.group_by_index(index).filter(|g| g.is_unbreakable()))
        {
            Some(group) => Err(GroupError::Unbreakable(group.name().to_string())),
            None => Ok(()),
        }
    }

    /// Take indexes out of their groups, truncating where a group would split
    fn detach(&mut self, indexes: &[usize]) {
        let mut owners: Vec<GroupId> = Vec::new();
        for &index in indexes {
            if let Some(group) = self.model.group_by_index(index) {
                if !owners.contains(&group.id()) {
                    owners.push(group.id());
                }
            }
        }

        for id in owners {
            let Some(group) = self.model.group(id) else {
                continue;
            };
            let doomed = reorder::removal_set(&self.body, group, indexes);
            if let Err(err) = self.model.remove_members(id, &doomed) {
                log::warn!("detach from group failed: {err}");
            }
        }
    }

    /// Move freshly added members up against the rest of their group
    fn gather_into(&mut self, id: GroupId, added: &[usize]) {
        let Some(group) = self.model.group(id) else {
            return;
        };
        let ordered = reorder::members_in_slot_order(&self.body, group);
        if reorder::is_contiguous(&self.body, &ordered) {
            return;
        }

        let added: FxHashSet<usize> = added.iter().copied().collect();
        let core: Vec<usize> = ordered.iter().copied().filter(|i| !added.contains(i)).collect();
        let (Some(&first), Some(&last)) = (core.first(), core.last()) else {
            return;
        };
        let (Some(first_slot), Some(last_slot)) = (self.body.slot_of(first), self.body.slot_of(last))
        else {
            return;
        };

        let front: Vec<usize> = ordered
            .iter()
            .copied()
            .filter(|i| added.contains(i) && self.body.slot_of(*i).is_some_and(|s| s < first_slot))
            .collect();
        let back: Vec<usize> = ordered
            .iter()
            .copied()
            .filter(|i| added.contains(i) && self.body.slot_of(*i).is_some_and(|s| s > last_slot))
            .collect();

        if !front.is_empty() {
            self.apply_move(&front, Some(first));
        }
        if !back.is_empty() {
            let trailing: FxHashSet<usize> = back.iter().copied().collect();
            let before = self.body.slot_of(last).and_then(|slot| {
                (slot + 1..self.body.slot_count())
                    .filter_map(|s| self.body.index_at_slot(s))
                    .find(|index| !trailing.contains(index))
            });
            self.apply_move(&back, before);
        }
    }

    // -------------------------------------------------------------------------
    // Geometry commands
    // -------------------------------------------------------------------------

    /// Set a fixed group column width. With `downscale` the width is in device
    /// pixels and gets converted before it is stored. Turns off width
    /// calculation.
    pub fn resize_group_column(&mut self, width: i32, downscale: bool) -> bool {
        let stored = if downscale {
            self.dpi.downscale(width)
        } else {
            width
        };
        self.group_column_width = stored.max(0);
        self.calculate_width = false;
        let width = self.group_column_width();
        self.fire(HeaderEvent::GroupColumnResized { width });
        true
    }

    /// Size the group column to the longest visible group name
    pub fn set_calculate_width(&mut self, calculate: bool) -> bool {
        if self.calculate_width != calculate {
            self.calculate_width = calculate;
            let width = self.group_column_width();
            self.fire(HeaderEvent::GroupColumnResized { width });
        }
        true
    }

    pub fn client_area_resized(&mut self, width: i32, height: i32) -> bool {
        self.client_area = Rectangle::new(0, 0, width.max(0), height.max(0));
        self.fire(HeaderEvent::ClientAreaResized(self.client_area));
        true
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    /// Write groups and column settings under `prefix`
    pub fn save_state(&self, prefix: &str, properties: &mut Properties) -> Result<(), GroupError> {
        self.model.save_state(prefix, properties)?;
        let ns = namespace(prefix);
        properties.insert(format!("{ns}.calculateWidth"), self.calculate_width.to_string());
        properties.insert(format!("{ns}.groupColumnWidth"), self.group_column_width.to_string());
        Ok(())
    }

    /// Replace groups and column settings with the ones stored under
    /// `prefix`. Rows of groups that are no longer collapsed come back; rows
    /// of newly collapsed groups are hidden. Nothing changes on error.
    pub fn load_state(&mut self, prefix: &str, properties: &Properties) -> Result<(), GroupError> {
        let mut model = self.model.clone();
        model.load_state(prefix, properties)?;

        let ns = namespace(prefix);
        let calculate: Option<bool> = parse_property(properties, &format!("{ns}.calculateWidth"))?;
        let width: Option<i32> = parse_property(properties, &format!("{ns}.groupColumnWidth"))?;

        self.model = model;
        if let Some(calculate) = calculate {
            self.calculate_width = calculate;
        }
        if let Some(width) = width {
            self.group_column_width = width.max(0);
        }
        log::debug!("loaded {} groups from '{ns}'", self.model.size());
        self.fire(HeaderEvent::GroupsChanged);
        self.reconcile();
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn resolve(&self, group: &GroupRef) -> Option<GroupId> {
        let group = match group {
            GroupRef::Name(name) => self.model.group_by_name(name),
            GroupRef::Position(position) => self.model.group_by_position(*position, &self.body),
        };
        group.map(Group::id)
    }

    /// Indexes shown at `positions`, in position order, out-of-range dropped
    fn indexes_at(&self, positions: &[usize]) -> Vec<usize> {
        let mut sorted = positions.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted
            .into_iter()
            .filter_map(|position| self.body.index_of(position))
            .collect()
    }

    /// Bring hidden rows in line with the collapse flags, then refresh every
    /// projection.
    ///
    /// Rows hidden for a group that is gone or expanded come back, as do
    /// rows that became static. Collapsed groups lose every visible row
    /// except their keepers.
    fn reconcile(&mut self) {
        let released: Vec<usize> = self
            .collapse_hidden
            .iter()
            .copied()
            .filter(|&index| {
                self.model
                    .group_by_index(index)
                    .map_or(true, |g| !g.is_collapsed() || g.is_static(index))
            })
            .collect();
        if !released.is_empty() {
            for index in &released {
                self.collapse_hidden.remove(index);
            }
            self.show_with_event(&released);
        }

        // A collapsed group whose visible row went away shows its next member
        let revived: Vec<usize> = self
            .model
            .groups()
            .iter()
            .filter(|g| g.is_collapsed())
            .filter(|g| !g.members().iter().any(|&i| self.body.position_of(i).is_some()))
            .filter_map(|g| {
                reorder::members_in_slot_order(&self.body, g)
                    .into_iter()
                    .find(|index| self.collapse_hidden.contains(index))
            })
            .collect();
        if !revived.is_empty() {
            for index in &revived {
                self.collapse_hidden.remove(index);
            }
            self.show_with_event(&revived);
        }

        let mut to_hide = Vec::new();
        {
            let translator = PositionCoordinateTranslator::new(&self.body);
            for group in self.model.groups().iter().filter(|g| g.is_collapsed()) {
                let keepers = translator.collapsed_keepers(group);
                to_hide.extend(
                    translator
                        .visible_members(group)
                        .into_iter()
                        .map(|(_, index)| index)
                        .filter(|index| !keepers.contains(index)),
                );
            }
        }
        if !to_hide.is_empty() {
            let hidden = self.hide_with_event(&to_hide);
            self.collapse_hidden.extend(hidden);
        }

        self.model.update_visible(&self.body);
    }

    fn fire(&mut self, event: HeaderEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl<T: RowTransform + Clone> GroupHeaderLayer<T> {
    /// Copy of everything a command can change
    pub fn snapshot(&self) -> HeaderSnapshot<T> {
        HeaderSnapshot {
            body: self.body.clone(),
            model: self.model.clone(),
            collapse_hidden: self.collapse_hidden.clone(),
        }
    }

    /// Return to a snapshot. No events are fired.
    pub fn restore(&mut self, snapshot: HeaderSnapshot<T>) {
        self.body = snapshot.body;
        self.model = snapshot.model;
        self.collapse_hidden = snapshot.collapse_hidden;
    }
}

fn to_px(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

fn parse_property<V>(properties: &Properties, key: &str) -> Result<Option<V>, GroupError>
where
    V: FromStr,
    V::Err: Display,
{
    properties
        .get(key)
        .map(|value| {
            value.trim().parse::<V>().map_err(|e| GroupError::InvalidState {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}
