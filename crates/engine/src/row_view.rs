//! Row View Layer
//!
//! This module provides the hide/show and reorder transform that sits beneath
//! the group header. It maps between:
//! - Position space (what the user sees, affected by reorder and hiding)
//! - Index space (row identity, 0..N-1)
//!
//! Key invariants:
//! - The group model stores indexes only
//! - Header commands arrive in position space
//! - visible_mask is indexed by row INDEX (not position)
//! - All lookups are O(1)

use rustc_hash::FxHashSet;

use crate::mapping::{PositionIndexMapping, RowTransform};

// =============================================================================
// RowView: The core view layer mapping
// =============================================================================

/// Row view layer: maps between positions and row indexes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// Maps slot -> row index, hidden rows included
    /// Identity by default: [0, 1, 2, ..., N-1]
    /// After reorder: permuted to reflect the new order
    row_order: Vec<usize>,

    /// Inverse map: row index -> slot (O(1) lookup)
    /// Rebuilt whenever row_order changes
    index_to_slot: Vec<usize>,

    /// Visibility mask indexed by row INDEX (not position)
    /// true = visible, false = hidden
    /// Reordering doesn't affect this
    visible_mask: Vec<bool>,

    /// Visible row indexes in display order: position -> row index
    /// Rebuilt when visibility or order changes
    visible_rows: Vec<usize>,

    /// Row index -> visible position
    position_map: Vec<Option<usize>>,
}

impl Default for RowView {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RowView {
    /// Initialize identity mapping for N rows
    pub fn new(row_count: usize) -> Self {
        Self {
            row_order: (0..row_count).collect(),
            index_to_slot: (0..row_count).collect(),
            visible_mask: vec![true; row_count],
            visible_rows: (0..row_count).collect(),
            position_map: (0..row_count).map(Some).collect(),
        }
    }

    /// Total number of rows, hidden ones included
    pub fn total_count(&self) -> usize {
        self.row_order.len()
    }

    /// Number of visible rows
    pub fn visible_count(&self) -> usize {
        self.visible_rows.len()
    }

    /// Visible row indexes in display order
    pub fn visible_rows(&self) -> &[usize] {
        &self.visible_rows
    }

    /// Hidden row indexes, ascending
    pub fn hidden_indexes(&self) -> Vec<usize> {
        self.visible_mask
            .iter()
            .enumerate()
            .filter_map(|(index, &visible)| (!visible).then_some(index))
            .collect()
    }

    /// Is any row hidden?
    pub fn has_hidden_rows(&self) -> bool {
        self.visible_count() < self.total_count()
    }

    /// Is the order non-identity?
    pub fn is_reordered(&self) -> bool {
        self.row_order.iter().enumerate().any(|(i, &d)| i != d)
    }

    /// Current row_order (slot -> row index)
    pub fn row_order(&self) -> &[usize] {
        &self.row_order
    }

    /// Current visible_mask (row index -> visible)
    pub fn visible_mask(&self) -> &[bool] {
        &self.visible_mask
    }

    // -------------------------------------------------------------------------
    // Internal rebuilders
    // -------------------------------------------------------------------------

    /// Rebuild inverse map after reorder
    fn rebuild_inverse_map(&mut self) {
        if self.index_to_slot.len() != self.row_order.len() {
            self.index_to_slot.resize(self.row_order.len(), 0);
        }
        for (slot, &index) in self.row_order.iter().enumerate() {
            if index < self.index_to_slot.len() {
                self.index_to_slot[index] = slot;
            }
        }
    }

    /// Rebuild visible_rows and position_map (visible rows in order)
    fn rebuild_visible_cache(&mut self) {
        self.visible_rows = self
            .row_order
            .iter()
            .copied()
            .filter(|&index| index < self.visible_mask.len() && self.visible_mask[index])
            .collect();

        self.position_map = vec![None; self.row_order.len()];
        for (position, &index) in self.visible_rows.iter().enumerate() {
            self.position_map[index] = Some(position);
        }
    }

    // -------------------------------------------------------------------------
    // Mutators
    // -------------------------------------------------------------------------

    /// Resize to match a new row count. New rows are appended visible.
    pub fn resize(&mut self, new_row_count: usize) {
        let old_count = self.row_order.len();

        if new_row_count > old_count {
            for i in old_count..new_row_count {
                self.row_order.push(i);
                self.visible_mask.push(true);
            }
        } else if new_row_count < old_count {
            self.row_order.retain(|&d| d < new_row_count);
            self.visible_mask.truncate(new_row_count);
        }

        self.index_to_slot.resize(new_row_count, 0);
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    /// Restore a previously captured row_order + visible_mask
    pub fn restore(&mut self, row_order: Vec<usize>, visible_mask: Vec<bool>) {
        self.row_order = row_order;
        self.visible_mask = visible_mask;
        self.index_to_slot.resize(self.row_order.len(), 0);
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
    }

    fn set_visibility(&mut self, indexes: &[usize], visible: bool) -> Vec<usize> {
        let mut changed = Vec::new();
        for &index in indexes {
            if index < self.visible_mask.len() && self.visible_mask[index] != visible {
                self.visible_mask[index] = visible;
                changed.push(index);
            }
        }
        if !changed.is_empty() {
            self.rebuild_visible_cache();
        }
        changed
    }
}

impl PositionIndexMapping for RowView {
    fn index_of(&self, position: usize) -> Option<usize> {
        self.visible_rows.get(position).copied()
    }

    fn position_of(&self, index: usize) -> Option<usize> {
        self.position_map.get(index).copied().flatten()
    }

    fn row_count(&self) -> usize {
        self.visible_count()
    }
}

impl RowTransform for RowView {
    fn slot_count(&self) -> usize {
        self.row_order.len()
    }

    fn slot_of(&self, index: usize) -> Option<usize> {
        self.index_to_slot.get(index).copied()
    }

    fn index_at_slot(&self, slot: usize) -> Option<usize> {
        self.row_order.get(slot).copied()
    }

    fn is_index_hidden(&self, index: usize) -> bool {
        index < self.visible_mask.len() && !self.visible_mask[index]
    }

    fn hide_indexes(&mut self, indexes: &[usize]) -> Vec<usize> {
        self.set_visibility(indexes, false)
    }

    fn show_indexes(&mut self, indexes: &[usize]) -> Vec<usize> {
        self.set_visibility(indexes, true)
    }

    fn show_all(&mut self) -> Vec<usize> {
        let hidden = self.hidden_indexes();
        self.set_visibility(&hidden, true)
    }

    fn move_indexes(&mut self, indexes: &[usize], before: Option<usize>) -> bool {
        let moving: FxHashSet<usize> = indexes
            .iter()
            .copied()
            .filter(|&index| index < self.row_order.len())
            .collect();
        if moving.is_empty() {
            return false;
        }

        // An anchor that is itself moving resolves to the next row that stays
        let anchor = before.and_then(|b| {
            let start = self.slot_of(b)?;
            self.row_order[start..]
                .iter()
                .copied()
                .find(|index| !moving.contains(index))
        });

        let mut order: Vec<usize> = self
            .row_order
            .iter()
            .copied()
            .filter(|index| !moving.contains(index))
            .collect();
        let insert_at = anchor
            .and_then(|a| order.iter().position(|&index| index == a))
            .unwrap_or(order.len());

        let mut seen = FxHashSet::default();
        let block: Vec<usize> = indexes
            .iter()
            .copied()
            .filter(|index| moving.contains(index) && seen.insert(*index))
            .collect();
        order.splice(insert_at..insert_at, block);

        if order == self.row_order {
            return false;
        }
        self.row_order = order;
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
        true
    }

    fn reset_order(&mut self) -> bool {
        if !self.is_reordered() {
            return false;
        }
        self.row_order = (0..self.row_order.len()).collect();
        self.rebuild_inverse_map();
        self.rebuild_visible_cache();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_view_identity() {
        let view = RowView::new(5);
        assert_eq!(view.total_count(), 5);
        assert_eq!(view.row_count(), 5);

        for i in 0..5 {
            assert_eq!(view.index_of(i), Some(i));
            assert_eq!(view.position_of(i), Some(i));
            assert_eq!(view.slot_of(i), Some(i));
            assert!(!view.is_index_hidden(i));
        }

        assert_eq!(view.index_of(5), None);
        assert_eq!(view.position_of(5), None);
        assert!(!view.is_reordered());
        assert!(!view.has_hidden_rows());
    }

    #[test]
    fn test_row_view_hide_and_show() {
        let mut view = RowView::new(5);

        assert_eq!(view.hide_indexes(&[1, 3, 3]), vec![1, 3]);
        assert!(view.has_hidden_rows());
        assert_eq!(view.row_count(), 3);
        assert_eq!(view.visible_rows(), &[0, 2, 4]);
        assert_eq!(view.position_of(1), None);
        assert_eq!(view.position_of(4), Some(2));
        // Slots keep hidden rows
        assert_eq!(view.slot_of(4), Some(4));

        // Hiding again reports nothing new
        assert!(view.hide_indexes(&[1]).is_empty());

        assert_eq!(view.show_indexes(&[3]), vec![3]);
        assert_eq!(view.visible_rows(), &[0, 2, 3, 4]);

        assert_eq!(view.show_all(), vec![1]);
        assert_eq!(view.row_count(), 5);
        assert!(view.hidden_indexes().is_empty());
    }

    #[test]
    fn test_row_view_move_indexes() {
        let mut view = RowView::new(5);

        // Move 4 in front of 1
        assert!(view.move_indexes(&[4], Some(1)));
        assert_eq!(view.row_order(), &[0, 4, 1, 2, 3]);
        assert_eq!(view.position_of(4), Some(1));
        assert_eq!(view.index_of(4), Some(3));

        // Move 0 to the end
        assert!(view.move_indexes(&[0], None));
        assert_eq!(view.row_order(), &[4, 1, 2, 3, 0]);

        // Moving in front of itself is a no-op
        assert!(!view.move_indexes(&[1], Some(1)));

        assert!(view.reset_order());
        assert_eq!(view.row_order(), &[0, 1, 2, 3, 4]);
        assert!(!view.reset_order());
    }

    #[test]
    fn test_row_view_move_block_with_anchor_inside() {
        let mut view = RowView::new(6);
        // Anchor is part of the moving block: resolves to the next staying row
        assert!(!view.move_indexes(&[1, 2], Some(2)));
        assert!(view.move_indexes(&[4, 1], Some(0)));
        assert_eq!(view.row_order(), &[4, 1, 0, 2, 3, 5]);
    }

    #[test]
    fn test_row_view_move_keeps_hidden_state() {
        let mut view = RowView::new(4);
        view.hide_indexes(&[2]);
        assert!(view.move_indexes(&[2], Some(0)));
        assert_eq!(view.row_order(), &[2, 0, 1, 3]);
        assert_eq!(view.position_of(2), None);
        assert_eq!(view.index_of(0), Some(0));
        assert_eq!(view.slot_of(2), Some(0));
    }

    #[test]
    fn test_row_view_resize_and_restore() {
        let mut view = RowView::new(3);
        view.hide_indexes(&[1]);
        let order = view.row_order().to_vec();
        let mask = view.visible_mask().to_vec();

        view.resize(5);
        assert_eq!(view.total_count(), 5);
        assert_eq!(view.row_count(), 4);

        view.resize(2);
        assert_eq!(view.row_order(), &[0, 1]);

        view.restore(order, mask);
        assert_eq!(view.total_count(), 3);
        assert_eq!(view.visible_rows(), &[0, 2]);
    }
}
