//! Contracts the grouping engine needs from the layers beneath the header.
//!
//! Index = a row's identity in the data. Position = its slot among the rows
//! currently shown. Hidden rows have an index but no position.

/// Read-only index↔position translation.
pub trait PositionIndexMapping {
    /// Row index at a visible position, `None` when out of range
    fn index_of(&self, position: usize) -> Option<usize>;

    /// Visible position of a row index, `None` when hidden or unknown
    fn position_of(&self, index: usize) -> Option<usize>;

    /// Number of visible rows
    fn row_count(&self) -> usize;
}

/// Hide/show and reorder transforms the header drives.
///
/// Besides visible positions, a transform exposes the full row order
/// ("slots"), hidden rows included. Group contiguity is judged on slots so
/// hidden members keep their place inside a group.
pub trait RowTransform: PositionIndexMapping {
    /// Number of rows in the full order, hidden ones included
    fn slot_count(&self) -> usize;

    /// Slot of a row index in the full order
    fn slot_of(&self, index: usize) -> Option<usize>;

    /// Row index at a slot of the full order
    fn index_at_slot(&self, slot: usize) -> Option<usize>;

    fn is_index_hidden(&self, index: usize) -> bool;

    /// Hide rows. Returns the indexes that were visible before.
    fn hide_indexes(&mut self, indexes: &[usize]) -> Vec<usize>;

    /// Show rows. Returns the indexes that were hidden before.
    fn show_indexes(&mut self, indexes: &[usize]) -> Vec<usize>;

    /// Show every hidden row. Returns the indexes that were hidden before.
    fn show_all(&mut self) -> Vec<usize>;

    /// Move rows, in the given order, in front of `before` (or to the end
    /// when `None`). Returns whether the order changed.
    fn move_indexes(&mut self, indexes: &[usize], before: Option<usize>) -> bool;

    /// Drop any reordering. Returns whether the order changed.
    fn reset_order(&mut self) -> bool;
}
