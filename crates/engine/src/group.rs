//! A single named cluster of row indexes.

use std::collections::BTreeSet;

/// Handle of a group inside its [`GroupModel`](crate::group_model::GroupModel).
///
/// Names may repeat across groups, so mutation APIs take an id instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u64);

/// Where a group currently shows up, derived from the index↔position mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleProjection {
    /// Member index the header cell represents, `None` when fully hidden
    pub start_index: Option<usize>,
    /// Visible position of `start_index`
    pub start_position: Option<usize>,
    /// Number of visible positions the header cell covers
    pub span: usize,
}

impl VisibleProjection {
    pub const HIDDEN: Self = Self {
        start_index: None,
        start_position: None,
        span: 0,
    };

    pub fn is_visible(&self) -> bool {
        self.span > 0 && self.start_position.is_some()
    }

    /// Last visible position covered (inclusive)
    pub fn end_position(&self) -> Option<usize> {
        let start = self.start_position?;
        (self.span > 0).then(|| start + self.span - 1)
    }

    pub fn covers_position(&self, position: usize) -> bool {
        match (self.start_position, self.end_position()) {
            (Some(start), Some(end)) => (start..=end).contains(&position),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    name: String,
    /// Smallest member index. Survives the group being fully hidden.
    start_index: usize,
    members: BTreeSet<usize>,
    /// Members that stay visible while collapsed. Always a subset of members.
    static_indexes: BTreeSet<usize>,
    collapsed: bool,
    unbreakable: bool,
    visible: VisibleProjection,
}

impl Group {
    pub(crate) fn new(id: GroupId, name: impl Into<String>, members: BTreeSet<usize>) -> Self {
        let start_index = members.first().copied().unwrap_or_default();
        Self {
            id,
            name: name.into(),
            start_index,
            members,
            static_indexes: BTreeSet::new(),
            collapsed: false,
            unbreakable: false,
            visible: VisibleProjection::HIDDEN,
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Largest member index
    pub fn end_index(&self) -> usize {
        self.members.last().copied().unwrap_or(self.start_index)
    }

    /// Number of members, hidden ones included
    pub fn original_span(&self) -> usize {
        self.members.len()
    }

    pub fn members(&self) -> &BTreeSet<usize> {
        &self.members
    }

    pub fn members_sorted(&self) -> Vec<usize> {
        self.members.iter().copied().collect()
    }

    pub fn has_member(&self, index: usize) -> bool {
        self.members.contains(&index)
    }

    pub fn static_indexes(&self) -> &BTreeSet<usize> {
        &self.static_indexes
    }

    pub fn is_static(&self, index: usize) -> bool {
        self.static_indexes.contains(&index)
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn is_unbreakable(&self) -> bool {
        self.unbreakable
    }

    pub fn visible(&self) -> VisibleProjection {
        self.visible
    }

    pub fn visible_start_index(&self) -> Option<usize> {
        self.visible.start_index
    }

    pub fn visible_start_position(&self) -> Option<usize> {
        self.visible.start_position
    }

    pub fn visible_span(&self) -> usize {
        self.visible.span
    }

    pub fn is_group_start(&self, index: usize) -> bool {
        self.members.first() == Some(&index)
    }

    pub fn is_group_end(&self, index: usize) -> bool {
        self.members.last() == Some(&index)
    }

    // -------------------------------------------------------------------------
    // Mutators (driven by the model)
    // -------------------------------------------------------------------------

    pub(crate) fn add_members(&mut self, indexes: impl IntoIterator<Item = usize>) {
        self.members.extend(indexes);
        self.refresh_start_index();
    }

    /// Returns the indexes that were actually members
    pub(crate) fn remove_members(&mut self, indexes: &[usize]) -> Vec<usize> {
        let removed: Vec<usize> = indexes
            .iter()
            .copied()
            .filter(|index| self.members.remove(index))
            .collect();
        for index in &removed {
            self.static_indexes.remove(index);
        }
        self.refresh_start_index();
        removed
    }

    /// Non-members are ignored. Returns whether anything changed.
    pub(crate) fn add_static_indexes(&mut self, indexes: &[usize]) -> bool {
        let mut changed = false;
        for &index in indexes {
            if self.members.contains(&index) {
                changed |= self.static_indexes.insert(index);
            }
        }
        changed
    }

    pub(crate) fn remove_static_indexes(&mut self, indexes: &[usize]) -> bool {
        let mut changed = false;
        for index in indexes {
            changed |= self.static_indexes.remove(index);
        }
        changed
    }

    pub(crate) fn set_collapsed(&mut self, collapsed: bool) -> bool {
        let changed = self.collapsed != collapsed;
        self.collapsed = collapsed;
        changed
    }

    pub(crate) fn set_unbreakable(&mut self, unbreakable: bool) -> bool {
        let changed = self.unbreakable != unbreakable;
        self.unbreakable = unbreakable;
        changed
    }

    pub(crate) fn set_visible(&mut self, visible: VisibleProjection) {
        self.visible = visible;
        if visible.is_visible() {
            self.refresh_start_index();
        }
    }

    fn refresh_start_index(&mut self) {
        // An emptied group keeps its last start until the model drops it
        if let Some(&first) = self.members.first() {
            self.start_index = first;
        }
    }
}
