//! Group model: the authoritative set of groups for one axis.
//!
//! Key invariants:
//! - Members are row INDEXES, never positions
//! - No index belongs to more than one group
//! - A group never exists without members
//! - Groups are kept ordered by start index
//!
//! The model does not hide or show anything. Collapsing only flips a flag;
//! the owning header layer turns that into hide/show operations.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::error::GroupError;
use crate::group::{Group, GroupId};
use crate::mapping::PositionIndexMapping;
use crate::translator::PositionCoordinateTranslator;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupModel {
    groups: Vec<Group>,
    /// Member index -> owning group (O(1) lookup)
    index_lookup: FxHashMap<usize, GroupId>,
    next_id: u64,
}

impl GroupModel {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Creation / removal
    // -------------------------------------------------------------------------

    /// Create a group over `[start_index, start_index + span)`
    pub fn add_group(
        &mut self,
        name: impl Into<String>,
        start_index: usize,
        span: usize,
    ) -> Result<GroupId, GroupError> {
        let members: Vec<usize> = (start_index..start_index.saturating_add(span)).collect();
        self.add_group_with_members(name, &members)
    }

    /// Create a group from an explicit member set
    pub fn add_group_with_members(
        &mut self,
        name: impl Into<String>,
        members: &[usize],
    ) -> Result<GroupId, GroupError> {
        if members.is_empty() {
            return Err(GroupError::EmptySpan);
        }
        self.check_ungrouped(members)?;

        let id = GroupId(self.next_id);
        self.next_id += 1;
        let members: BTreeSet<usize> = members.iter().copied().collect();
        for &index in &members {
            self.index_lookup.insert(index, id);
        }
        self.groups.push(Group::new(id, name, members));
        self.sort_groups();
        Ok(id)
    }

    pub fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        let slot = self.groups.iter().position(|g| g.id() == id)?;
        let group = self.groups.remove(slot);
        for index in group.members() {
            self.index_lookup.remove(index);
        }
        Some(group)
    }

    /// Remove the first group with this name
    pub fn remove_group_by_name(&mut self, name: &str) -> Option<Group> {
        let id = self.group_by_name(name)?.id();
        self.remove_group(id)
    }

    pub fn remove_group_by_position<M>(&mut self, position: usize, mapping: &M) -> Option<Group>
    where
        M: PositionIndexMapping + ?Sized,
    {
        let id = self.group_by_position(position, mapping)?.id();
        self.remove_group(id)
    }

    pub fn clear(&mut self) {
        self.groups.clear();
        self.index_lookup.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn size(&self) -> usize {
        self.groups.len()
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id() == id)
    }

    pub fn group_by_index(&self, index: usize) -> Option<&Group> {
        let id = *self.index_lookup.get(&index)?;
        self.group(id)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// Group of the row currently shown at `position`.
    ///
    /// The position is translated through `mapping` at call time, so fully
    /// hidden groups are still found through their member indexes.
    pub fn group_by_position<M>(&self, position: usize, mapping: &M) -> Option<&Group>
    where
        M: PositionIndexMapping + ?Sized,
    {
        let index = mapping.index_of(position)?;
        self.group_by_index(index)
    }

    pub fn is_part_of_a_group(&self, index: usize) -> bool {
        self.index_lookup.contains_key(&index)
    }

    pub fn is_part_of_an_unbreakable_group(&self, index: usize) -> bool {
        self.group_by_index(index).is_some_and(Group::is_unbreakable)
    }

    pub fn is_static_index(&self, index: usize) -> bool {
        self.group_by_index(index).is_some_and(|g| g.is_static(index))
    }

    // -------------------------------------------------------------------------
    // Membership
    // -------------------------------------------------------------------------

    pub fn add_member(&mut self, id: GroupId, index: usize) -> Result<(), GroupError> {
        self.add_members(id, &[index])
    }

    /// Add indexes to a group. All-or-nothing: fails if any index belongs to
    /// another group.
    pub fn add_members(&mut self, id: GroupId, indexes: &[usize]) -> Result<(), GroupError> {
        self.group(id)
            .ok_or_else(|| GroupError::UnknownGroup(format!("{id:?}")))?;
        let foreign: Vec<usize> = indexes
            .iter()
            .copied()
            .filter(|index| self.index_lookup.get(index).is_some_and(|owner| *owner != id))
            .collect();
        self.check_ungrouped(&foreign)?;

        for &index in indexes {
            self.index_lookup.insert(index, id);
        }
        if let Some(group) = self.group_mut(id) {
            group.add_members(indexes.iter().copied());
        }
        self.sort_groups();
        Ok(())
    }

    /// Remove one member.
    ///
    /// Removing the first or last member just drops it. Removing a member in
    /// the middle would split the group, so everything from that member to
    /// the end of the group is removed instead. Returns the removed indexes;
    /// the group is deleted when it runs empty.
    pub fn remove_member(&mut self, id: GroupId, index: usize) -> Result<Vec<usize>, GroupError> {
        let group = self
            .group(id)
            .ok_or_else(|| GroupError::UnknownGroup(format!("{id:?}")))?;
        if !group.has_member(index) {
            return Err(GroupError::NotAMember {
                index,
                group: group.name().to_string(),
            });
        }

        let doomed: Vec<usize> = if group.is_group_start(index) {
            vec![index]
        } else {
            group.members().range(index..).copied().collect()
        };
        self.remove_members(id, &doomed)
    }

    /// Remove exactly the given members. Non-members are ignored. The group is
    /// deleted when it runs empty.
    pub fn remove_members(&mut self, id: GroupId, indexes: &[usize]) -> Result<Vec<usize>, GroupError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| GroupError::UnknownGroup(format!("{id:?}")))?;
        let removed = group.remove_members(indexes);
        let emptied = group.members().is_empty();

        for index in &removed {
            self.index_lookup.remove(index);
        }
        if emptied {
            self.remove_group(id);
        } else {
            self.sort_groups();
        }
        Ok(removed)
    }

    /// Move indexes out of whatever group owns them and into `target`, or
    /// leave them ungrouped when `target` is `None`. Emptied groups vanish.
    pub fn move_members(&mut self, indexes: &[usize], target: Option<GroupId>) -> Result<(), GroupError> {
        if let Some(target) = target {
            self.group(target)
                .ok_or_else(|| GroupError::UnknownGroup(format!("{target:?}")))?;
        }

        let mut by_owner: FxHashMap<GroupId, Vec<usize>> = FxHashMap::default();
        for &index in indexes {
            if let Some(&owner) = self.index_lookup.get(&index) {
                if Some(owner) != target {
                    by_owner.entry(owner).or_default().push(index);
                }
            }
        }
        for (owner, members) in by_owner {
            self.remove_members(owner, &members)?;
        }

        match target {
            // The target survives: its own members were never removed
            Some(target) => self.add_members(target, indexes),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------------

    pub fn add_static_indexes(&mut self, id: GroupId, indexes: &[usize]) -> Result<bool, GroupError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| GroupError::UnknownGroup(format!("{id:?}")))?;
        Ok(group.add_static_indexes(indexes))
    }

    pub fn remove_static_indexes(&mut self, id: GroupId, indexes: &[usize]) -> Result<bool, GroupError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| GroupError::UnknownGroup(format!("{id:?}")))?;
        Ok(group.remove_static_indexes(indexes))
    }

    pub fn set_group_unbreakable(&mut self, id: GroupId, unbreakable: bool) -> Result<bool, GroupError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| GroupError::UnknownGroup(format!("{id:?}")))?;
        Ok(group.set_unbreakable(unbreakable))
    }

    /// Mark a group collapsed. Returns whether the flag changed.
    pub fn collapse(&mut self, id: GroupId) -> Result<bool, GroupError> {
        self.set_collapsed(id, true)
    }

    /// Mark a group expanded. Returns whether the flag changed.
    pub fn expand(&mut self, id: GroupId) -> Result<bool, GroupError> {
        self.set_collapsed(id, false)
    }

    fn set_collapsed(&mut self, id: GroupId, collapsed: bool) -> Result<bool, GroupError> {
        let group = self
            .group_mut(id)
            .ok_or_else(|| GroupError::UnknownGroup(format!("{id:?}")))?;
        Ok(group.set_collapsed(collapsed))
    }

    // -------------------------------------------------------------------------
    // Projection
    // -------------------------------------------------------------------------

    /// Recompute every group's visible projection from `mapping`
    pub fn update_visible<M>(&mut self, mapping: &M)
    where
        M: PositionIndexMapping + ?Sized,
    {
        let translator = PositionCoordinateTranslator::new(mapping);
        for group in &mut self.groups {
            let projection = translator.project(group);
            group.set_visible(projection);
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Empty model that keeps handing out fresh ids, so handles taken from
    /// this model never alias groups of the replacement
    pub(crate) fn emptied(&self) -> GroupModel {
        GroupModel {
            next_id: self.next_id,
            ..GroupModel::default()
        }
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| g.id() == id)
    }

    fn check_ungrouped(&self, indexes: &[usize]) -> Result<(), GroupError> {
        for &index in indexes {
            if let Some(owner) = self.group_by_index(index) {
                return Err(GroupError::IndexAlreadyGrouped {
                    index,
                    group: owner.name().to_string(),
                });
            }
        }
        Ok(())
    }

    fn sort_groups(&mut self) {
        self.groups.sort_by_key(|g| (g.start_index(), g.id()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::RowTransform;
    use crate::row_view::RowView;

    fn fixture() -> (GroupModel, [GroupId; 4]) {
        let mut model = GroupModel::new();
        let person = model.add_group("Person", 0, 4).unwrap();
        let address = model.add_group("Address", 4, 4).unwrap();
        let facts = model.add_group("Facts", 8, 3).unwrap();
        let personal = model.add_group("Personal", 11, 3).unwrap();
        (model, [person, address, facts, personal])
    }

    #[test]
    fn test_add_group_and_lookup() {
        let (model, [person, address, ..]) = fixture();
        assert_eq!(model.size(), 4);
        assert!(!model.is_empty());

        assert_eq!(model.group_by_index(2).map(Group::id), Some(person));
        assert_eq!(model.group_by_index(4).map(Group::id), Some(address));
        assert_eq!(model.group_by_name("Facts").map(Group::start_index), Some(8));
        assert!(model.group_by_index(14).is_none());
        assert!(model.group_by_name("Nope").is_none());

        let names: Vec<&str> = model.groups().iter().map(Group::name).collect();
        assert_eq!(names, vec!["Person", "Address", "Facts", "Personal"]);
    }

    #[test]
    fn test_add_group_rejects_overlap() {
        let (mut model, _) = fixture();
        let before = model.clone();
        let err = model.add_group("Overlap", 3, 2).unwrap_err();
        assert_eq!(
            err,
            GroupError::IndexAlreadyGrouped {
                index: 3,
                group: "Person".to_string()
            }
        );
        assert_eq!(model, before);
        assert_eq!(model.add_group("Empty", 20, 0), Err(GroupError::EmptySpan));
    }

    #[test]
    fn test_duplicate_names_are_resolved_by_index() {
        let mut model = GroupModel::new();
        let first = model.add_group("Same", 0, 2).unwrap();
        let second = model.add_group("Same", 5, 2).unwrap();
        assert_ne!(first, second);
        assert_eq!(model.group_by_index(6).map(Group::id), Some(second));
        assert_eq!(model.group_by_name("Same").map(Group::id), Some(first));
    }

    #[test]
    fn test_group_by_position_follows_mapping() {
        let (model, [person, address, ..]) = fixture();
        let mut view = RowView::new(14);
        assert_eq!(model.group_by_position(3, &view).map(Group::id), Some(person));

        view.hide_indexes(&[3]);
        assert_eq!(model.group_by_position(3, &view).map(Group::id), Some(address));
        assert!(model.group_by_position(13, &view).is_none());
    }

    #[test]
    fn test_remove_first_member() {
        let (mut model, [person, ..]) = fixture();
        assert_eq!(model.remove_member(person, 0).unwrap(), vec![0]);
        let group = model.group(person).unwrap();
        assert_eq!(group.start_index(), 1);
        assert_eq!(group.original_span(), 3);
        assert!(!model.is_part_of_a_group(0));
    }

    #[test]
    fn test_remove_last_member() {
        let (mut model, [person, ..]) = fixture();
        assert_eq!(model.remove_member(person, 3).unwrap(), vec![3]);
        assert_eq!(model.group(person).unwrap().members_sorted(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_middle_member_truncates_tail() {
        let (mut model, [person, ..]) = fixture();
        assert_eq!(model.remove_member(person, 2).unwrap(), vec![2, 3]);
        assert_eq!(model.group(person).unwrap().members_sorted(), vec![0, 1]);
        assert!(!model.is_part_of_a_group(3));
    }

    #[test]
    fn test_remove_non_member_is_rejected() {
        let (mut model, [person, ..]) = fixture();
        let before = model.clone();
        assert!(matches!(
            model.remove_member(person, 5),
            Err(GroupError::NotAMember { index: 5, .. })
        ));
        assert_eq!(model, before);
    }

    #[test]
    fn test_removing_all_members_deletes_group() {
        let (mut model, [_, _, facts, _]) = fixture();
        model.remove_members(facts, &[8, 9, 10]).unwrap();
        assert!(model.group(facts).is_none());
        assert_eq!(model.size(), 3);
        assert!(!model.is_part_of_a_group(9));
    }

    #[test]
    fn test_add_members_is_atomic() {
        let (mut model, [person, ..]) = fixture();
        model.remove_member(person, 3).unwrap();
        let before = model.clone();

        // 4 belongs to Address: nothing is added
        assert!(model.add_members(person, &[3, 4]).is_err());
        assert_eq!(model, before);

        model.add_member(person, 3).unwrap();
        assert_eq!(model.group(person).unwrap().original_span(), 4);
        // Re-adding an own member is fine
        model.add_member(person, 3).unwrap();
        assert_eq!(model.group(person).unwrap().original_span(), 4);
    }

    #[test]
    fn test_move_members_merges_into_target() {
        let (mut model, [person, address, ..]) = fixture();
        model.move_members(&[3], Some(address)).unwrap();
        assert_eq!(model.group(person).unwrap().members_sorted(), vec![0, 1, 2]);
        assert_eq!(model.group(address).unwrap().members_sorted(), vec![3, 4, 5, 6, 7]);

        model.move_members(&[0, 1, 2], Some(address)).unwrap();
        assert!(model.group(person).is_none());
        assert_eq!(model.group(address).unwrap().start_index(), 0);

        model.move_members(&[7], None).unwrap();
        assert!(!model.is_part_of_a_group(7));
    }

    #[test]
    fn test_flags() {
        let (mut model, [person, ..]) = fixture();
        assert!(model.collapse(person).unwrap());
        assert!(!model.collapse(person).unwrap());
        assert!(model.group(person).unwrap().is_collapsed());
        assert!(model.expand(person).unwrap());
        assert!(!model.expand(person).unwrap());

        assert!(model.set_group_unbreakable(person, true).unwrap());
        assert!(model.is_part_of_an_unbreakable_group(1));
        assert!(!model.is_part_of_an_unbreakable_group(5));

        assert!(model.add_static_indexes(person, &[1, 9]).unwrap());
        assert!(model.is_static_index(1));
        assert!(!model.is_static_index(9));
        assert!(model.remove_static_indexes(person, &[1]).unwrap());
        assert!(!model.is_static_index(1));
    }

    #[test]
    fn test_unknown_group_is_reported() {
        let (mut model, [person, ..]) = fixture();
        model.remove_group(person).unwrap();
        assert!(matches!(model.collapse(person), Err(GroupError::UnknownGroup(_))));
        assert!(model.remove_group(person).is_none());
        assert!(model.remove_group_by_name("Person").is_none());
    }

    #[test]
    fn test_remove_group_by_name_and_position() {
        let (mut model, _) = fixture();
        let view = RowView::new(14);
        assert_eq!(model.remove_group_by_name("Address").map(|g| g.start_index()), Some(4));
        assert_eq!(
            model.remove_group_by_position(12, &view).map(|g| g.name().to_string()),
            Some("Personal".to_string())
        );
        assert_eq!(model.size(), 2);

        model.clear();
        assert!(model.is_empty());
        assert!(!model.is_part_of_a_group(0));
    }

    #[test]
    fn test_update_visible_keeps_start_index_when_hidden() {
        let (mut model, [person, ..]) = fixture();
        let mut view = RowView::new(14);
        view.hide_indexes(&[0, 1, 2, 3]);
        model.update_visible(&view);

        let group = model.group(person).unwrap();
        assert_eq!(group.visible_start_index(), None);
        assert_eq!(group.visible_start_position(), None);
        assert_eq!(group.visible_span(), 0);
        assert_eq!(group.start_index(), 0);
        assert_eq!(group.original_span(), 4);
    }
}
