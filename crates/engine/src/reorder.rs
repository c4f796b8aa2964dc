//! Reorder planning.
//!
//! Works out where a dragged block of rows lands in the full row order and
//! which group each row belongs to afterwards. Nothing here mutates; the
//! header applies a plan only once it has been accepted as a whole.
//!
//! Membership after a row drop is decided by the staying neighbors of the
//! block in the full order (hidden rows included):
//! - both neighbors in the same group: every row joins that group
//! - otherwise a leading run of rows from the previous neighbor's group and
//!   a trailing run from the next neighbor's group keep their group
//! - every other row ends up ungrouped

use rustc_hash::FxHashSet;

use crate::error::GroupError;
use crate::group::{Group, GroupId};
use crate::group_model::GroupModel;
use crate::mapping::RowTransform;

/// Where a block lands, as its staying neighbors in the full order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DropTarget {
    /// First staying row after the block, `None` = end of the order
    pub before: Option<usize>,
    /// Last staying row in front of the block
    pub prev: Option<usize>,
}

/// One row of a dragged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockRow {
    pub index: usize,
    /// Moves along with its whole group; membership never changes
    pub locked: bool,
}

impl BlockRow {
    pub fn loose(index: usize) -> Self {
        Self { index, locked: false }
    }

    pub fn locked(index: usize) -> Self {
        Self { index, locked: true }
    }
}

/// Row index and the group it belongs to after the drop
pub(crate) type MembershipChange = (usize, Option<GroupId>);

/// Resolve the insertion position `to` (a visible position, or the row
/// count for "at the end") against the rows that stay put.
pub(crate) fn drop_target<T>(body: &T, moving: &FxHashSet<usize>, to: usize) -> DropTarget
where
    T: RowTransform + ?Sized,
{
    let before = body.index_of(to).and_then(|anchor| {
        let start = body.slot_of(anchor)?;
        (start..body.slot_count())
            .filter_map(|slot| body.index_at_slot(slot))
            .find(|index| !moving.contains(index))
    });
    let end = before
        .and_then(|index| body.slot_of(index))
        .unwrap_or_else(|| body.slot_count());
    let prev = (0..end)
        .rev()
        .filter_map(|slot| body.index_at_slot(slot))
        .find(|index| !moving.contains(index));
    DropTarget { before, prev }
}

/// Whether moving `block` in front of `before` would leave the order as is
pub(crate) fn is_in_place<T>(body: &T, block: &[usize], before: Option<usize>) -> bool
where
    T: RowTransform + ?Sized,
{
    let end = match before {
        Some(index) => match body.slot_of(index) {
            Some(slot) => slot,
            None => return false,
        },
        None => body.slot_count(),
    };
    let Some(start) = end.checked_sub(block.len()) else {
        return false;
    };
    block
        .iter()
        .enumerate()
        .all(|(offset, &index)| body.index_at_slot(start + offset) == Some(index))
}

/// Sort indexes by their slot in the full order. Unknown indexes are dropped.
pub(crate) fn slot_ordered<T>(body: &T, indexes: &[usize]) -> Vec<usize>
where
    T: RowTransform + ?Sized,
{
    let mut slotted: Vec<(usize, usize)> = indexes
        .iter()
        .filter_map(|&index| body.slot_of(index).map(|slot| (slot, index)))
        .collect();
    slotted.sort_unstable();
    slotted.dedup();
    slotted.into_iter().map(|(_, index)| index).collect()
}

/// Whether the indexes occupy consecutive slots
pub(crate) fn is_contiguous<T>(body: &T, indexes: &[usize]) -> bool
where
    T: RowTransform + ?Sized,
{
    let mut slots: Vec<usize> = indexes.iter().filter_map(|&i| body.slot_of(i)).collect();
    slots.sort_unstable();
    slots.windows(2).all(|pair| pair[1] == pair[0] + 1)
}

pub(crate) fn members_in_slot_order<T>(body: &T, group: &Group) -> Vec<usize>
where
    T: RowTransform + ?Sized,
{
    let members: Vec<usize> = group.members().iter().copied().collect();
    slot_ordered(body, &members)
}

/// Members that actually leave `group` when `requested` are removed.
///
/// Requests are taken in display order. The first remaining member just
/// leaves. Any other member takes every member after it along, since the
/// group cannot be split in two.
pub(crate) fn removal_set<T>(body: &T, group: &Group, requested: &[usize]) -> Vec<usize>
where
    T: RowTransform + ?Sized,
{
    let mut remaining = members_in_slot_order(body, group);
    let requested: Vec<usize> = requested
        .iter()
        .copied()
        .filter(|&index| group.has_member(index))
        .collect();

    let mut removed = Vec::new();
    for index in slot_ordered(body, &requested) {
        let Some(at) = remaining.iter().position(|&m| m == index) else {
            continue;
        };
        if at == 0 {
            removed.push(remaining.remove(0));
        } else {
            removed.extend(remaining.drain(at..));
            break;
        }
    }
    removed
}

/// Membership changes for dropping `block` at `target`.
///
/// Fails without planning anything when a change would break an unbreakable
/// group, or when a locked group would land inside another group.
pub(crate) fn plan_membership(
    model: &GroupModel,
    block: &[BlockRow],
    target: &DropTarget,
) -> Result<Vec<MembershipChange>, GroupError> {
    let owner = |index: usize| model.group_by_index(index).map(Group::id);
    let prev_group = target.prev.and_then(owner);
    let next_group = target.before.and_then(owner);

    let mut changes = Vec::new();
    if let Some(enclosing) = prev_group.filter(|_| prev_group == next_group) {
        if block.iter().any(|row| row.locked) {
            return Err(GroupError::NestedGroup(group_name(model, enclosing)));
        }
        for row in block {
            if owner(row.index) != Some(enclosing) {
                changes.push((row.index, Some(enclosing)));
            }
        }
    } else {
        let mut keep: Vec<bool> = block.iter().map(|row| row.locked).collect();
        for (slot, row) in block.iter().enumerate() {
            let group = owner(row.index);
            if row.locked || group.is_none() || group != prev_group {
                break;
            }
            keep[slot] = true;
        }
        for (slot, row) in block.iter().enumerate().rev() {
            let group = owner(row.index);
            if row.locked || keep[slot] || group.is_none() || group != next_group {
                break;
            }
            keep[slot] = true;
        }
        for (row, kept) in block.iter().zip(keep) {
            if !kept && owner(row.index).is_some() {
                changes.push((row.index, None));
            }
        }
    }

    for &(index, target) in &changes {
        if let Some(group) = model.group_by_index(index).filter(|g| g.is_unbreakable()) {
            return Err(GroupError::Unbreakable(group.name().to_string()));
        }
        if let Some(group) = target.and_then(|id| model.group(id)).filter(|g| g.is_unbreakable()) {
            return Err(GroupError::Unbreakable(group.name().to_string()));
        }
    }
    Ok(changes)
}

/// Reject a drop strictly inside a group
pub(crate) fn check_not_nested(model: &GroupModel, target: &DropTarget) -> Result<(), GroupError> {
    let owner = |index: usize| model.group_by_index(index).map(Group::id);
    match (target.prev.and_then(owner), target.before.and_then(owner)) {
        (Some(prev), Some(next)) if prev == next => Err(GroupError::NestedGroup(group_name(model, prev))),
        _ => Ok(()),
    }
}

fn group_name(model: &GroupModel, id: GroupId) -> String {
    model
        .group(id)
        .map(|g| g.name().to_string())
        .unwrap_or_else(|| format!("{id:?}"))
}
