//! Visible projection of groups.
//!
//! Every answer is read from the mapping handed in at call time; nothing here
//! caches positions across structural changes.

use crate::group::{Group, VisibleProjection};
use crate::mapping::PositionIndexMapping;

/// Translates a group's member indexes into visible positions.
pub struct PositionCoordinateTranslator<'a, M: PositionIndexMapping + ?Sized> {
    mapping: &'a M,
}

impl<'a, M: PositionIndexMapping + ?Sized> PositionCoordinateTranslator<'a, M> {
    pub fn new(mapping: &'a M) -> Self {
        Self { mapping }
    }

    /// Visible members as `(position, index)`, ordered by position
    pub fn visible_members(&self, group: &Group) -> Vec<(usize, usize)> {
        let mut visible: Vec<(usize, usize)> = group
            .members()
            .iter()
            .filter_map(|&index| self.mapping.position_of(index).map(|pos| (pos, index)))
            .collect();
        visible.sort_unstable();
        visible
    }

    /// Visible static members as `(position, index)`, ordered by position
    pub fn visible_statics(&self, group: &Group) -> Vec<(usize, usize)> {
        let mut visible: Vec<(usize, usize)> = group
            .static_indexes()
            .iter()
            .filter_map(|&index| self.mapping.position_of(index).map(|pos| (pos, index)))
            .collect();
        visible.sort_unstable();
        visible
    }

    /// Members that stay on screen while the group is collapsed.
    ///
    /// Visible static indexes when there are any, otherwise the first visible
    /// member by position. Empty when nothing of the group is visible.
    pub fn collapsed_keepers(&self, group: &Group) -> Vec<usize> {
        let statics = self.visible_statics(group);
        if !statics.is_empty() {
            return statics.into_iter().map(|(_, index)| index).collect();
        }
        self.visible_members(group)
            .first()
            .map(|&(_, index)| vec![index])
            .unwrap_or_default()
    }

    pub fn project(&self, group: &Group) -> VisibleProjection {
        let visible = self.visible_members(group);
        let Some(&(first_position, first_index)) = visible.first() else {
            return VisibleProjection::HIDDEN;
        };

        if !group.is_collapsed() {
            return VisibleProjection {
                start_index: Some(first_index),
                start_position: Some(first_position),
                span: visible.len(),
            };
        }

        let statics = self.visible_statics(group);
        match statics.first() {
            Some(&(position, index)) => VisibleProjection {
                start_index: Some(index),
                start_position: Some(position),
                span: statics.len(),
            },
            None => VisibleProjection {
                start_index: Some(first_index),
                start_position: Some(first_position),
                span: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupId;
    use crate::mapping::RowTransform;
    use crate::row_view::RowView;

    fn group(members: std::ops::Range<usize>) -> Group {
        Group::new(GroupId(1), "Address", members.collect())
    }

    #[test]
    fn test_project_expanded_group() {
        let view = RowView::new(14);
        let translator = PositionCoordinateTranslator::new(&view);
        let projection = translator.project(&group(4..8));
        assert_eq!(projection.start_index, Some(4));
        assert_eq!(projection.start_position, Some(4));
        assert_eq!(projection.span, 4);
    }

    #[test]
    fn test_project_with_hidden_first_member() {
        let mut view = RowView::new(14);
        view.hide_indexes(&[3, 4]);
        let translator = PositionCoordinateTranslator::new(&view);
        let projection = translator.project(&group(4..8));
        assert_eq!(projection.start_index, Some(5));
        assert_eq!(projection.start_position, Some(3));
        assert_eq!(projection.span, 3);
    }

    #[test]
    fn test_project_reordered_group_uses_smallest_position() {
        let mut view = RowView::new(8);
        // 7 now sits in front of 4
        view.move_indexes(&[7], Some(4));
        let translator = PositionCoordinateTranslator::new(&view);
        let projection = translator.project(&group(4..8));
        assert_eq!(projection.start_index, Some(7));
        assert_eq!(projection.start_position, Some(4));
        assert_eq!(projection.span, 4);
    }

    #[test]
    fn test_project_fully_hidden_group() {
        let mut view = RowView::new(14);
        view.hide_indexes(&[4, 5, 6, 7]);
        let g = group(4..8);
        let projection = PositionCoordinateTranslator::new(&view).project(&g);
        assert_eq!(projection, VisibleProjection::HIDDEN);
        assert_eq!(g.start_index(), 4);
    }

    #[test]
    fn test_project_collapsed_without_statics() {
        let mut view = RowView::new(14);
        let mut g = group(4..8);
        g.set_collapsed(true);
        view.hide_indexes(&[5, 6, 7]);
        let projection = PositionCoordinateTranslator::new(&view).project(&g);
        assert_eq!(projection.start_index, Some(4));
        assert_eq!(projection.start_position, Some(4));
        assert_eq!(projection.span, 1);
    }

    #[test]
    fn test_project_collapsed_prefers_statics() {
        let mut view = RowView::new(14);
        let mut g = group(4..8);
        g.add_static_indexes(&[6, 7]);
        g.set_collapsed(true);
        view.hide_indexes(&[4, 5]);

        let translator = PositionCoordinateTranslator::new(&view);
        let projection = translator.project(&g);
        assert_eq!(projection.start_index, Some(6));
        assert_eq!(projection.start_position, Some(4));
        assert_eq!(projection.span, 2);
        assert_eq!(translator.collapsed_keepers(&g), vec![6, 7]);
    }

    #[test]
    fn test_collapsed_statics_hidden_falls_back_to_one_row() {
        let mut view = RowView::new(14);
        let mut g = group(4..8);
        g.add_static_indexes(&[6]);
        g.set_collapsed(true);
        view.hide_indexes(&[6]);

        let translator = PositionCoordinateTranslator::new(&view);
        let projection = translator.project(&g);
        assert_eq!(projection.start_index, Some(4));
        assert_eq!(projection.span, 1);
        assert_eq!(translator.collapsed_keepers(&g), vec![4]);
    }
}
