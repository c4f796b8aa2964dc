//! Commands the group header layer understands.
//!
//! One closed set, dispatched by `match` in
//! [`GroupHeaderLayer::do_command`](crate::header_layer::GroupHeaderLayer::do_command).
//! Positions are visible row positions; indexes are row identities.

/// How a command names its group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupRef {
    /// First group with this name
    Name(String),
    /// Group of the row shown at this position
    Position(usize),
}

impl From<&str> for GroupRef {
    fn from(name: &str) -> Self {
        GroupRef::Name(name.to_string())
    }
}

impl From<usize> for GroupRef {
    fn from(position: usize) -> Self {
        GroupRef::Position(position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderCommand {
    // Row structure
    HideRows { positions: Vec<usize> },
    ShowAllRows,
    ShowRowIndexes { indexes: Vec<usize> },
    ReorderRow { from: usize, to: usize },
    /// Drag start of a row reorder
    ReorderRowStart { from: usize },
    /// Drag end of a row reorder started by `ReorderRowStart`
    ReorderRowEnd { to: usize },
    MultiReorderRows { from: Vec<usize>, to: usize },
    ResetRowReorder,

    // Group structure
    ReorderGroup { from: usize, to: usize },
    ReorderGroupRange { from: Vec<usize>, to: usize },
    CreateGroup { name: String, positions: Vec<usize> },
    RemoveGroup(GroupRef),
    Ungroup { positions: Vec<usize> },
    ClearAllGroups,
    AddPositionsToGroup { group: GroupRef, positions: Vec<usize> },
    RemovePositionsFromGroup { group: GroupRef, positions: Vec<usize> },
    SetGroupUnbreakable { group: GroupRef, unbreakable: bool },
    AddStaticIndexes { group: GroupRef, indexes: Vec<usize> },
    RemoveStaticIndexes { group: GroupRef, indexes: Vec<usize> },

    // Collapse state
    CollapseExpand { position: usize },
    CollapseAll,
    ExpandAll,

    // Geometry
    /// `downscale = false` stores the pixel value as is
    ResizeGroupColumn { width: i32, downscale: bool },
    SetCalculateWidth(bool),
    ClientAreaResized { width: i32, height: i32 },
}

impl HeaderCommand {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            HeaderCommand::HideRows { .. } => "hide_rows",
            HeaderCommand::ShowAllRows => "show_all_rows",
            HeaderCommand::ShowRowIndexes { .. } => "show_row_indexes",
            HeaderCommand::ReorderRow { .. } => "reorder_row",
            HeaderCommand::ReorderRowStart { .. } => "reorder_row_start",
            HeaderCommand::ReorderRowEnd { .. } => "reorder_row_end",
            HeaderCommand::MultiReorderRows { .. } => "multi_reorder_rows",
            HeaderCommand::ResetRowReorder => "reset_row_reorder",
            HeaderCommand::ReorderGroup { .. } => "reorder_group",
            HeaderCommand::ReorderGroupRange { .. } => "reorder_group_range",
            HeaderCommand::CreateGroup { .. } => "create_group",
            HeaderCommand::RemoveGroup(_) => "remove_group",
            HeaderCommand::Ungroup { .. } => "ungroup",
            HeaderCommand::ClearAllGroups => "clear_all_groups",
            HeaderCommand::AddPositionsToGroup { .. } => "add_positions_to_group",
            HeaderCommand::RemovePositionsFromGroup { .. } => "remove_positions_from_group",
            HeaderCommand::SetGroupUnbreakable { .. } => "set_group_unbreakable",
            HeaderCommand::AddStaticIndexes { .. } => "add_static_indexes",
            HeaderCommand::RemoveStaticIndexes { .. } => "remove_static_indexes",
            HeaderCommand::CollapseExpand { .. } => "collapse_expand",
            HeaderCommand::CollapseAll => "collapse_all",
            HeaderCommand::ExpandAll => "expand_all",
            HeaderCommand::ResizeGroupColumn { .. } => "resize_group_column",
            HeaderCommand::SetCalculateWidth(_) => "set_calculate_width",
            HeaderCommand::ClientAreaResized { .. } => "client_area_resized",
        }
    }
}
