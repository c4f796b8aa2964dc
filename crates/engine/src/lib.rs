pub mod commands;
pub mod error;
pub mod events;
pub mod group;
pub mod group_model;
pub mod header_layer;
pub mod mapping;
mod reorder;
pub mod row_view;
pub mod state;
pub mod translator;

#[cfg(test)]
pub mod harness;

pub use commands::{GroupRef, HeaderCommand};
pub use error::GroupError;
pub use events::{EventCollector, HeaderEvent, StructuralChange};
pub use group::{Group, GroupId, VisibleProjection};
pub use group_model::GroupModel;
pub use header_layer::{GroupHeaderCell, GroupHeaderLayer, HeaderCellValue, HeaderSnapshot};
pub use mapping::{PositionIndexMapping, RowTransform};
pub use row_view::RowView;
pub use state::{GroupState, Properties};
pub use translator::PositionCoordinateTranslator;
