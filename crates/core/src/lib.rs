//! Core types shared by the grouping engine and its configuration.
//!
//! Nothing in here knows about groups: these are the geometry, labelling,
//! DPI and text measurement primitives a header layer is rendered with.

pub mod dpi;
pub mod geometry;
pub mod labels;
pub mod measure;

pub use dpi::{DpiConverter, IntegerScale};
pub use geometry::Rectangle;
pub use labels::{ConfigLabelAccumulator, LabelStack};
pub use measure::{CharCellMeasure, TextMeasure};
