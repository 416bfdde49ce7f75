//! Data model for labeled tables.
//!
//! - Labels and indexes (flat or multi-level)
//! - Typed columns and scalar cells
//! - Tables
//! - Builders (ergonomic construction)

pub mod builder;
pub mod column;
pub mod label;
pub mod table;

pub use builder::TableBuilder;
pub use column::{Cell, Column, ColumnData, DType, TimeUnit};
pub use label::{Index, Label};
pub use table::Table;
