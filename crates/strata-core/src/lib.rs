//! Core contracts shared across Strata crates.
//!
//! This crate defines the cell `Value`, the recycling contract used to fit a
//! computed vector to a level's row count, and the flat table produced by a
//! fabrication run.

pub mod error;
pub mod recycle;
pub mod table;
pub mod value;

pub use error::{Error, Result};
pub use recycle::{check_recyclable, gather, recycle, recycle_slice};
pub use table::FlatTable;
pub use value::{Column, Value};

/// Reserved identifier bound to the row count of the level being evaluated.
pub const ROW_COUNT_IDENT: &str = "N";
