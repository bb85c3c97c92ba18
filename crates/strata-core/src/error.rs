use thiserror::Error;

/// Core error type shared across Strata crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A vector cannot be tiled to the requested length.
    #[error("cannot recycle {len} value(s) to {target} row(s)")]
    Recycling { len: usize, target: usize },
    /// A column does not have the table's row count.
    #[error("column '{column}' has {len} value(s), table has {rows} row(s)")]
    ColumnLength {
        column: String,
        len: usize,
        rows: usize,
    },
    /// A value could not be interpreted as required.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Convenience alias for results returned by Strata crates.
pub type Result<T> = std::result::Result<T, Error>;
