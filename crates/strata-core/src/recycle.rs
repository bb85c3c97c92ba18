use crate::error::{Error, Result};
use crate::value::{Column, Value};

/// Check that a vector of `len` values can be tiled to `target` rows.
pub fn check_recyclable(len: usize, target: usize) -> Result<()> {
    if len == target || (len > 0 && target % len == 0) {
        Ok(())
    } else {
        Err(Error::Recycling { len, target })
    }
}

/// Tile `values` to exactly `target` rows.
///
/// A vector whose length evenly divides `target` is repeated `target / len`
/// times in order; any other length is a recycling error.
pub fn recycle(values: Column, target: usize) -> Result<Column> {
    if values.len() == target {
        return Ok(values);
    }
    recycle_slice(&values, target)
}

/// Borrowing variant of [`recycle`].
pub fn recycle_slice(values: &[Value], target: usize) -> Result<Column> {
    check_recyclable(values.len(), target)?;
    Ok(values.iter().cycle().take(target).cloned().collect())
}

/// Select `values[index[i]]` for every `i`, replicating shallow rows onto
/// the deeper rows that descend from them.
pub fn gather(values: &[Value], index: &[usize]) -> Column {
    index
        .iter()
        .map(|row| values.get(*row).cloned().unwrap_or(Value::Null))
        .collect()
}
