use serde::Serialize;

use strata_core::Value;

use crate::errors::FabricationError;

/// One row of a level together with the parent row that spawned it.
///
/// Identifiers are 1-based and unique within their level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowRecord {
    pub row_id: usize,
    pub parent_row_id: Option<usize>,
}

/// Rows of one level stored as a flat parent-index array.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LevelRows {
    name: String,
    /// 0-based parent row per row; empty for the root level.
    parents: Vec<usize>,
    /// Children spawned by each parent row (a single entry for the root).
    counts: Vec<usize>,
    rows: usize,
}

/// Row layout of every level in a run, shallowest first.
///
/// Children are appended in parent order, so all children of parent row 1
/// precede all children of parent row 2. Every non-root row has exactly one
/// parent, which makes the structure a tree by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyPlan {
    levels: Vec<LevelRows>,
}

impl HierarchyPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of levels pushed so far.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Append the next level.
    ///
    /// For the root, `counts` holds the single row count. For any other
    /// level it holds one child count per parent row.
    pub fn push_level(&mut self, name: &str, counts: Vec<usize>) -> Result<(), FabricationError> {
        if counts.iter().any(|count| *count == 0) {
            return Err(FabricationError::configuration(
                name,
                "sizes must be positive integers",
            ));
        }

        let Some(parent) = self.levels.last() else {
            if counts.len() != 1 {
                return Err(FabricationError::configuration(
                    name,
                    format!("root level size must be a single integer, got {} values", counts.len()),
                ));
            }
            self.levels.push(LevelRows {
                name: name.to_string(),
                parents: Vec::new(),
                rows: counts[0],
                counts,
            });
            return Ok(());
        };

        if counts.len() != parent.rows {
            return Err(FabricationError::configuration(
                name,
                format!(
                    "{} sizes given but parent level '{}' has {} rows",
                    counts.len(),
                    parent.name,
                    parent.rows
                ),
            ));
        }

        let rows = counts.iter().sum();
        let mut parents = Vec::with_capacity(rows);
        for (parent_row, count) in counts.iter().enumerate() {
            parents.extend(std::iter::repeat_n(parent_row, *count));
        }

        self.levels.push(LevelRows {
            name: name.to_string(),
            parents,
            counts,
            rows,
        });
        Ok(())
    }

    /// Name of the level at `depth`.
    pub fn name(&self, depth: usize) -> &str {
        &self.levels[depth].name
    }

    /// Row count of the level at `depth`.
    pub fn rows(&self, depth: usize) -> usize {
        self.levels[depth].rows
    }

    /// Row count of the deepest level, or zero for an empty plan.
    pub fn leaf_rows(&self) -> usize {
        self.levels.last().map(|level| level.rows).unwrap_or(0)
    }

    /// Children spawned per parent row of the level at `depth`.
    pub fn child_counts(&self, depth: usize) -> &[usize] {
        &self.levels[depth].counts
    }

    /// 0-based parent row of every row at `depth`; `None` for the root.
    pub fn parent_index(&self, depth: usize) -> Option<&[usize]> {
        if depth == 0 {
            None
        } else {
            Some(self.levels[depth].parents.as_slice())
        }
    }

    /// Map every row at `depth` to its ancestor row at `ancestor`.
    ///
    /// `ancestor == depth` yields the identity mapping.
    pub fn ancestor_index(&self, depth: usize, ancestor: usize) -> Vec<usize> {
        debug_assert!(ancestor <= depth);
        let mut index: Vec<usize> = (0..self.levels[depth].rows).collect();
        for level in (ancestor + 1..=depth).rev() {
            let parents = &self.levels[level].parents;
            for row in &mut index {
                *row = parents[*row];
            }
        }
        index
    }

    /// Row records of the level at `depth`.
    pub fn records(&self, depth: usize) -> Vec<RowRecord> {
        let level = &self.levels[depth];
        (0..level.rows)
            .map(|row| RowRecord {
                row_id: row + 1,
                parent_row_id: level.parents.get(row).map(|parent| parent + 1),
            })
            .collect()
    }

    /// 1-based row ids of every ancestor of a deepest-level row, root first.
    pub fn lineage(&self, leaf_row: usize) -> Vec<usize> {
        let Some(deepest) = self.levels.len().checked_sub(1) else {
            return Vec::new();
        };
        let mut ids = vec![0; self.levels.len()];
        let mut row = leaf_row;
        for depth in (0..=deepest).rev() {
            ids[depth] = row + 1;
            if depth > 0 {
                row = self.levels[depth].parents[row];
            }
        }
        ids
    }
}

/// Turn an evaluated size specifier into per-parent child counts.
///
/// `parent_rows` is `None` for the root level. A single value applies to
/// every parent row; otherwise there must be exactly one value per parent
/// row.
pub fn resolve_child_counts(
    level: &str,
    values: &[Value],
    parent_rows: Option<usize>,
    max_rows: usize,
) -> Result<Vec<usize>, FabricationError> {
    let counts = match parent_rows {
        None => {
            if values.len() != 1 {
                return Err(FabricationError::configuration(
                    level,
                    format!(
                        "root level size must be a single integer, got {} values",
                        values.len()
                    ),
                ));
            }
            vec![positive_count(level, &values[0])?]
        }
        Some(parent_rows) if values.len() == 1 => {
            vec![positive_count(level, &values[0])?; parent_rows]
        }
        Some(parent_rows) if values.len() == parent_rows => values
            .iter()
            .map(|value| positive_count(level, value))
            .collect::<Result<Vec<_>, _>>()?,
        Some(parent_rows) => {
            return Err(FabricationError::configuration(
                level,
                format!(
                    "size has {} values but the parent level has {parent_rows} rows",
                    values.len()
                ),
            ));
        }
    };

    let total = counts
        .iter()
        .try_fold(0_usize, |acc, count| acc.checked_add(*count))
        .unwrap_or(usize::MAX);
    if total > max_rows {
        return Err(FabricationError::configuration(
            level,
            format!("level would produce {total} rows, limit is {max_rows}"),
        ));
    }

    Ok(counts)
}

fn positive_count(level: &str, value: &Value) -> Result<usize, FabricationError> {
    match value.as_i64() {
        Some(count) if count > 0 => Ok(count as usize),
        _ => Err(FabricationError::configuration(
            level,
            format!("size must be a positive integer, got {value}"),
        )),
    }
}
