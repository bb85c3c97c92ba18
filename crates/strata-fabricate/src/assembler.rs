use strata_core::{FlatTable, gather};

use crate::errors::FabricationError;
use crate::hierarchy::HierarchyPlan;
use crate::scope::VariableTable;

/// Assemble every level's variables into one table over the deepest level.
///
/// Columns follow level order, then declaration order within a level. A
/// name declared again at a deeper level keeps its first position and takes
/// the deeper values.
pub fn assemble(
    plan: &HierarchyPlan,
    tables: &[VariableTable],
) -> Result<FlatTable, FabricationError> {
    let Some(deepest) = plan.depth().checked_sub(1) else {
        return Ok(FlatTable::new(0));
    };
    if tables.len() != plan.depth() {
        return Err(FabricationError::configuration(
            plan.name(deepest),
            format!(
                "{} of {} levels were evaluated",
                tables.len(),
                plan.depth()
            ),
        ));
    }

    let mut flat = FlatTable::new(plan.leaf_rows());
    for (depth, table) in tables.iter().enumerate() {
        let index = plan.ancestor_index(deepest, depth);
        for (name, values) in table.iter() {
            let column = if depth == deepest {
                values.to_vec()
            } else {
                gather(values, &index)
            };
            flat.insert(name, column).map_err(|err| {
                FabricationError::configuration(plan.name(depth), err.to_string())
            })?;
        }
    }
    Ok(flat)
}
