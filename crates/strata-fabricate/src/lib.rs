//! Hierarchical fabrication engine for Strata.
//!
//! A fabrication is an ordered list of levels. Each level declares how many
//! rows every parent row spawns and a list of variables computed, in order,
//! from earlier variables of the same level and from ancestor levels
//! broadcast down the hierarchy. The result is one flat table with one row
//! per unit of the deepest level.

pub mod assembler;
pub mod compile;
pub mod distributions;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod expr;
pub mod hierarchy;
pub mod level;
pub mod model;
pub mod output;
pub mod scope;

pub use assembler::assemble;
pub use compile::compile_plan;
pub use engine::{FabricationEngine, FabricationResult};
pub use errors::{EvalError, FabricationError};
pub use expr::{CompiledExpr, ParseError, parse_expression};
pub use hierarchy::{HierarchyPlan, RowRecord};
pub use level::{EvalContext, Expression, Fabrication, Level, SizeSpec, Variable};
pub use model::{FabricateOptions, FabricationIssue, FabricationReport, LevelReport};
pub use output::{write_table_csv, write_table_json};
pub use scope::{Scope, VariableTable};
