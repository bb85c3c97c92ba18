//! Declarative pipeline contracts and validation for Strata.
//!
//! A pipeline describes a hierarchy of levels, each with a row-count
//! specifier and an ordered list of variable expressions. This crate owns the
//! serialized format (JSON or TOML), its JSON Schema, and the structural and
//! semantic checks run before any fabrication starts.

pub mod errors;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{IssueSeverity, PlanError, Result, ValidationIssue, ValidationReport};
pub use model::{LevelDecl, PipelinePlan, PlanOptions, SizeDecl, VariableDecl};
pub use schema::{plan_json_schema, plan_json_schema_value};
pub use validate::{
    ValidatedPlan, load_plan_value, validate_plan, validate_plan_json, validate_plan_semantics,
};

/// Current contract version for pipeline files.
pub const PLAN_VERSION: &str = "0.1";

/// Level name used when a pipeline declares root variables without levels.
pub const IMPLICIT_LEVEL: &str = "ID";
