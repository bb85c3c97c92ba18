use schemars::schema::RootSchema;
use schemars::schema_for;
use serde_json::Value;

use crate::errors::PlanError;
use crate::model::PipelinePlan;

/// Emit the JSON Schema for pipeline files.
pub fn plan_json_schema() -> RootSchema {
    schema_for!(PipelinePlan)
}

/// JSON Schema for pipeline files as a JSON value.
pub fn plan_json_schema_value() -> Result<Value, PlanError> {
    Ok(serde_json::to_value(plan_json_schema())?)
}
