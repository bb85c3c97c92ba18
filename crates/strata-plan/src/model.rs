use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Row-count specifier of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum SizeDecl {
    /// Same number of rows for every parent unit.
    Count(i64),
    /// One child count per parent row.
    PerParent(Vec<i64>),
    /// Expression evaluated against the parent level.
    Expr(String),
}

impl SizeDecl {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, SizeDecl::PerParent(_))
    }
}

/// Named variable with its generating expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VariableDecl {
    pub name: String,
    /// Expression source, evaluated in declaration order.
    pub expr: String,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expr: expr.into(),
        }
    }
}

/// One level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LevelDecl {
    /// Level name; also the name of its identifier column.
    pub name: String,
    /// Row-count specifier.
    pub n: SizeDecl,
    /// Variables in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDecl>,
}

/// Optional plan-level options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanOptions {
    /// Turn non-fatal warnings into errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    /// Upper bound on the row count of any level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<u64>,
}

/// Canonical pipeline definition for fabrication.
///
/// Either `levels` or the implicit root (`n` + `variables`) is used; a
/// pipeline declaring both is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelinePlan {
    /// Contract version for the pipeline format.
    pub plan_version: String,
    /// Seed for reproducibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Row count of an implicit single level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<SizeDecl>,
    /// Variables of an implicit single level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDecl>,
    /// Hierarchy levels, shallowest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<LevelDecl>,
    /// Optional plan-level options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PlanOptions>,
}
