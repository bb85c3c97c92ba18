use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rand::RngCore;

use strata_core::{Column, ROW_COUNT_IDENT, Value};
use strata_plan::IMPLICIT_LEVEL;

use crate::errors::{EvalError, FabricationError};
use crate::expr::{ParseError, parse_expression};
use crate::model::DEFAULT_MAX_ROWS;
use crate::scope::Scope;

/// Non-fatal issue noted while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalWarning {
    pub code: &'static str,
    pub message: String,
}

/// Everything an expression can see while it runs: the resolved scope, the
/// run's random source, and a sink for warnings.
pub struct EvalContext<'a> {
    scope: &'a Scope<'a>,
    rng: &'a mut dyn RngCore,
    warnings: &'a mut Vec<EvalWarning>,
    limit: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        scope: &'a Scope<'a>,
        rng: &'a mut dyn RngCore,
        warnings: &'a mut Vec<EvalWarning>,
    ) -> Self {
        Self {
            scope,
            rng,
            warnings,
            limit: DEFAULT_MAX_ROWS,
        }
    }

    /// Cap the length of any vector an expression builds.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Check that an expression may build a vector of `len` values.
    ///
    /// `None` stands for a length that overflowed while being computed.
    pub fn check_len(&self, what: &str, len: Option<usize>) -> Result<usize, EvalError> {
        match len {
            Some(len) if len <= self.limit => Ok(len),
            Some(len) => Err(EvalError::Type(format!(
                "{what} would produce {len} values, limit is {}",
                self.limit
            ))),
            None => Err(EvalError::Type(format!(
                "{what} would produce more values than the limit of {}",
                self.limit
            ))),
        }
    }

    pub fn scope(&self) -> &Scope<'a> {
        self.scope
    }

    /// Row count of the level being evaluated.
    pub fn rows(&self) -> usize {
        self.scope.rows()
    }

    /// Resolve a name through the scope chain.
    pub fn get(&self, name: &str) -> Result<Cow<'a, [Value]>, EvalError> {
        self.scope.get(name)
    }

    pub fn rng(&mut self) -> &mut dyn RngCore {
        &mut *self.rng
    }

    pub fn warn(&mut self, code: &'static str, message: impl Into<String>) {
        self.warnings.push(EvalWarning {
            code,
            message: message.into(),
        });
    }
}

/// A variable-generating expression.
///
/// The returned column may be shorter than the level; the evaluator recycles
/// it when its length evenly divides the row count.
pub trait Expression: fmt::Debug + Send + Sync {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<Column, EvalError>;
}

/// Adapter turning a closure into an [`Expression`].
pub struct FnExpression<F>(F);

impl<F> fmt::Debug for FnExpression<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnExpression(..)")
    }
}

impl<F> Expression for FnExpression<F>
where
    F: Fn(&mut EvalContext<'_>) -> Result<Column, EvalError> + Send + Sync,
{
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<Column, EvalError> {
        (self.0)(ctx)
    }
}

/// Named variable with its generating expression.
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    expr: Arc<dyn Expression>,
}

impl Variable {
    pub fn new(name: impl Into<String>, expr: impl Expression + 'static) -> Self {
        Self {
            name: name.into(),
            expr: Arc::new(expr),
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut EvalContext<'_>) -> Result<Column, EvalError> + Send + Sync + 'static,
    {
        Self::new(name, FnExpression(f))
    }

    /// Compile an expression source string.
    pub fn parse(name: impl Into<String>, source: &str) -> Result<Self, ParseError> {
        Ok(Self::new(name, parse_expression(source)?))
    }

    /// A variable holding fixed values, recycled to the level's row count.
    pub fn constant(name: impl Into<String>, values: Column) -> Self {
        Self::from_fn(name, move |_| Ok(values.clone()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expression(&self) -> &dyn Expression {
        self.expr.as_ref()
    }
}

/// Row-count specifier of a level.
#[derive(Debug, Clone)]
pub enum SizeSpec {
    /// Same number of children for every parent row.
    Count(usize),
    /// One child count per parent row.
    PerParent(Vec<usize>),
    /// Computed from the parent level; must yield one value or one value per
    /// parent row.
    Computed(Arc<dyn Expression>),
}

impl SizeSpec {
    pub fn computed(expr: impl Expression + 'static) -> Self {
        SizeSpec::Computed(Arc::new(expr))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&mut EvalContext<'_>) -> Result<Column, EvalError> + Send + Sync + 'static,
    {
        Self::computed(FnExpression(f))
    }

    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Ok(Self::computed(parse_expression(source)?))
    }
}

impl From<usize> for SizeSpec {
    fn from(value: usize) -> Self {
        SizeSpec::Count(value)
    }
}

impl From<Vec<usize>> for SizeSpec {
    fn from(value: Vec<usize>) -> Self {
        SizeSpec::PerParent(value)
    }
}

/// One level of the hierarchy: a size and ordered variables.
#[derive(Debug, Clone)]
pub struct Level {
    name: String,
    size: SizeSpec,
    variables: Vec<Variable>,
}

impl Level {
    pub fn new(name: impl Into<String>, size: impl Into<SizeSpec>) -> Self {
        Self {
            name: name.into(),
            size: size.into(),
            variables: Vec::new(),
        }
    }

    /// Append a variable; declaration order is evaluation order.
    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Append a variable compiled from an expression source string.
    pub fn expr(self, name: impl Into<String>, source: &str) -> Result<Self, ParseError> {
        Ok(self.variable(Variable::parse(name, source)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> &SizeSpec {
        &self.size
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }
}

/// A complete fabrication request.
///
/// Either a list of levels, or an implicit single level given by a root
/// size and root variables. Combining both is a configuration error.
#[derive(Debug, Clone, Default)]
pub struct Fabrication {
    root_size: Option<SizeSpec>,
    root_variables: Vec<Variable>,
    levels: Vec<Level>,
}

impl Fabrication {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count of the implicit single level.
    pub fn n(mut self, size: impl Into<SizeSpec>) -> Self {
        self.root_size = Some(size.into());
        self
    }

    /// Variable of the implicit single level.
    pub fn variable(mut self, variable: Variable) -> Self {
        self.root_variables.push(variable);
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.levels.push(level);
        self
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Check the declarations and return the levels to fabricate, shallowest
    /// first. Nothing is evaluated here.
    pub fn resolve_levels(&self) -> Result<Cow<'_, [Level]>, FabricationError> {
        let levels: Cow<'_, [Level]> = if self.levels.is_empty() {
            let size = self.root_size.clone().ok_or_else(|| {
                FabricationError::configuration(
                    IMPLICIT_LEVEL,
                    "fabrication declares no levels and no row count",
                )
            })?;
            Cow::Owned(vec![Level {
                name: IMPLICIT_LEVEL.to_string(),
                size,
                variables: self.root_variables.clone(),
            }])
        } else {
            if self.root_size.is_some() || !self.root_variables.is_empty() {
                return Err(FabricationError::configuration(
                    &self.levels[0].name,
                    "root-level N or variables cannot be combined with level declarations",
                ));
            }
            Cow::Borrowed(self.levels.as_slice())
        };

        validate_levels(&levels)?;
        Ok(levels)
    }
}

fn validate_levels(levels: &[Level]) -> Result<(), FabricationError> {
    let level_names: HashSet<&str> = levels.iter().map(|level| level.name.as_str()).collect();
    let mut seen = HashSet::new();

    for (depth, level) in levels.iter().enumerate() {
        let name = level.name.as_str();
        if name.trim().is_empty() {
            return Err(FabricationError::configuration(
                name,
                "level name must not be empty",
            ));
        }
        if name == ROW_COUNT_IDENT {
            return Err(FabricationError::configuration(
                name,
                format!("'{ROW_COUNT_IDENT}' is reserved for the row count"),
            ));
        }
        if !seen.insert(name) {
            return Err(FabricationError::configuration(
                name,
                "level name is declared more than once",
            ));
        }

        match &level.size {
            SizeSpec::Count(0) => {
                return Err(FabricationError::configuration(
                    name,
                    "size must be a positive integer, got 0",
                ));
            }
            SizeSpec::PerParent(_) if depth == 0 => {
                return Err(FabricationError::configuration(
                    name,
                    "root level size must be a single integer",
                ));
            }
            SizeSpec::PerParent(counts) if counts.contains(&0) => {
                return Err(FabricationError::configuration(
                    name,
                    "per-parent sizes must be positive integers",
                ));
            }
            _ => {}
        }

        let mut variables = HashSet::new();
        for variable in &level.variables {
            let var = variable.name();
            if var.trim().is_empty() {
                return Err(FabricationError::configuration(
                    name,
                    "variable name must not be empty",
                ));
            }
            if var == ROW_COUNT_IDENT {
                return Err(FabricationError::configuration(
                    name,
                    format!("variable '{var}' uses the reserved row-count name"),
                ));
            }
            if level_names.contains(var) {
                return Err(FabricationError::configuration(
                    name,
                    format!("variable '{var}' collides with a level identifier"),
                ));
            }
            if !variables.insert(var) {
                return Err(FabricationError::configuration(
                    name,
                    format!("variable '{var}' is declared more than once"),
                ));
            }
        }
    }

    Ok(())
}
