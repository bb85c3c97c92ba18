use thiserror::Error;

use crate::distributions::DistributionError;

/// Errors raised while evaluating a single expression.
///
/// They carry no level or variable context; the level evaluator attaches it
/// when converting into [`FabricationError`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("cannot recycle {len} value(s) to {target} row(s)")]
    Recycling { len: usize, target: usize },
    #[error(transparent)]
    Distribution(#[from] DistributionError),
    #[error("{0}")]
    Type(String),
}

impl From<strata_core::Error> for EvalError {
    fn from(value: strata_core::Error) -> Self {
        match value {
            strata_core::Error::Recycling { len, target } => EvalError::Recycling { len, target },
            other => EvalError::Type(other.to_string()),
        }
    }
}

/// Errors emitted by a fabrication run.
#[derive(Debug, Error)]
pub enum FabricationError {
    #[error("configuration error in level '{level}': {message}")]
    Configuration { level: String, message: String },
    #[error("undefined variable '{name}' in '{level}.{variable}'")]
    UndefinedVariable {
        level: String,
        variable: String,
        name: String,
    },
    #[error("recycling error in '{level}.{variable}': cannot recycle {len} value(s) to {target} row(s)")]
    Recycling {
        level: String,
        variable: String,
        len: usize,
        target: usize,
    },
    #[error("distribution error in '{level}.{variable}': {source}")]
    Distribution {
        level: String,
        variable: String,
        #[source]
        source: DistributionError,
    },
    #[error("expression error in '{level}.{variable}': {message}")]
    Expression {
        level: String,
        variable: String,
        message: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl FabricationError {
    pub fn configuration(level: impl Into<String>, message: impl Into<String>) -> Self {
        FabricationError::Configuration {
            level: level.into(),
            message: message.into(),
        }
    }

    /// Attach level and variable context to an expression failure.
    pub fn from_eval(level: &str, variable: &str, err: EvalError) -> Self {
        let level = level.to_string();
        let variable = variable.to_string();
        match err {
            EvalError::UndefinedVariable(name) => FabricationError::UndefinedVariable {
                level,
                variable,
                name,
            },
            EvalError::Recycling { len, target } => FabricationError::Recycling {
                level,
                variable,
                len,
                target,
            },
            EvalError::Distribution(source) => FabricationError::Distribution {
                level,
                variable,
                source,
            },
            EvalError::Type(message) => FabricationError::Expression {
                level,
                variable,
                message,
            },
        }
    }

    /// Name of the level the error was raised in, when known.
    pub fn level(&self) -> Option<&str> {
        match self {
            FabricationError::Configuration { level, .. }
            | FabricationError::UndefinedVariable { level, .. }
            | FabricationError::Recycling { level, .. }
            | FabricationError::Distribution { level, .. }
            | FabricationError::Expression { level, .. } => Some(level.as_str()),
            FabricationError::Io(_) | FabricationError::Json(_) | FabricationError::Csv(_) => None,
        }
    }

    /// Name of the variable the error was raised for, when known.
    pub fn variable(&self) -> Option<&str> {
        match self {
            FabricationError::UndefinedVariable { variable, .. }
            | FabricationError::Recycling { variable, .. }
            | FabricationError::Distribution { variable, .. }
            | FabricationError::Expression { variable, .. } => Some(variable.as_str()),
            _ => None,
        }
    }
}
