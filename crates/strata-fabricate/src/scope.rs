use std::borrow::Cow;

use strata_core::{Column, ROW_COUNT_IDENT, Value, gather};

use crate::errors::EvalError;
use crate::hierarchy::HierarchyPlan;

/// Computed variables of one level, in declaration order.
///
/// Every column has exactly the level's row count. Columns are only ever
/// appended; a computed column never changes afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableTable {
    rows: usize,
    names: Vec<String>,
    columns: Vec<Column>,
}

impl VariableTable {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            names: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> + '_ {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Append a column. The caller guarantees the length matches the level.
    pub(crate) fn push(&mut self, name: impl Into<String>, column: Column) {
        debug_assert_eq!(column.len(), self.rows);
        self.names.push(name.into());
        self.columns.push(column);
    }
}

/// Ancestor tables of one level together with the row index that maps each
/// row of that level onto its ancestor row.
///
/// Built once per level; individual [`Scope`]s borrow from it.
#[derive(Debug)]
pub struct ScopeChain<'a> {
    level: &'a str,
    rows: usize,
    ancestors: Vec<(&'a VariableTable, Vec<usize>)>,
}

impl<'a> ScopeChain<'a> {
    /// Chain for the level at `depth`, whose ancestors are `tables[..depth]`.
    pub fn new(plan: &'a HierarchyPlan, tables: &'a [VariableTable], depth: usize) -> Self {
        let ancestors = (0..depth.min(tables.len()))
            .rev()
            .map(|ancestor| (&tables[ancestor], plan.ancestor_index(depth, ancestor)))
            .collect();
        Self {
            level: plan.name(depth),
            rows: plan.rows(depth),
            ancestors,
        }
    }

    /// Chain with no ancestors, used for the root level's size.
    pub fn detached(level: &'a str, rows: usize) -> Self {
        Self {
            level,
            rows,
            ancestors: Vec::new(),
        }
    }

    pub fn level(&self) -> &'a str {
        self.level
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Scope resolving `current` first, then ancestors nearest first.
    pub fn scope<'s>(&'s self, current: &'s VariableTable) -> Scope<'s> {
        Scope {
            level: self.level,
            rows: self.rows,
            current,
            ancestors: self
                .ancestors
                .iter()
                .map(|(table, index)| (*table, index.as_slice()))
                .collect(),
        }
    }
}

/// Layered, read-only name lookup used while evaluating one expression.
///
/// Resolution order: variables already computed at the current level,
/// then ancestor variables (parent first) broadcast to the current level's
/// rows, then the reserved row-count identifier `N`.
#[derive(Debug)]
pub struct Scope<'a> {
    level: &'a str,
    rows: usize,
    current: &'a VariableTable,
    ancestors: Vec<(&'a VariableTable, &'a [usize])>,
}

impl<'a> Scope<'a> {
    pub fn level(&self) -> &'a str {
        self.level
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn contains(&self, name: &str) -> bool {
        name == ROW_COUNT_IDENT
            || self.current.get(name).is_some()
            || self
                .ancestors
                .iter()
                .any(|(table, _)| table.get(name).is_some())
    }

    /// Resolve `name` to a column of the current level's length (or a single
    /// value for `N`).
    pub fn get(&self, name: &str) -> Result<Cow<'a, [Value]>, EvalError> {
        if let Some(values) = self.current.get(name) {
            return Ok(Cow::Borrowed(values));
        }
        for (table, index) in &self.ancestors {
            if let Some(values) = table.get(name) {
                return Ok(Cow::Owned(gather(values, index)));
            }
        }
        if name == ROW_COUNT_IDENT {
            return Ok(Cow::Owned(vec![Value::Int(self.rows as i64)]));
        }
        Err(EvalError::UndefinedVariable(name.to_string()))
    }

    /// Names visible in this scope, current level first.
    pub fn visible_names(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self.current.names().iter().map(String::as_str).collect();
        for (table, _) in &self.ancestors {
            for name in table.names() {
                if !names.contains(&name.as_str()) {
                    names.push(name.as_str());
                }
            }
        }
        names
    }
}
