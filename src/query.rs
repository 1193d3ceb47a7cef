use std::borrow::Cow;
use std::sync::Arc;

use crate::error::DalError;
use crate::translation::bind_named;
use crate::types::RowValues;

/// Immutable SQL text plus the parameters bound to it.
///
/// Parameters are either positional (`@P1`, `@P2`, ...) or named (`@id`,
/// `@name`). Values are only ever sent to the driver as bound parameters:
/// ```rust
/// use dashboard_dal::prelude::*;
///
/// let query = QueryDescriptor::new("SELECT id, name FROM branches WHERE id = @id")
///     .bind("id", 42);
/// let statement = query.prepare()?;
/// assert_eq!(statement.sql, "SELECT id, name FROM branches WHERE id = @P1");
/// assert_eq!(statement.params, vec![&RowValues::Int(42)]);
/// # Ok::<(), DalError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    sql: Arc<str>,
    positional: Vec<RowValues>,
    named: Vec<(String, RowValues)>,
    returns_rows: bool,
}

/// A descriptor resolved into driver-ready form: ordinal placeholders and the
/// values in ordinal order.
#[derive(Debug, PartialEq)]
pub struct PreparedStatement<'a> {
    pub sql: Cow<'a, str>,
    pub params: Vec<&'a RowValues>,
}

impl QueryDescriptor {
    /// A statement that returns rows.
    pub fn new(sql: impl Into<Arc<str>>) -> Self {
        Self {
            sql: sql.into(),
            positional: Vec::new(),
            named: Vec::new(),
            returns_rows: true,
        }
    }

    /// A statement (INSERT/UPDATE/DELETE) whose outcome is an affected-row count.
    pub fn dml(sql: impl Into<Arc<str>>) -> Self {
        Self {
            returns_rows: false,
            ..Self::new(sql)
        }
    }

    /// Bind a value to `@name`.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.named.push((name.into(), value.into()));
        self
    }

    /// Bind the next positional value (`@P1`, `@P2`, ...).
    #[must_use]
    pub fn param(mut self, value: impl Into<RowValues>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Replace the positional values wholesale.
    #[must_use]
    pub fn with_params(mut self, params: Vec<RowValues>) -> Self {
        self.positional = params;
        self
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn returns_rows(&self) -> bool {
        self.returns_rows
    }

    #[must_use]
    pub fn param_count(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    /// Value bound to `@name`, if any.
    #[must_use]
    pub fn named_value(&self, name: &str) -> Option<&RowValues> {
        self.named
            .iter()
            .find(|(bound, _)| bound.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn positional_values(&self) -> &[RowValues] {
        &self.positional
    }

    /// Resolve named parameters to ordinals.
    ///
    /// # Errors
    /// Returns `DalError::ParameterError` when positional and named values are
    /// mixed or a parameter name is invalid or duplicated.
    pub fn prepare(&self) -> Result<PreparedStatement<'_>, DalError> {
        if self.named.is_empty() {
            return Ok(PreparedStatement {
                sql: Cow::Borrowed(&*self.sql),
                params: self.positional.iter().collect(),
            });
        }
        if !self.positional.is_empty() {
            return Err(DalError::ParameterError(
                "cannot mix positional and named parameters".into(),
            ));
        }
        let names: Vec<&str> = self.named.iter().map(|(name, _)| name.as_str()).collect();
        Ok(PreparedStatement {
            sql: bind_named(&*self.sql, &names)?,
            params: self.named.iter().map(|(_, value)| value).collect(),
        })
    }
}
