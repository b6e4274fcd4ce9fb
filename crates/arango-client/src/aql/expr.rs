//! Expression nodes and the rules that turn them into AQL text.
//!
//! Every value handed to a clause method becomes an [`Expr`]. Plain strings
//! and numbers are raw AQL and pass through untouched; [`Var`], [`Func`] and
//! nested [`Query`] values carry enough structure to be rendered recursively.
//!
//! Inside an object literal, raw values are wrapped in double quotes without
//! any escaping. Embedded quotes are the caller's problem.

use crate::aql::Query;
use crate::error::QueryError;
use std::collections::{BTreeMap, HashMap};

/// A value that can appear in a query clause
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// AQL text emitted verbatim
    Raw(String),
    /// Variable reference, never auto-quoted
    Var(Var),
    /// Function call `NAME(args...)`
    Func(Func),
    /// Sub-query
    Query(Box<Query>),
    /// Object literal with sorted keys
    Object(BTreeMap<String, Expr>),
    /// Comma-separated argument list
    List(Vec<Expr>),
}

impl Expr {
    /// Raw AQL text
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    /// Object literal built from key/value pairs
    pub fn object<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Whether this node is a nested query
    pub fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    /// Render with sub-queries wrapped in parentheses
    pub fn render(&self) -> Result<String, QueryError> {
        self.render_with(true)
    }

    /// Render with a top-level sub-query left bare, for positions such as
    /// the `FOR ... IN` target
    pub fn render_unwrapped(&self) -> Result<String, QueryError> {
        self.render_with(false)
    }

    fn render_with(&self, wrap: bool) -> Result<String, QueryError> {
        match self {
            Self::Raw(text) => Ok(text.clone()),
            Self::Var(var) => Ok(var.name.clone()),
            Self::Func(func) => func.render(),
            Self::Query(query) => {
                let text = query.text()?;
                if wrap {
                    Ok(format!("({})", text))
                } else {
                    Ok(text)
                }
            }
            Self::Object(entries) => render_object(entries, Expr::render_member),
            Self::List(items) => Ok(items
                .iter()
                .map(Expr::render)
                .collect::<Result<Vec<_>, _>>()?
                .join(", ")),
        }
    }

    /// Render as a value of a `RETURN` field mapping.
    ///
    /// Raw text passes through; only an inverted `Var` becomes a string.
    pub(crate) fn render_field(&self) -> Result<String, QueryError> {
        match self {
            Self::Var(var) if var.invert => Ok(format!("\"{}\"", var.name)),
            other => other.render(),
        }
    }

    /// Render as the value of an object literal member
    fn render_member(&self) -> Result<String, QueryError> {
        match self {
            Self::Raw(text) => Ok(format!("\"{}\"", text)),
            Self::Var(var) if var.invert => Ok(format!("\"{}\"", var.name)),
            Self::Var(var) => Ok(var.name.clone()),
            Self::List(items) => Ok(format!(
                "[{}]",
                items
                    .iter()
                    .map(Expr::render_member)
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ")
            )),
            other => other.render(),
        }
    }
}

/// `{"a": .., "b": ..}` with keys in sorted order
pub(crate) fn render_object<F>(
    entries: &BTreeMap<String, Expr>,
    render_value: F,
) -> Result<String, QueryError>
where
    F: Fn(&Expr) -> Result<String, QueryError>,
{
    let pairs = entries
        .iter()
        .map(|(key, value)| Ok(format!("\"{}\": {}", key, render_value(value)?)))
        .collect::<Result<Vec<_>, QueryError>>()?;
    Ok(format!("{{{}}}", pairs.join(", ")))
}

/// A named variable reference.
///
/// Unlike a plain string, a `Var` placed inside an object literal is emitted
/// bare. An inverted `Var` goes the other way and is emitted as the quoted
/// string of its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    name: String,
    invert: bool,
}

impl Var {
    /// Reference a variable by name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            invert: false,
        }
    }

    /// A reference that renders as a string literal inside object literals
    pub fn inverted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            invert: true,
        }
    }

    /// Flip the invert flag
    pub fn invert(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the reference is inverted
    pub fn is_inverted(&self) -> bool {
        self.invert
    }
}

/// An AQL function call such as `LENGTH(friends)` or `MERGE(a, {...})`
#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    name: String,
    args: Vec<Expr>,
}

impl Func {
    /// Function with no arguments yet
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Function with the given arguments
    pub fn call<I, E>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Append an argument (builder pattern)
    pub fn arg(mut self, arg: impl Into<Expr>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render as `NAME(arg1, arg2, ...)`
    pub fn render(&self) -> Result<String, QueryError> {
        let args = self
            .args
            .iter()
            .map(Expr::render)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{}({})", self.name, args.join(", ")))
    }
}

impl From<&str> for Expr {
    fn from(text: &str) -> Self {
        Self::Raw(text.to_string())
    }
}

impl From<String> for Expr {
    fn from(text: String) -> Self {
        Self::Raw(text)
    }
}

impl From<&String> for Expr {
    fn from(text: &String) -> Self {
        Self::Raw(text.clone())
    }
}

macro_rules! raw_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Self::Raw(value.to_string())
                }
            }
        )*
    };
}

raw_from_display!(i32, i64, u32, u64, usize, f64, bool);

impl From<Var> for Expr {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<Func> for Expr {
    fn from(func: Func) -> Self {
        Self::Func(func)
    }
}

impl From<Query> for Expr {
    fn from(query: Query) -> Self {
        Self::Query(Box::new(query))
    }
}

impl From<BTreeMap<String, Expr>> for Expr {
    fn from(entries: BTreeMap<String, Expr>) -> Self {
        Self::Object(entries)
    }
}

impl<K, V> From<HashMap<K, V>> for Expr
where
    K: Into<String>,
    V: Into<Expr>,
{
    fn from(entries: HashMap<K, V>) -> Self {
        Self::object(entries)
    }
}

impl<E: Into<Expr>> From<Vec<E>> for Expr {
    fn from(items: Vec<E>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}
