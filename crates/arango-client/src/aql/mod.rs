//! AQL query construction.
//!
//! [`Query`] assembles clauses; [`Expr`], [`Var`] and [`Func`] describe the
//! values placed in them.

mod expr;
mod query;

pub use expr::{Expr, Func, Var};
pub use query::{Query, ReturnExpr, DEFAULT_VAR};
