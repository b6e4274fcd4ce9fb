//! Fluent AQL query builder.
//!
//! Clauses may be added in any order; rendering always emits them as
//! `FOR`, nested `FOR`s, `LET`, `FILTER`, `COLLECT`, `SORT`, `LIMIT`,
//! `RETURN`.
//!
//! By default the first successful [`Query::render`] freezes the text: later
//! mutations are ignored until the builder is created uncached or switched
//! with [`Query::always_render`].

use crate::aql::expr::{render_object, Expr};
use crate::connection::Connection;
use crate::cursor::{Cursor, CursorOptions};
use crate::error::{QueryError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Iteration variable used when `iterate_as` is never called
pub const DEFAULT_VAR: &str = "obj";

/// What the `RETURN` clause produces
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReturnExpr {
    /// Return the iteration variable
    #[default]
    Unset,
    /// Return a single expression
    Single(Expr),
    /// Return an object literal; keys are emitted sorted
    Fields(BTreeMap<String, Expr>),
}

impl ReturnExpr {
    /// Field mapping from key/value pairs
    pub fn fields<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Expr>,
    {
        Self::Fields(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    fn render(&self, iteration_var: &str) -> std::result::Result<String, QueryError> {
        match self {
            Self::Unset => Ok(iteration_var.to_string()),
            Self::Single(expr) => expr.render(),
            Self::Fields(entries) => render_object(entries, Expr::render_field),
        }
    }
}

macro_rules! single_return_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ReturnExpr {
                fn from(value: $ty) -> Self {
                    Self::Single(value.into())
                }
            }
        )*
    };
}

single_return_from!(
    &str,
    String,
    Expr,
    crate::aql::Var,
    crate::aql::Func,
    Query
);

impl From<BTreeMap<String, Expr>> for ReturnExpr {
    fn from(entries: BTreeMap<String, Expr>) -> Self {
        Self::Fields(entries)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CollectClause {
    pairs: Vec<(Expr, Expr)>,
    into: Option<String>,
}

impl CollectClause {
    fn render(&self) -> std::result::Result<Option<String>, QueryError> {
        if self.pairs.is_empty() && self.into.is_none() {
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(self.pairs.len());
        for (name, expr) in &self.pairs {
            parts.push(format!("{} = {}", name.render()?, expr.render()?));
        }
        let mut clause = String::from("COLLECT");
        if !parts.is_empty() {
            clause.push(' ');
            clause.push_str(&parts.join(", "));
        }
        if let Some(into) = &self.into {
            clause.push_str(" INTO ");
            clause.push_str(into);
        }
        Ok(Some(clause))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Limit {
    count: u64,
    offset: Option<u64>,
}

/// An AQL query under construction.
///
/// ```
/// use arango_client::aql::Query;
///
/// let mut query = Query::new("user")
///     .iterate_as("u")
///     .filter("u.age >= 18")
///     .result_field("name", "u.name");
///
/// assert_eq!(
///     query.render().unwrap(),
///     r#"FOR u IN user FILTER u.age >= 18 RETURN {"name": u.name}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: Option<String>,
    iteration_var: String,
    source: Option<Expr>,
    nested: Vec<Expr>,
    lets: Vec<(String, Expr)>,
    filters: Vec<String>,
    collects: Vec<CollectClause>,
    sort_keys: Vec<String>,
    limit: Option<Limit>,
    return_expr: ReturnExpr,
    bind_vars: Map<String, Value>,
    cursor_options: CursorOptions,
    cache_enabled: bool,
    frozen: bool,
    snapshot: Option<String>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            collection: None,
            iteration_var: DEFAULT_VAR.to_string(),
            source: None,
            nested: Vec::new(),
            lets: Vec::new(),
            filters: Vec::new(),
            collects: Vec::new(),
            sort_keys: Vec::new(),
            limit: None,
            return_expr: ReturnExpr::Unset,
            bind_vars: Map::new(),
            cursor_options: CursorOptions::default(),
            cache_enabled: true,
            frozen: false,
            snapshot: None,
        }
    }
}

impl Query {
    /// Query iterating over a collection, render cache enabled
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: Some(collection.into()),
            ..Self::default()
        }
    }

    /// Query that re-renders on every call to [`Query::render`]
    pub fn uncached(collection: impl Into<String>) -> Self {
        Self::new(collection).always_render()
    }

    /// Disable the render cache and drop any frozen text
    pub fn always_render(mut self) -> Self {
        self.cache_enabled = false;
        self.frozen = false;
        self.snapshot = None;
        self
    }

    /// Name the variable bound by the outer `FOR`
    pub fn iterate_as(mut self, name: impl Into<String>) -> Self {
        self.iteration_var = name.into();
        self
    }

    /// Iterate over an expression instead of the collection
    pub fn over(mut self, source: impl Into<Expr>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add a nested `FOR` over another query's source.
    ///
    /// Anything that is not a [`Query`] is rejected when rendering.
    pub fn nested(mut self, query: impl Into<Expr>) -> Self {
        self.nested.push(query.into());
        self
    }

    /// Add several nested queries at once
    pub fn nested_all<I, E>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        self.nested.extend(queries.into_iter().map(Into::into));
        self
    }

    /// Add `LET name = expr`; duplicates are kept in call order
    pub fn let_(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        self.lets.push((name.into(), expr.into()));
        self
    }

    /// Add a `FILTER` line
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filters.push(condition.into());
        self
    }

    /// Add a `COLLECT` clause from alternating name/expression arguments.
    ///
    /// An odd number of arguments fails immediately.
    pub fn collect<I, E>(
        mut self,
        pairs: I,
        into: Option<&str>,
    ) -> std::result::Result<Self, QueryError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        let args: Vec<Expr> = pairs.into_iter().map(Into::into).collect();
        if args.len() % 2 != 0 {
            return Err(QueryError::OddCollectArguments { len: args.len() });
        }

        let mut iter = args.into_iter();
        let mut grouped = Vec::new();
        while let (Some(name), Some(expr)) = (iter.next(), iter.next()) {
            grouped.push((name, expr));
        }

        self.collects.push(CollectClause {
            pairs: grouped,
            into: into.map(str::to_string),
        });
        Ok(self)
    }

    /// `collect` with an `INTO` group variable
    pub fn collect_into<I, E>(self, pairs: I, into: &str) -> std::result::Result<Self, QueryError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        self.collect(pairs, Some(into))
    }

    /// Append sort keys such as `"u.name DESC"`
    pub fn sort<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Set `LIMIT count` or `LIMIT offset, count`
    pub fn limit(mut self, count: u64, offset: Option<u64>) -> Self {
        self.limit = Some(Limit { count, offset });
        self
    }

    /// Add a bind variable; later values win
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_vars.insert(name.into(), value.into());
        self
    }

    /// Merge several bind variables; later values win
    pub fn bind_all<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in vars {
            self.bind_vars.insert(name.into(), value.into());
        }
        self
    }

    /// Set the `RETURN` expression
    pub fn result(mut self, expr: impl Into<ReturnExpr>) -> Self {
        self.return_expr = expr.into();
        self
    }

    /// Add one field to an object-shaped `RETURN`
    pub fn result_field(mut self, name: impl Into<String>, expr: impl Into<Expr>) -> Self {
        match &mut self.return_expr {
            ReturnExpr::Fields(entries) => {
                entries.insert(name.into(), expr.into());
            }
            other => {
                let mut entries = BTreeMap::new();
                entries.insert(name.into(), expr.into());
                *other = ReturnExpr::Fields(entries);
            }
        }
        self
    }

    /// Stage options for the cursor created by `execute`
    pub fn cursor(mut self, options: CursorOptions) -> Self {
        self.cursor_options = options;
        self
    }

    /// Variable bound by the outer `FOR`
    pub fn iteration_var(&self) -> &str {
        &self.iteration_var
    }

    /// Bind variables collected so far
    pub fn bind_vars(&self) -> &Map<String, Value> {
        &self.bind_vars
    }

    /// Options that will be passed to the cursor
    pub fn cursor_options(&self) -> &CursorOptions {
        &self.cursor_options
    }

    /// Whether a rendered text has been frozen
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Render the query text.
    ///
    /// With caching enabled the first successful result is frozen and
    /// returned verbatim from then on.
    pub fn render(&mut self) -> std::result::Result<String, QueryError> {
        if self.frozen {
            if let Some(snapshot) = &self.snapshot {
                return Ok(snapshot.clone());
            }
        }

        let text = self.compose()?;
        if self.cache_enabled {
            self.snapshot = Some(text.clone());
            self.frozen = true;
        }
        Ok(text)
    }

    /// `FOR <var> IN <source>` for use inside another query's nested list.
    ///
    /// The default variable is suffixed with `index` so it does not collide
    /// with the outer query's.
    pub fn nested_render(&self, index: usize) -> std::result::Result<String, QueryError> {
        let var = if self.iteration_var == DEFAULT_VAR {
            format!("{}{}", DEFAULT_VAR, index)
        } else {
            self.iteration_var.clone()
        };
        Ok(format!("FOR {} IN {}", var, self.source_text()?))
    }

    /// Render and hand the query to a cursor yielding raw JSON rows.
    ///
    /// No request is sent until the cursor is pulled.
    pub fn execute(&mut self, connection: &Connection) -> Result<Cursor<Value>> {
        let text = self.render()?;
        debug!(query = %text, "executing AQL query");
        Ok(Cursor::new(
            connection.clone(),
            text,
            self.bind_vars.clone(),
            self.cursor_options.clone(),
        ))
    }

    /// Like [`Query::execute`] with a custom row decoder
    pub fn execute_with<T, F>(&mut self, connection: &Connection, decoder: F) -> Result<Cursor<T>>
    where
        F: Fn(Value) -> Result<T> + Send + Sync + 'static,
    {
        Ok(self.execute(connection)?.with_decoder(decoder))
    }

    /// Like [`Query::execute`], deserializing each row into `T`
    pub fn execute_as<T>(&mut self, connection: &Connection) -> Result<Cursor<T>>
    where
        T: DeserializeOwned + 'static,
    {
        self.execute_with(connection, |row| Ok(serde_json::from_value(row)?))
    }

    /// Frozen text if any, otherwise a fresh render without touching the cache
    pub(crate) fn text(&self) -> std::result::Result<String, QueryError> {
        match (&self.snapshot, self.frozen) {
            (Some(snapshot), true) => Ok(snapshot.clone()),
            _ => self.compose(),
        }
    }

    fn source_text(&self) -> std::result::Result<String, QueryError> {
        match (&self.source, &self.collection) {
            (Some(source), _) => source.render_unwrapped(),
            (None, Some(collection)) => Ok(collection.clone()),
            (None, None) => Err(QueryError::MissingSource),
        }
    }

    fn compose(&self) -> std::result::Result<String, QueryError> {
        let mut clauses = vec![format!(
            "FOR {} IN {}",
            self.iteration_var,
            self.source_text()?
        )];

        for (i, expr) in self.nested.iter().enumerate() {
            match expr {
                Expr::Query(query) => clauses.push(query.nested_render(i + 1)?),
                _ => return Err(QueryError::NestedNotQuery { position: i + 1 }),
            }
        }

        for (name, expr) in &self.lets {
            clauses.push(format!("LET {} = {}", name, expr.render()?));
        }

        for condition in &self.filters {
            clauses.push(format!("FILTER {}", condition));
        }

        for collect in &self.collects {
            if let Some(clause) = collect.render()? {
                clauses.push(clause);
            }
        }

        if !self.sort_keys.is_empty() {
            clauses.push(format!("SORT {}", self.sort_keys.join(", ")));
        }

        if let Some(limit) = self.limit {
            clauses.push(match limit.offset {
                Some(offset) => format!("LIMIT {}, {}", offset, limit.count),
                None => format!("LIMIT {}", limit.count),
            });
        }

        clauses.push(format!(
            "RETURN {}",
            self.return_expr.render(&self.iteration_var)?
        ));

        Ok(clauses.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aql::{Func, Var};
    use serde_json::json;

    #[test]
    fn test_simple_query() {
        let mut query = Query::new("user");
        assert_eq!(query.render().unwrap(), "FOR obj IN user RETURN obj");
    }

    #[test]
    fn test_clause_order_is_fixed() {
        let mut query = Query::uncached("user")
            .iterate_as("u")
            .result("u")
            .limit(10, Some(20))
            .sort(["u.name DESC"])
            .filter("u.active == true")
            .let_("n", "LENGTH(u.friends)")
            .collect(["city", "u.city"], Some("group"))
            .unwrap();

        assert_eq!(
            query.render().unwrap(),
            "FOR u IN user LET n = LENGTH(u.friends) FILTER u.active == true \
             COLLECT city = u.city INTO group SORT u.name DESC LIMIT 20, 10 RETURN u"
        );
    }

    #[test]
    fn test_let_with_subquery_and_function() {
        let friends = Query::new("friends")
            .iterate_as("f")
            .filter("u.id == f.userId");
        let mut query = Query::new("users")
            .iterate_as("u")
            .let_("friends", friends)
            .let_("count", Func::new("LENGTH").arg(Var::new("friends")))
            .result_field("user", "u")
            .result_field("numFriends", "count");

        assert_eq!(
            query.render().unwrap(),
            "FOR u IN users \
             LET friends = (FOR f IN friends FILTER u.id == f.userId RETURN f) \
             LET count = LENGTH(friends) \
             RETURN {\"numFriends\": count, \"user\": u}"
        );
    }

    #[test]
    fn test_over_function_source() {
        let mut query = Query::default()
            .iterate_as("p")
            .over(Func::call("PATHS", ["a", "b", "'outbound'"]));
        assert_eq!(
            query.render().unwrap(),
            "FOR p IN PATHS(a, b, 'outbound') RETURN p"
        );
    }

    #[test]
    fn test_over_subquery_is_unwrapped() {
        let inner = Query::new("users").iterate_as("x");
        let mut query = Query::default().iterate_as("u").over(inner);
        assert_eq!(
            query.render().unwrap(),
            "FOR u IN FOR x IN users RETURN x RETURN u"
        );
    }

    #[test]
    fn test_missing_source() {
        let mut query = Query::default();
        assert_eq!(query.render(), Err(QueryError::MissingSource));
        assert!(!query.is_frozen());
    }

    #[test]
    fn test_nested_default_variable_is_suffixed() {
        let mut query = Query::new("user")
            .nested(Query::new("membership"))
            .result_field("user", "obj")
            .result_field("member", "obj1");
        assert_eq!(
            query.render().unwrap(),
            r#"FOR obj IN user FOR obj1 IN membership RETURN {"member": obj1, "user": obj}"#
        );
    }

    #[test]
    fn test_nested_custom_variable_is_kept() {
        let nested = Query::new("membership").iterate_as("m");
        assert_eq!(nested.nested_render(3).unwrap(), "FOR m IN membership");
        assert_eq!(
            Query::new("membership").nested_render(3).unwrap(),
            "FOR obj3 IN membership"
        );
    }

    #[test]
    fn test_nested_non_query_is_rejected_at_render() {
        let query = Query::new("user").nested(Query::new("a")).nested("b");
        let mut query = query;
        assert_eq!(
            query.render(),
            Err(QueryError::NestedNotQuery { position: 2 })
        );
    }

    #[test]
    fn test_collect_odd_arguments_fail_immediately() {
        let err = Query::new("user").collect(["k", "v", "extra"], None).unwrap_err();
        assert_eq!(err, QueryError::OddCollectArguments { len: 3 });
    }

    #[test]
    fn test_collect_without_into() {
        let mut query = Query::new("user")
            .collect(["k", "v"], None)
            .unwrap()
            .result("k");
        assert_eq!(
            query.render().unwrap(),
            "FOR obj IN user COLLECT k = v RETURN k"
        );
    }

    #[test]
    fn test_multiple_collect_pairs() {
        let mut query = Query::new("user")
            .collect_into(["a", "obj.a", "b", "obj.b"], "g")
            .unwrap();
        assert_eq!(
            query.render().unwrap(),
            "FOR obj IN user COLLECT a = obj.a, b = obj.b INTO g RETURN obj"
        );
    }

    #[test]
    fn test_sort_keys_share_one_clause() {
        let mut query = Query::new("user")
            .sort(["obj.last ASC"])
            .sort(["obj.first"]);
        assert_eq!(
            query.render().unwrap(),
            "FOR obj IN user SORT obj.last ASC, obj.first RETURN obj"
        );
    }

    #[test]
    fn test_limit_without_offset() {
        let mut query = Query::new("user").limit(5, None);
        assert_eq!(query.render().unwrap(), "FOR obj IN user LIMIT 5 RETURN obj");
    }

    #[test]
    fn test_bind_merges_later_wins() {
        let query = Query::new("user")
            .bind("age", 18)
            .bind_all([("name", json!("ann")), ("age", json!(21))]);
        assert_eq!(query.bind_vars().get("age"), Some(&json!(21)));
        assert_eq!(query.bind_vars().get("name"), Some(&json!("ann")));
    }

    #[test]
    fn test_bind_does_not_change_text() {
        let mut plain = Query::new("user").filter("obj.age > @age");
        let mut bound = plain.clone().bind("age", 30);
        assert_eq!(plain.render().unwrap(), bound.render().unwrap());
    }

    #[test]
    fn test_render_cache_freezes_text() {
        let mut query = Query::new("user");
        let first = query.render().unwrap();
        assert!(query.is_frozen());

        let mut query = query.filter("obj.age > 1").sort(["obj.age"]);
        assert_eq!(query.render().unwrap(), first);
    }

    #[test]
    fn test_uncached_sees_mutations() {
        let mut query = Query::uncached("user");
        let first = query.render().unwrap();
        let mut query = query.filter("obj.age > 1");
        assert_ne!(query.render().unwrap(), first);
        assert!(!query.is_frozen());
    }

    #[test]
    fn test_always_render_drops_snapshot() {
        let mut query = Query::new("user");
        query.render().unwrap();
        let mut query = query.always_render().limit(1, None);
        assert_eq!(query.render().unwrap(), "FOR obj IN user LIMIT 1 RETURN obj");
    }

    #[test]
    fn test_result_unset_resets_to_iteration_var() {
        let mut query = Query::new("user")
            .iterate_as("u")
            .result("u.name")
            .result(ReturnExpr::Unset);
        assert_eq!(query.render().unwrap(), "FOR u IN user RETURN u");
    }
}
