//! SPARQL SELECT query builder.
//!
//! Clauses are accumulated in any order and rendered in a fixed layout:
//!
//! 1. `PREFIX` lines, sorted by prefix key, each namespace suffixed with `#`
//! 2. `SELECT` line with the selected expressions in insertion order
//! 3. `WHERE { ... }` block: triple patterns, then free-form rows, then filters
//! 4. `GROUP BY` line
//! 5. `ORDER BY` line
//!
//! The `WHERE` block is rendered only when at least one triple pattern or
//! free-form row was added. Filters without either are dropped.
//!
//! No SPARQL validation is performed.
//!
//! # Example
//!
//! ```rust
//! use sevi_sparql::builder::SparqlQueryBuilder;
//!
//! let query = SparqlQueryBuilder::new()
//!     .prefix("skos", "http://www.w3.org/2004/02/skos/core")
//!     .select(["?uri", "?label"])
//!     .triple("?uri", "skos:prefLabel", "?label")
//!     .build();
//!
//! assert!(query.starts_with("PREFIX skos: <http://www.w3.org/2004/02/skos/core#>\n"));
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;

/// Wrap a name as a SPARQL variable (`uri` -> `?uri`).
pub fn variable(name: &str) -> String {
    format!("?{}", name)
}

/// Wrap a URI as an IRI reference (`http://x` -> `<http://x>`).
pub fn urify(uri: &str) -> String {
    format!("<{}>", uri)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Triple {
    subject: String,
    predicate: String,
    object: String,
}

/// Single-use builder for SPARQL SELECT queries.
#[derive(Debug, Clone, Default)]
pub struct SparqlQueryBuilder {
    prefixes: BTreeMap<String, String>,
    select: Vec<String>,
    triples: Vec<Triple>,
    rows: Vec<String>,
    filters: Vec<String>,
    group_by: Vec<String>,
    order_by: Option<String>,
}

impl SparqlQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a prefix. The namespace is given without its trailing `#`.
    pub fn prefix(mut self, key: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.prefixes.insert(key.into(), namespace.into());
        self
    }

    /// Append selected expressions.
    pub fn select<I, S>(mut self, expressions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(expressions.into_iter().map(Into::into));
        self
    }

    /// Append a triple pattern.
    pub fn triple(
        mut self,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        self.triples.push(Triple {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        });
        self
    }

    /// Append a free-form where row, e.g. an `OPTIONAL { ... }` group.
    pub fn where_row(mut self, row: impl Into<String>) -> Self {
        self.rows.push(row.into());
        self
    }

    /// Append a filter expression (rendered as `FILTER <expr>`).
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filters.push(expression.into());
        self
    }

    /// Append a group-by expression.
    pub fn group_by(mut self, expression: impl Into<String>) -> Self {
        self.group_by.push(expression.into());
        self
    }

    /// Set the order-by expression, replacing any earlier one.
    pub fn order_by(mut self, expression: impl Into<String>) -> Self {
        self.order_by = Some(expression.into());
        self
    }

    /// Render the query text.
    pub fn build(self) -> String {
        let mut out = String::new();

        for (key, namespace) in &self.prefixes {
            let _ = writeln!(out, "PREFIX {}: <{}#>", key, namespace);
        }

        if !self.select.is_empty() {
            let _ = writeln!(out, "SELECT {}", self.select.join(" "));
        }

        if !self.triples.is_empty() || !self.rows.is_empty() {
            out.push_str("WHERE {\n");
            for t in &self.triples {
                let _ = writeln!(out, "\t{} {} {} .", t.subject, t.predicate, t.object);
            }
            for row in &self.rows {
                let _ = writeln!(out, "\t{} .", row);
            }
            for filter in &self.filters {
                let _ = writeln!(out, "\tFILTER {}", filter);
            }
            out.push_str("}\n");
        }

        if !self.group_by.is_empty() {
            let _ = writeln!(out, "\tGROUP BY {}", self.group_by.join(" "));
        }

        if let Some(order_by) = &self.order_by {
            let _ = writeln!(out, "\tORDER BY {}", order_by);
        }

        out
    }
}
