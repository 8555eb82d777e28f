//! Projection of tabular query results onto [`Concept`] records.

use sevi_core::defaults;
use sevi_core::{Concept, Solution, Solutions};

/// Build a concept from a row. Unbound columns become empty strings.
pub fn project(row: &Solution) -> Concept {
    Concept::new(
        row.value_or_empty("uri"),
        row.value_or_empty("label"),
        row.value_or_empty("notation"),
        row.value_or_empty("scheme"),
    )
}

/// Whether `scheme` is one of the reserved schemes that are never surfaced.
pub fn is_reserved_scheme(scheme: &str) -> bool {
    scheme.ends_with(defaults::AGGREGATE_SCHEME_SUFFIX)
        || scheme.ends_with(defaults::DEPRECATED_SCHEME_SUFFIX)
}

/// Lazy sequence of concepts over an open query result.
///
/// Placeholder rows (empty `uri`) are skipped. With reserved-scheme screening
/// on, rows of the aggregate and deprecated schemes are skipped too. The
/// underlying execution handle is released when the sequence is dropped,
/// exhausted, or closed.
#[derive(Debug)]
pub struct Concepts {
    rows: Solutions,
    screen_reserved: bool,
}

impl Concepts {
    pub fn new(rows: Solutions, screen_reserved: bool) -> Self {
        Self {
            rows,
            screen_reserved,
        }
    }

    /// Release the execution handle without reading further.
    pub fn close(self) {
        self.rows.close();
    }

    fn admits(&self, concept: &Concept) -> bool {
        !concept.is_placeholder() && !(self.screen_reserved && is_reserved_scheme(&concept.scheme))
    }
}

impl Iterator for Concepts {
    type Item = Concept;

    fn next(&mut self) -> Option<Concept> {
        loop {
            let row = self.rows.next()?;
            let concept = project(&row);
            if self.admits(&concept) {
                return Some(concept);
            }
        }
    }
}
