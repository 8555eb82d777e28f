//! Per concept type query construction.
//!
//! One [`ConceptQueryStrategy`] exists per [`ConceptType`]. A scoped strategy
//! binds `?scheme` to its vocabulary with a `VALUES` clause; the all-schemes
//! strategy leaves `?scheme` free and relies on projection to drop reserved
//! schemes and to resolve each row's concept type.

use sevi_core::defaults;
use sevi_core::{ConceptType, Error, Result};

use crate::builder::{urify, SparqlQueryBuilder};

/// Which schemes a strategy's queries range over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemeScope {
    /// Restricted to one scheme URI.
    Scoped(String),
    /// Every scheme in the store.
    AllSchemes,
}

/// Builds the query texts for one concept type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptQueryStrategy {
    concept_type: ConceptType,
    scope: SchemeScope,
    lang: String,
}

impl ConceptQueryStrategy {
    /// Strategy for `concept_type`, scoped to its scheme unless it is `ALL`.
    pub fn new(concept_type: ConceptType, lang: impl Into<String>) -> Self {
        let scope = match concept_type.in_scheme() {
            Some(scheme) => SchemeScope::Scoped(scheme.to_string()),
            None => SchemeScope::AllSchemes,
        };
        Self {
            concept_type,
            scope,
            lang: lang.into(),
        }
    }

    pub fn concept_type(&self) -> ConceptType {
        self.concept_type
    }

    pub fn scope(&self) -> &SchemeScope {
        &self.scope
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Whether results must be screened for reserved schemes.
    pub fn spans_all_schemes(&self) -> bool {
        self.scope == SchemeScope::AllSchemes
    }

    fn base(&self) -> SparqlQueryBuilder {
        SparqlQueryBuilder::new()
            .prefix("skosext", defaults::SKOSEXT_NAMESPACE)
            .prefix("skos", defaults::SKOS_NAMESPACE)
    }

    fn lang_filter(&self) -> String {
        format!("(lang(?prefLabel) = '{}')", self.lang)
    }

    fn scoped(&self, builder: SparqlQueryBuilder) -> SparqlQueryBuilder {
        match &self.scope {
            SchemeScope::Scoped(scheme) => {
                builder.where_row(format!("{{ VALUES ?scheme {{ {} }} }}", urify(scheme)))
            }
            SchemeScope::AllSchemes => builder,
        }
    }

    /// Every non-deprecated concept with a label in the configured language.
    pub fn all_concepts_query(&self) -> String {
        let builder = self
            .base()
            .select(["?uri", "(str(?prefLabel) AS ?label)", "?scheme", "?notation"])
            .triple("?uri", "skos:inScheme", "?scheme")
            .triple("?uri", "a", "skos:Concept")
            .triple("?uri", "skos:prefLabel", "?prefLabel");
        self.scoped(builder)
            .where_row("OPTIONAL { ?uri skos:notation ?notation }")
            .filter("NOT EXISTS { ?uri a skosext:DeprecatedConcept }")
            .filter(self.lang_filter())
            .build()
    }

    /// Like [`Self::all_concepts_query`], restricted to top concepts of the scheme.
    pub fn top_level_query(&self) -> String {
        let top_of = match &self.scope {
            SchemeScope::Scoped(scheme) => urify(scheme),
            SchemeScope::AllSchemes => "?scheme".to_string(),
        };
        let builder = self
            .base()
            .select(["?uri", "(str(?prefLabel) AS ?label)", "?scheme", "?notation"])
            .triple("?uri", "skos:inScheme", "?scheme")
            .triple("?uri", "a", "skos:Concept")
            .triple("?uri", "skos:prefLabel", "?prefLabel")
            .triple("?uri", "skos:topConceptOf", top_of);
        self.scoped(builder)
            .where_row("OPTIONAL { ?uri skos:notation ?notation }")
            .filter("NOT EXISTS { ?uri a skosext:DeprecatedConcept }")
            .filter(self.lang_filter())
            .build()
    }

    /// A single concept, with the subject fixed to `uri`.
    pub fn find_by_uri_query(&self, uri: &str) -> String {
        let subject = urify(uri);
        let builder = self
            .base()
            .select([
                format!("(str({}) AS ?uri)", subject),
                "(str(?prefLabel) AS ?label)".to_string(),
                "?scheme".to_string(),
                "?notation".to_string(),
            ])
            .triple(&subject, "skos:inScheme", "?scheme")
            .triple(&subject, "a", "skos:Concept")
            .triple(&subject, "skos:prefLabel", "?prefLabel");
        self.scoped(builder)
            .where_row(format!("OPTIONAL {{ {} skos:notation ?notation }}", subject))
            .filter(format!(
                "NOT EXISTS {{ {} a skosext:DeprecatedConcept }}",
                subject
            ))
            .filter(self.lang_filter())
            .build()
    }

    /// Every concept transitively broader than `uri`, nearest first.
    ///
    /// Rows are ranked by how many concepts are broader still, so a parent
    /// sorts before its own ancestors.
    pub fn broader_query(&self, uri: &str) -> String {
        let subject = urify(uri);
        let first = if self.spans_all_schemes() {
            "DISTINCT ?uri"
        } else {
            "?uri"
        };
        let builder = self
            .base()
            .select([first, "(str(?prefLabel) AS ?label)", "?scheme", "?notation"])
            .triple(&subject, "skos:broaderTransitive", "?uri")
            .triple("?uri", "skos:inScheme", "?scheme")
            .triple("?uri", "skos:prefLabel", "?prefLabel");
        let builder = match &self.scope {
            SchemeScope::Scoped(_) => self
                .scoped(builder)
                .triple(&subject, "skos:inScheme", "?scheme"),
            SchemeScope::AllSchemes => builder,
        };
        builder
            .where_row("OPTIONAL { ?uri skos:broaderTransitive ?evenBroader }")
            .where_row("OPTIONAL { ?uri skos:notation ?notation }")
            .filter("NOT EXISTS { ?uri a skosext:DeprecatedConcept }")
            .filter(self.lang_filter())
            .group_by("?uri")
            .group_by("?scheme")
            .group_by("?prefLabel")
            .group_by("?notation")
            .order_by("ASC(COUNT(?evenBroader))")
            .build()
    }

    /// Direct children of `uri`, one `skos:narrower` hop only.
    pub fn narrower_query(&self, uri: &str) -> String {
        let builder = self
            .base()
            .select(["?uri", "(str(?prefLabel) AS ?label)", "?scheme", "?notation"])
            .triple(urify(uri), "skos:narrower", "?uri")
            .triple("?uri", "skos:inScheme", "?scheme")
            .triple("?uri", "skos:prefLabel", "?prefLabel");
        self.scoped(builder)
            .where_row("OPTIONAL { ?uri skos:notation ?notation }")
            .filter("NOT EXISTS { ?uri a skosext:DeprecatedConcept }")
            .filter(self.lang_filter())
            .build()
    }

    /// Exact preferred-label match. Slow; labels are not guaranteed unique.
    pub fn by_label_query(&self, label: &str) -> String {
        let escaped = label.replace('\\', "\\\\").replace('"', "\\\"");
        let builder = self
            .base()
            .select(["?uri", "(str(?prefLabel) AS ?label)", "?scheme", "?notation"])
            .triple("?uri", "a", "skos:Concept")
            .triple("?uri", "skos:prefLabel", "?prefLabel")
            .triple("?uri", "skos:inScheme", "?scheme");
        self.scoped(builder)
            .where_row("OPTIONAL { ?uri skos:notation ?notation }")
            .filter(format!("(?prefLabel=\"{}\"@{})", escaped, self.lang))
            .build()
    }
}

/// Strategies for every concept type, in [`ConceptType::all`] order.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: Vec<ConceptQueryStrategy>,
}

impl StrategyRegistry {
    pub fn new(lang: &str) -> Self {
        Self {
            strategies: ConceptType::all()
                .iter()
                .map(|t| ConceptQueryStrategy::new(*t, lang))
                .collect(),
        }
    }

    /// Look up the strategy for `concept_type`.
    pub fn for_type(&self, concept_type: ConceptType) -> Result<&ConceptQueryStrategy> {
        self.strategies
            .iter()
            .find(|s| s.concept_type() == concept_type)
            .ok_or(Error::StrategyNotFound(concept_type))
    }

    /// The strategy spanning every scheme.
    pub fn all_schemes(&self) -> Result<&ConceptQueryStrategy> {
        self.for_type(ConceptType::All)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConceptQueryStrategy> {
        self.strategies.iter()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new(defaults::LANGUAGE)
    }
}
