//! Domain models: concept types, concepts, views, and indexing queues.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Error;

// =============================================================================
// CONCEPT TYPE
// =============================================================================

/// Known controlled vocabularies.
///
/// Every value except [`ConceptType::All`] owns exactly one scheme URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConceptType {
    /// Synthetic type spanning every scheme
    All,
    /// Finnish legal vocabulary
    Juho,
    /// Finnish public administration ontology
    Jupo,
    /// Ontology for business, economics and trade
    Liito,
    /// Finnish ontology of health and welfare
    Tero,
    /// Finnish labour policy ontology
    Tsr,
    /// General Finnish ontology
    Yso,
    /// Public service classification
    Ptvl,
    /// Life situation facet of the public service classification
    Lifesituation,
    /// Target group facet of the public service classification
    Targetgroup,
}

impl ConceptType {
    const VALUES: [ConceptType; 10] = [
        ConceptType::All,
        ConceptType::Juho,
        ConceptType::Jupo,
        ConceptType::Liito,
        ConceptType::Tero,
        ConceptType::Tsr,
        ConceptType::Yso,
        ConceptType::Ptvl,
        ConceptType::Lifesituation,
        ConceptType::Targetgroup,
    ];

    /// Every concept type, `ALL` included.
    pub fn all() -> &'static [ConceptType] {
        &Self::VALUES
    }

    /// Facets whose top-level concepts are published as navigation views.
    pub fn classifications() -> &'static [ConceptType] {
        &[
            ConceptType::Lifesituation,
            ConceptType::Targetgroup,
            ConceptType::Ptvl,
        ]
    }

    /// Plain vocabularies indexed concept by concept.
    pub fn vocabularies() -> &'static [ConceptType] {
        &[
            ConceptType::Juho,
            ConceptType::Jupo,
            ConceptType::Liito,
            ConceptType::Tero,
            ConceptType::Tsr,
            ConceptType::Yso,
        ]
    }

    /// Canonical name, e.g. `"JUPO"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConceptType::All => "ALL",
            ConceptType::Juho => "JUHO",
            ConceptType::Jupo => "JUPO",
            ConceptType::Liito => "LIITO",
            ConceptType::Tero => "TERO",
            ConceptType::Tsr => "TSR",
            ConceptType::Yso => "YSO",
            ConceptType::Ptvl => "PTVL",
            ConceptType::Lifesituation => "LIFESITUATION",
            ConceptType::Targetgroup => "TARGETGROUP",
        }
    }

    /// Scheme URI constraining queries for this type. `None` for `ALL`.
    pub fn in_scheme(&self) -> Option<&'static str> {
        match self {
            ConceptType::All => None,
            ConceptType::Juho => Some("http://www.yso.fi/onto/juho/"),
            ConceptType::Jupo => Some("http://www.yso.fi/onto/jupo/"),
            ConceptType::Liito => Some("http://www.yso.fi/onto/liito/"),
            ConceptType::Tero => Some("http://www.yso.fi/onto/tero/"),
            ConceptType::Tsr => Some("http://www.yso.fi/onto/tsr/"),
            ConceptType::Yso => Some("http://www.yso.fi/onto/yso/"),
            ConceptType::Ptvl => Some("http://urn.fi/URN:NBN:fi:au:ptvl:"),
            ConceptType::Lifesituation => Some("http://urn.fi/URN:NBN:fi:au:ptvl:KE"),
            ConceptType::Targetgroup => Some("http://urn.fi/URN:NBN:fi:au:ptvl:KR"),
        }
    }

    /// Resolve a scheme URI back to its type. Unknown schemes resolve to `ALL`.
    pub fn of_scheme(scheme: &str) -> ConceptType {
        Self::VALUES
            .iter()
            .copied()
            .find(|t| t.in_scheme() == Some(scheme))
            .unwrap_or(ConceptType::All)
    }

    /// Whether this type is one of the classification facets.
    pub fn is_classification(&self) -> bool {
        Self::classifications().contains(self)
    }
}

impl std::fmt::Display for ConceptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConceptType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Self::VALUES
            .iter()
            .copied()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| Error::InvalidConceptType(s.to_string()))
    }
}

// =============================================================================
// CONCEPT
// =============================================================================

/// A single entry of a controlled vocabulary.
///
/// Absent query bindings are carried as empty strings; an empty `id` only
/// ever exists inside the projection layer and never reaches a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub notation: String,
    #[serde(default)]
    pub scheme: String,
    #[serde(default = "default_concept_type")]
    pub concept_type: ConceptType,
}

fn default_concept_type() -> ConceptType {
    ConceptType::All
}

impl Concept {
    /// Build a concept, resolving its type from the scheme.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        notation: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        let scheme = scheme.into();
        Self {
            id: id.into(),
            label: label.into(),
            notation: notation.into(),
            concept_type: ConceptType::of_scheme(&scheme),
            scheme,
        }
    }

    /// Whether the record stands for "no binding matched".
    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty()
    }

    /// The notation, if the concept has one.
    pub fn notation(&self) -> Option<&str> {
        (!self.notation.is_empty()).then_some(self.notation.as_str())
    }
}

/// Labels are published in every supported language slot. The source
/// vocabularies are queried in one language only, so all slots carry it.
fn serialize_labelled<S: Serializer>(
    serializer: S,
    name: &'static str,
    extra: usize,
    id: &str,
    label: &str,
    notation: &str,
    concept_type: ConceptType,
) -> Result<S::SerializeStruct, S::Error> {
    let mut state = serializer.serialize_struct(name, 7 + extra)?;
    state.serialize_field("id", id)?;
    state.serialize_field("notation", notation)?;
    state.serialize_field("label", label)?;
    state.serialize_field("finnish", label)?;
    state.serialize_field("swedish", label)?;
    state.serialize_field("english", label)?;
    state.serialize_field("conceptType", &concept_type)?;
    Ok(state)
}

impl Serialize for Concept {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serialize_labelled(
            serializer,
            "Concept",
            1,
            &self.id,
            &self.label,
            &self.notation,
            self.concept_type,
        )?;
        state.serialize_field("scheme", &self.scheme)?;
        state.end()
    }
}

// =============================================================================
// VIEW
// =============================================================================

/// A node in a materialized concept hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub id: String,
    pub label: String,
    pub notation: String,
    pub scheme: String,
    pub concept_type: ConceptType,
    pub children: Vec<View>,
}

impl View {
    /// Root node for a scheme, labelled with the scheme's concept type.
    pub fn root(scheme: &str) -> Self {
        let concept_type = ConceptType::of_scheme(scheme);
        Self {
            id: scheme.to_string(),
            label: concept_type.to_string(),
            notation: String::new(),
            scheme: scheme.to_string(),
            concept_type,
            children: Vec::new(),
        }
    }

    /// Total number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Depth-first search for a node by id, this node included.
    pub fn find(&self, id: &str) -> Option<&View> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

impl From<Concept> for View {
    fn from(concept: Concept) -> Self {
        Self {
            id: concept.id,
            label: concept.label,
            notation: concept.notation,
            scheme: concept.scheme,
            concept_type: concept.concept_type,
            children: Vec::new(),
        }
    }
}

impl Serialize for View {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serialize_labelled(
            serializer,
            "View",
            1,
            &self.id,
            &self.label,
            &self.notation,
            self.concept_type,
        )?;
        state.serialize_field("children", &self.children)?;
        state.end()
    }
}

// =============================================================================
// INDEXING
// =============================================================================

/// Destination queue of the indexing transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexQueue {
    /// One document per changed concept
    ConceptChanged,
    /// One batch holding every classification top-level concept
    TopLevelsChanged,
    /// One batch holding every classification view tree
    ViewsChanged,
    /// Search index mapping document
    UpdateMappings,
}

impl IndexQueue {
    /// Queue name on the transport.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexQueue::ConceptChanged => "ontology-changed",
            IndexQueue::TopLevelsChanged => "ontology-toplevels-changed",
            IndexQueue::ViewsChanged => "ontology-views-changed",
            IndexQueue::UpdateMappings => "ontology-update-mappings",
        }
    }
}

impl std::fmt::Display for IndexQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
