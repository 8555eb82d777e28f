//! Assembly of nested [`View`] trees from top-level concepts.
//!
//! Each top-level concept is attached under a root node for its scheme and
//! expanded depth-first through one-hop narrower lookups. A narrower concept
//! that already lies on the path from the scheme root closes a cycle; it is
//! logged and left out. Concepts reachable through several parents keep every
//! edge.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tracing::{debug, warn};

use sevi_core::{Concept, Result, View};

/// Source of direct narrower concepts.
#[async_trait]
pub trait NarrowerLookup: Send + Sync {
    /// Direct children of `uri`, in presentation order.
    async fn narrower(&self, uri: &str) -> Result<Vec<Concept>>;
}

/// Arena node: a view without children plus child indices.
struct Node {
    view: View,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Builds one view tree per scheme.
pub struct HierarchyAssembler<'a, L: NarrowerLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: NarrowerLookup + ?Sized> HierarchyAssembler<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Assemble views for `top_levels`.
    ///
    /// Returns one root per distinct scheme, ordered by first sighting. Each
    /// root is labelled with the concept type of its scheme.
    pub async fn assemble<I>(&self, top_levels: I) -> Result<Vec<View>>
    where
        I: IntoIterator<Item = Concept>,
    {
        let mut arena: Vec<Node> = Vec::new();
        let mut roots: Vec<usize> = Vec::new();
        let mut root_by_scheme: HashMap<String, usize> = HashMap::new();

        for concept in top_levels {
            let root = match root_by_scheme.get(&concept.scheme) {
                Some(idx) => *idx,
                None => {
                    let idx = push(&mut arena, View::root(&concept.scheme), None);
                    root_by_scheme.insert(concept.scheme.clone(), idx);
                    roots.push(idx);
                    idx
                }
            };
            let top = push(&mut arena, View::from(concept), Some(root));
            self.expand(&mut arena, top).await?;
        }

        debug!(
            result_count = roots.len(),
            node_count = arena.len(),
            "Views assembled"
        );
        Ok(roots.into_iter().map(|idx| materialize(&mut arena, idx)).collect())
    }

    async fn expand(&self, arena: &mut Vec<Node>, start: usize) -> Result<()> {
        let mut pending = vec![start];
        while let Some(idx) = pending.pop() {
            let uri = arena[idx].view.id.clone();
            let children = self.lookup.narrower(&uri).await?;
            let on_path = path_ids(arena, idx);

            let mut added = Vec::with_capacity(children.len());
            for child in children {
                if on_path.contains(&child.id) {
                    warn!(
                        concept_uri = %uri,
                        narrower_uri = %child.id,
                        "Cycle in narrower relation, skipping"
                    );
                    continue;
                }
                added.push(push(arena, View::from(child), Some(idx)));
            }
            // Reverse so the first child is expanded first.
            pending.extend(added.into_iter().rev());
        }
        Ok(())
    }
}

fn push(arena: &mut Vec<Node>, view: View, parent: Option<usize>) -> usize {
    let idx = arena.len();
    arena.push(Node {
        view,
        parent,
        children: Vec::new(),
    });
    if let Some(p) = parent {
        arena[p].children.push(idx);
    }
    idx
}

/// Ids of `idx` and all of its ancestors.
fn path_ids(arena: &[Node], idx: usize) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut cursor = Some(idx);
    while let Some(i) = cursor {
        ids.insert(arena[i].view.id.clone());
        cursor = arena[i].parent;
    }
    ids
}

fn materialize(arena: &mut [Node], idx: usize) -> View {
    let child_idx = std::mem::take(&mut arena[idx].children);
    let children = child_idx
        .into_iter()
        .map(|c| materialize(arena, c))
        .collect();
    let mut view = std::mem::replace(&mut arena[idx].view, View::root(""));
    view.children = children;
    view
}
