//! Mark-and-sweep over the reference graph

use std::collections::{HashSet, VecDeque};

use super::{Graph, NodeId, ResourceKind};
use crate::opc::PartUri;
use crate::protected::ProtectedSet;

/// Live/dead partition of a graph's definitions
#[derive(Clone, Debug)]
pub struct Reachability {
    live: Vec<bool>,
    /// References treated as already removed
    retired: HashSet<usize>,
}

/// An unreachable, unprotected definition
#[derive(Clone, Debug, PartialEq)]
pub struct Orphan {
    pub node: NodeId,
    pub kind: ResourceKind,
    pub id: String,
    pub part: PartUri,
    pub detail: String,
    pub reason: String,
    pub bytes: usize,
}

impl Reachability {
    /// Live set of the full graph
    pub fn compute(graph: &Graph, protected: &ProtectedSet) -> Self {
        Self::compute_retiring(graph, protected, HashSet::new())
    }

    /// Live set when the given references no longer count as edges.
    ///
    /// Roots are the graph's own roots plus every protected definition. The
    /// work list runs until no new node is marked.
    pub fn compute_retiring(graph: &Graph, protected: &ProtectedSet, retired: HashSet<usize>) -> Self {
        let mut live = vec![false; graph.len()];
        let mut queue: VecDeque<NodeId> = VecDeque::new();

        let roots = graph
            .roots()
            .iter()
            .copied()
            .chain(graph.nodes().filter(|(_, d)| protected.covers(d)).map(|(n, _)| n));
        for root in roots {
            if !live[root] {
                live[root] = true;
                queue.push_back(root);
            }
        }

        while let Some(node) = queue.pop_front() {
            for edge in graph.outgoing(node) {
                if edge.reference.is_some_and(|r| retired.contains(&r)) {
                    continue;
                }
                if !live[edge.to] {
                    live[edge.to] = true;
                    queue.push_back(edge.to);
                }
            }
        }

        Self { live, retired }
    }

    pub fn is_live(&self, node: NodeId) -> bool {
        self.live.get(node).copied().unwrap_or(false)
    }

    /// Number of live definitions
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|l| **l).count()
    }

    /// Dead definitions that are neither protected nor whole parts, in node order
    pub fn orphans(&self, graph: &Graph, protected: &ProtectedSet) -> Vec<Orphan> {
        graph
            .nodes()
            .filter(|(node, definition)| {
                !self.live[*node]
                    && definition.id.kind != ResourceKind::Part
                    && !protected.covers(definition)
            })
            .map(|(node, definition)| Orphan {
                node,
                kind: definition.id.kind,
                id: definition.id.id.clone(),
                part: definition.part.clone(),
                detail: describe(definition),
                reason: self.reason(graph, node),
                bytes: definition.bytes,
            })
            .collect()
    }

    fn reason(&self, graph: &Graph, node: NodeId) -> String {
        let mut retired = false;
        let mut from_dead = false;
        for edge in graph.incoming(node) {
            if edge.reference.is_some_and(|r| self.retired.contains(&r)) {
                retired = true;
            } else {
                from_dead = true;
            }
        }

        let kind = graph.node(node).id.kind;
        match (retired, from_dead, kind) {
            (true, _, _) => "only referenced from content being removed".to_string(),
            (false, true, ResourceKind::Media) => {
                "only referenced by unused relationships".to_string()
            }
            (false, true, _) => "only referenced by unreachable definitions".to_string(),
            (false, false, _) => "no reference found in any content or relationship part".to_string(),
        }
    }
}

/// Short human-readable description of a definition
fn describe(definition: &super::Definition) -> String {
    let meta = &definition.meta;
    match definition.id.kind {
        ResourceKind::Relationship => {
            let kind = meta
                .rel_type
                .as_deref()
                .and_then(|t| t.rsplit('/').next())
                .unwrap_or("unknown");
            let target = meta.target.as_deref().unwrap_or("");
            if meta.external {
                format!("{} -> {} (external)", kind, target)
            } else {
                format!("{} -> {}", kind, target)
            }
        }
        ResourceKind::Style => match &meta.name {
            Some(name) => format!("style \"{}\"", name),
            None => "style".to_string(),
        },
        ResourceKind::Media => format!("{} bytes", definition.bytes),
        kind => kind.to_string(),
    }
}
