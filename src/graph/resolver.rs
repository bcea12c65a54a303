//! Closure edges between definitions and cycle detection on style chains

use log::{debug, info, warn};
use std::collections::{BTreeSet, HashMap};

use super::{Graph, NodeId, Relation};
use crate::error::Error;

/// Longest basedOn/next/link chain followed before giving up
pub const MAX_CHAIN_DEPTH: usize = 100;

const STYLE_CHAINS: [Relation; 3] = [Relation::BasedOn, Relation::Next, Relation::Link];

/// Add an edge for every dependency declaration, then check style chains
pub(super) fn resolve(graph: &mut Graph) {
    let mut added = 0;
    for index in 0..graph.references().len() {
        let reference = &graph.references()[index];
        let relation = reference.relation;
        if relation == Relation::Content {
            continue;
        }
        match (graph.find(&reference.holder), graph.find(&reference.target)) {
            (Some(from), Some(to)) => {
                graph.add_edge(from, to, relation, Some(index));
                added += 1;
            }
            _ => {
                debug!(
                    "{} of {} points at undefined {}",
                    relation.as_str(),
                    reference.holder,
                    reference.target
                );
                graph.mark_dangling(index);
            }
        }
    }

    let mut cycles = 0;
    for relation in STYLE_CHAINS {
        cycles += break_cycles(graph, relation);
    }
    info!("resolved {} closure edges, {} cycles", added, cycles);
}

/// Find cycles along one relation; every member becomes a root
fn break_cycles(graph: &mut Graph, relation: Relation) -> usize {
    // A style has at most one basedOn/next/link; the first declaration wins
    let mut successor: HashMap<NodeId, NodeId> = HashMap::new();
    for edge in graph.edges().iter().filter(|e| e.relation == relation) {
        successor.entry(edge.from).or_insert(edge.to);
    }

    let mut starts: Vec<NodeId> = successor.keys().copied().collect();
    starts.sort_unstable();

    let mut seen: BTreeSet<Vec<NodeId>> = BTreeSet::new();
    let mut cycles: Vec<Vec<NodeId>> = Vec::new();

    for start in starts {
        let mut chain = vec![start];
        let mut current = start;
        while let Some(&next) = successor.get(&current) {
            if let Some(pos) = chain.iter().position(|&n| n == next) {
                let members = chain[pos..].to_vec();
                if !is_normal_form(relation, &members) {
                    let mut key = members.clone();
                    key.sort_unstable();
                    if seen.insert(key) {
                        cycles.push(members);
                    }
                }
                break;
            }
            if chain.len() >= MAX_CHAIN_DEPTH {
                let mut key = chain.clone();
                key.sort_unstable();
                if seen.insert(key) {
                    cycles.push(chain.clone());
                }
                break;
            }
            chain.push(next);
            current = next;
        }
    }

    for members in &cycles {
        let mut names: Vec<String> = members
            .iter()
            .map(|&n| graph.node(n).id.id.clone())
            .collect();
        names.push(names[0].clone());

        let error = Error::ReferenceCycle {
            relation: relation.as_str().to_string(),
            chain: names,
        };
        warn!("{}; keeping every member", error);
        graph.push_issue(error);
        for &member in members {
            graph.add_root(member);
        }
    }
    cycles.len()
}

/// `next` pointing at itself and a paragraph/character `link` pair are how
/// Word writes styles, not malformed chains
fn is_normal_form(relation: Relation, members: &[NodeId]) -> bool {
    matches!(
        (relation, members.len()),
        (Relation::Next, 1) | (Relation::Link, 2)
    )
}
