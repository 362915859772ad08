//! Directed dependency edges between records of the same kind.

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DependencyError {
    #[error("A record cannot depend on itself")]
    SelfDependency,
    #[error("Dependency already exists")]
    AlreadyExists,
    #[error("Dependency would create a cycle")]
    Cycle,
}

/// Checks that adding `from -> to` to `edges` keeps the graph a DAG.
///
/// Edges are `(record, depends_on)` pairs.
pub fn validate_new_edge(edges: &[(i64, i64)], from: i64, to: i64) -> Result<(), DependencyError> {
    if from == to {
        return Err(DependencyError::SelfDependency);
    }
    if edges.contains(&(from, to)) {
        return Err(DependencyError::AlreadyExists);
    }

    let mut nodes = HashSet::new();
    let mut incoming: HashMap<i64, usize> = HashMap::new();
    let mut outgoing: HashMap<i64, Vec<i64>> = HashMap::new();
    for &(source, target) in edges.iter().chain(std::iter::once(&(from, to))) {
        nodes.insert(source);
        nodes.insert(target);
        *incoming.entry(target).or_insert(0) += 1;
        incoming.entry(source).or_insert(0);
        outgoing.entry(source).or_default().push(target);
    }

    let mut queue: VecDeque<i64> = incoming
        .iter()
        .filter_map(|(node, count)| if *count == 0 { Some(*node) } else { None })
        .collect();
    let mut visited = 0usize;

    while let Some(node) = queue.pop_front() {
        visited += 1;
        if let Some(children) = outgoing.get(&node) {
            for child in children {
                if let Some(count) = incoming.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(*child);
                    }
                }
            }
        }
    }

    if visited != nodes.len() {
        return Err(DependencyError::Cycle);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_self_and_duplicate_edges() {
        assert_eq!(
            validate_new_edge(&[], 1, 1),
            Err(DependencyError::SelfDependency)
        );
        assert_eq!(
            validate_new_edge(&[(1, 2)], 1, 2),
            Err(DependencyError::AlreadyExists)
        );
    }

    #[test]
    fn rejects_transitive_cycle() {
        let edges = [(1, 2), (2, 3)];
        assert_eq!(validate_new_edge(&edges, 3, 1), Err(DependencyError::Cycle));
        assert_eq!(validate_new_edge(&edges, 2, 1), Err(DependencyError::Cycle));
    }

    #[test]
    fn accepts_diamonds_and_disconnected_edges() {
        let edges = [(1, 2), (1, 3), (2, 4)];
        assert_eq!(validate_new_edge(&edges, 3, 4), Ok(()));
        assert_eq!(validate_new_edge(&edges, 7, 8), Ok(()));
    }
}
