// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A generic implementation of Kahn's algorithm for topological sorting.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::hash::Hash;

/// An error indicating that a cycle was detected in the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the graph contains a cycle")]
pub struct CycleError;

/// Performs a topological sort on a generic directed graph.
///
/// The graph is defined by a collection of nodes and a set of directed edges
/// representing dependencies (from parent to child). Among the nodes that are
/// ready at any step, the one that appears first in `nodes` is emitted first,
/// so unrelated nodes keep their input order.
///
/// Edges referencing nodes that are not in `nodes` are ignored.
///
/// # Returns
///
/// * `Ok(Vec<T>)`: A vector of nodes in a valid topological order.
/// * `Err(CycleError)`: If the graph contains one or more cycles.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<T>, CycleError>
where
    T: Copy + Eq + Hash,
{
    let node_list: Vec<T> = nodes.into_iter().collect();
    if node_list.is_empty() {
        return Ok(Vec::new());
    }

    let rank: HashMap<T, usize> = node_list
        .iter()
        .enumerate()
        .map(|(index, node)| (*node, index))
        .collect();
    let mut adjacency_list: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut in_degree = vec![0usize; node_list.len()];

    // 1. Build adjacency list and in-degree counts from edges.
    for (parent, child) in edges {
        let (Some(&parent), Some(&child)) = (rank.get(&parent), rank.get(&child)) else {
            continue;
        };
        adjacency_list.entry(parent).or_default().push(child);
        in_degree[child] += 1;
    }

    // 2. Seed the ready set with all root nodes, smallest rank first.
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(index, _)| Reverse(index))
        .collect();

    // 3. Process the ready set.
    let mut sorted_list = Vec::with_capacity(node_list.len());
    while let Some(Reverse(parent)) = ready.pop() {
        sorted_list.push(node_list[parent]);
        if let Some(children) = adjacency_list.get(&parent) {
            for &child in children {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push(Reverse(child));
                }
            }
        }
    }

    // 4. Check for cycles.
    if sorted_list.len() != node_list.len() {
        Err(CycleError)
    } else {
        Ok(sorted_list)
    }
}

/// Returns `true` if `to` is reachable from `from` by following `edges`.
///
/// A node always reaches itself. Adding the edge `(a, b)` to an acyclic graph
/// creates a cycle exactly when `has_path(edges, b, a)` holds.
pub fn has_path<T>(edges: impl IntoIterator<Item = (T, T)>, from: T, to: T) -> bool
where
    T: Copy + Eq + Hash,
{
    if from == to {
        return true;
    }

    let mut adjacency_list: HashMap<T, Vec<T>> = HashMap::new();
    for (parent, child) in edges {
        adjacency_list.entry(parent).or_default().push(child);
    }

    let mut visited = HashSet::from([from]);
    let mut stack = vec![from];
    while let Some(node) = stack.pop() {
        for &next in adjacency_list.get(&node).into_iter().flatten() {
            if next == to {
                return true;
            }
            if visited.insert(next) {
                stack.push(next);
            }
        }
    }
    false
}
