//! Package dependency resolution: unit merging and topological ordering

use std::collections::{HashMap, VecDeque};

use crate::ast::{QualifiedName, Unit};
use crate::common::{CompileError, CompileResult};

/// Options for the package sorter.
#[derive(Debug, Clone, Default)]
pub struct SortOptions {
    /// Also graph imported packages that have no compilation unit. Off by
    /// default: unknown imports are left to surface as resolution errors.
    pub include_external: bool,
}

/// Merge units that share a package name: statements concatenate in input
/// order, import sets union. First-seen package order is preserved.
pub fn merge_units(units: Vec<Unit>) -> Vec<Unit> {
    let mut order: Vec<QualifiedName> = Vec::new();
    let mut merged: HashMap<QualifiedName, Unit> = HashMap::new();

    for unit in units {
        match merged.get_mut(&unit.package) {
            Some(existing) => {
                existing.stmts.extend(unit.stmts);
                existing.imports.extend(unit.imports);
            }
            None => {
                order.push(unit.package.clone());
                merged.insert(unit.package.clone(), unit);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|package| merged.remove(&package))
        .collect()
}

/// Order units so that every package comes after all packages it imports.
pub fn sort_units(units: Vec<Unit>, options: &SortOptions) -> CompileResult<Vec<Unit>> {
    let order = package_order(&units, options)?;
    let index: HashMap<&QualifiedName, usize> =
        order.iter().enumerate().map(|(i, p)| (p, i)).collect();

    let mut units = units;
    units.sort_by_key(|unit| index.get(&unit.package).copied().unwrap_or(usize::MAX));
    Ok(units)
}

/// Topological order over package names, or the concrete cycle that
/// prevents one.
pub fn package_order(
    units: &[Unit],
    options: &SortOptions,
) -> CompileResult<Vec<QualifiedName>> {
    let mut nodes: Vec<QualifiedName> = Vec::new();
    let mut index: HashMap<QualifiedName, usize> = HashMap::new();
    let add_node = |nodes: &mut Vec<QualifiedName>,
                        index: &mut HashMap<QualifiedName, usize>,
                        name: &QualifiedName| {
        if !index.contains_key(name) {
            index.insert(name.clone(), nodes.len());
            nodes.push(name.clone());
        }
    };

    for unit in units {
        add_node(&mut nodes, &mut index, &unit.package);
    }
    if options.include_external {
        for unit in units {
            for dep in &unit.imports {
                add_node(&mut nodes, &mut index, dep);
            }
        }
    }

    // edge: imported package -> importer
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut indegree: Vec<usize> = vec![0; nodes.len()];
    for unit in units {
        let importer = index[&unit.package];
        for dep in &unit.imports {
            let Some(&dep_index) = index.get(dep) else {
                continue;
            };
            if dep_index == importer || adjacency[dep_index].contains(&importer) {
                continue;
            }
            adjacency[dep_index].push(importer);
            indegree[importer] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&n| indegree[n] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(node) = queue.pop_front() {
        order.push(nodes[node].clone());
        for &next in &adjacency[node] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() == nodes.len() {
        return Ok(order);
    }

    let cycle = find_cycle(&adjacency)
        .map(|path| path.into_iter().map(|n| nodes[n].clone()).collect())
        .unwrap_or_default();
    Err(CompileError::CyclicDependency(cycle))
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Reconstruct one concrete cycle by depth-first coloring, following parent
/// edges back from the discovered back edge. The result starts and ends on
/// the same node.
fn find_cycle(adjacency: &[Vec<usize>]) -> Option<Vec<usize>> {
    let mut color = vec![Color::White; adjacency.len()];
    let mut parent = vec![None; adjacency.len()];

    for node in 0..adjacency.len() {
        if color[node] == Color::White {
            if let Some(cycle) = dfs(node, adjacency, &mut color, &mut parent) {
                return Some(cycle);
            }
        }
    }
    None
}

fn dfs(
    node: usize,
    adjacency: &[Vec<usize>],
    color: &mut [Color],
    parent: &mut [Option<usize>],
) -> Option<Vec<usize>> {
    color[node] = Color::Gray;
    for &next in &adjacency[node] {
        match color[next] {
            Color::White => {
                parent[next] = Some(node);
                if let Some(cycle) = dfs(next, adjacency, color, parent) {
                    return Some(cycle);
                }
            }
            Color::Gray => {
                // back edge node -> next closes the cycle
                let mut cycle = vec![next, node];
                let mut current = node;
                while current != next {
                    match parent[current] {
                        Some(p) => current = p,
                        None => break,
                    }
                    cycle.push(current);
                }
                cycle.reverse();
                return Some(cycle);
            }
            Color::Black => {}
        }
    }
    color[node] = Color::Black;
    None
}
