//! Child lists and cycle checks over parent-index arrays.
//!
//! Traversals use an explicit stack rather than recursion, so hostile input
//! can't exhaust the call stack.

/// Invert a parent array: `children[p]` lists every `i` with `parents[i] == Some(p)`,
/// in ascending order of `i`.
///
/// # Panics
///
/// Panics if a parent index is out of range.  Validate parents first.
pub fn build_child_lists(parents: &[Option<usize>]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); parents.len()];
    for (i, parent) in parents.iter().enumerate() {
        if let Some(p) = *parent {
            children[p].push(i);
        }
    }
    children
}

pub fn roots(parents: &[Option<usize>]) -> impl Iterator<Item = usize> + '_ {
    parents.iter().enumerate().filter(|(_, p)| p.is_none()).map(|(i, _)| i)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Walk {
    Complete { visited: usize },
    /// Some path from a root was longer than the entity count allows.
    DepthExceeded,
}

/// Depth-first walk from every root.  In a forest of `n` entities no path has
/// more than `n` entities, so reaching depth `n + 1` proves a cycle.
fn walk_from_roots(parents: &[Option<usize>], children: &[Vec<usize>]) -> Walk {
    let max_depth = parents.len() + 1;
    let mut visited = 0;
    let mut stack = roots(parents).map(|r| (r, 1)).collect::<Vec<_>>();
    while let Some((i, depth)) = stack.pop() {
        if depth > max_depth {
            return Walk::DepthExceeded;
        }
        visited += 1;
        for &c in &children[i] {
            stack.push((c, depth + 1));
        }
    }
    Walk::Complete { visited }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleCheck {
    Acyclic,
    Cycle,
}

pub fn check_cycles(parents: &[Option<usize>]) -> CycleCheck {
    let children = build_child_lists(parents);
    match walk_from_roots(parents, &children) {
        Walk::DepthExceeded => CycleCheck::Cycle,
        // Every entity follows its parents either to a root or into a cycle, so
        // anything the roots can't reach hangs off a cycle.
        Walk::Complete { visited } if visited < parents.len() => CycleCheck::Cycle,
        Walk::Complete { .. } => CycleCheck::Acyclic,
    }
}

pub fn detect_cycle(parents: &[Option<usize>]) -> bool {
    check_cycles(parents) == CycleCheck::Cycle
}

/// Whether the child lists reach every entity from exactly one root, exactly
/// once.
pub fn every_entity_reached_exactly_once(
    parents: &[Option<usize>],
    children: &[Vec<usize>],
) -> bool {
    if parents.len() != children.len() {
        return false;
    }
    let mut seen = vec![0_usize; parents.len()];
    let mut stack = roots(parents).collect::<Vec<_>>();
    while let Some(i) = stack.pop() {
        seen[i] += 1;
        if seen[i] > 1 {
            return false;
        }
        for &c in &children[i] {
            if c >= parents.len() {
                return false;
            }
            stack.push(c);
        }
    }
    seen.iter().all(|&n| n == 1)
}
