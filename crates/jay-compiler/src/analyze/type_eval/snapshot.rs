//! Persistent variable-type snapshots.
//!
//! Branch-local type state is an `Rc`-linked singly-linked list of
//! `(variable, type)` entries, newest first. Each branch's head extends its
//! parent's, so capturing the state at a break statement is one pointer
//! copy, and a node is freed as soon as no branch head, incoming capture,
//! or condensed list references it.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use jay_cfg::Type;

use crate::analyze::resolve::LocalId;

/// Shared compile-time type. Types are immutable once computed, so branches
/// and node-type tables share them freely.
pub type TypeRef = Rc<Type>;

/// One snapshot entry. A `None` type records that the variable stopped
/// being definitely initialized at this point.
#[derive(Debug)]
pub struct SnapshotNode {
    pub var: LocalId,
    pub ty: Option<TypeRef>,
    pub next: Snapshot,
}

/// A snapshot head; `None` is the empty list.
pub type Snapshot = Option<Rc<SnapshotNode>>;

/// Prepends an entry, returning the new head.
pub fn push(head: &Snapshot, var: LocalId, ty: Option<TypeRef>) -> Snapshot {
    Some(Rc::new(SnapshotNode {
        var,
        ty,
        next: head.clone(),
    }))
}

fn ptr(node: &Snapshot) -> Option<*const SnapshotNode> {
    node.as_ref().map(Rc::as_ptr)
}

/// Whether two heads are the same node (or both empty).
pub fn same(a: &Snapshot, b: &Snapshot) -> bool {
    ptr(a) == ptr(b)
}

/// The earliest node present in both lists, or `None` when the lists share
/// no tail. Walks both lists in lockstep so the cost is proportional to the
/// distance to the common tail, not the full list length.
fn least_common_ancestor2(first: &Snapshot, second: &Snapshot) -> Snapshot {
    let mut seen: HashSet<*const SnapshotNode> = HashSet::new();
    let mut a = first.clone();
    let mut b = second.clone();
    while a.is_some() || b.is_some() {
        if let Some(node) = a.take() {
            if !seen.insert(Rc::as_ptr(&node)) {
                return Some(node);
            }
            a = node.next.clone();
        }
        if let Some(node) = b.take() {
            if !seen.insert(Rc::as_ptr(&node)) {
                return Some(node);
            }
            b = node.next.clone();
        }
    }
    None
}

/// The earliest node present in every list.
pub fn least_common_ancestor(lists: &[Snapshot]) -> Snapshot {
    let mut ancestor = lists[0].clone();
    for other in &lists[1..] {
        ancestor = least_common_ancestor2(&ancestor, other);
    }
    ancestor
}

/// Collects the mappings in `[start, end)` as a map. `end` must be a tail
/// of `start` (or `None` for the whole list). Entries closer to `start`
/// (newer) win; a `None` type erases the variable from the result.
pub fn to_map(start: &Snapshot, end: &Snapshot) -> HashMap<LocalId, TypeRef> {
    let mut nodes = Vec::new();
    let mut cursor = start.clone();
    while !same(&cursor, end) {
        let node = cursor.expect("snapshot end is not a tail of start");
        nodes.push(node.clone());
        cursor = node.next.clone();
    }
    let mut map = HashMap::new();
    for node in nodes.iter().rev() {
        match &node.ty {
            Some(ty) => {
                map.insert(node.var, ty.clone());
            }
            None => {
                map.remove(&node.var);
            }
        }
    }
    map
}

/// Rebuilds the `[start, end)` prefix keeping only the newest entry per
/// variable, returning the new head. Dropped entries free once the caller
/// releases the old head. Keeps loop trial iterations from growing the
/// list beyond one entry per variable.
pub fn condense(start: &Snapshot, end: &Snapshot) -> Snapshot {
    let mut kept = Vec::new();
    let mut seen: HashSet<LocalId> = HashSet::new();
    let mut cursor = start.clone();
    while !same(&cursor, end) {
        let node = cursor.expect("snapshot end is not a tail of start");
        if seen.insert(node.var) {
            kept.push((node.var, node.ty.clone()));
        }
        cursor = node.next.clone();
    }
    let mut head = end.clone();
    for (var, ty) in kept.into_iter().rev() {
        head = push(&head, var, ty);
    }
    head
}
