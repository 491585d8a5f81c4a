//! Shape-agnostic traversal over string-keyed trees.
//!
//! Snapshots and threshold configs share one shape: ordered maps of named
//! branches ending in leaves. Everything that walks two of them side by side
//! (evaluation, patch merge, default extension) goes through these helpers,
//! so no caller assumes a fixed depth.

use indexmap::IndexMap;

/// Separator used when a leaf path is rendered as a component name.
pub const PATH_SEPARATOR: &str = "-";

/// A node whose interior nodes are ordered maps of named children.
pub trait Tree: Sized {
    /// Children when this node is a branch, `None` for a leaf.
    fn children(&self) -> Option<&IndexMap<String, Self>>;

    /// Mutable children when this node is a branch, `None` for a leaf.
    fn children_mut(&mut self) -> Option<&mut IndexMap<String, Self>>;

    /// Build a branch node from its children.
    fn branch(children: IndexMap<String, Self>) -> Self;
}

/// Render a leaf path as a stable component name, e.g. `cpu-percent-core_1`.
#[must_use]
pub fn join_path(path: &[&str]) -> String {
    path.join(PATH_SEPARATOR)
}

/// Visit every leaf of `tree` in insertion order.
pub fn walk_leaves<'a, T, F>(tree: &'a IndexMap<String, T>, visit: &mut F)
where
    T: Tree,
    F: FnMut(&[&'a str], &'a T),
{
    let mut path = Vec::new();
    walk_inner(tree, &mut path, visit);
}

fn walk_inner<'a, T, F>(tree: &'a IndexMap<String, T>, path: &mut Vec<&'a str>, visit: &mut F)
where
    T: Tree,
    F: FnMut(&[&'a str], &'a T),
{
    for (key, node) in tree {
        path.push(key.as_str());
        match node.children() {
            Some(children) => walk_inner(children, path, visit),
            None => visit(path, node),
        }
        path.pop();
    }
}

/// Walk two trees in lockstep, calling `visit` for every path that holds a
/// leaf on both sides.
///
/// Keys present on only one side are skipped, as are paths where one side is
/// a branch and the other a leaf.
pub fn zip_leaves<'a, A, B, F>(
    left: &'a IndexMap<String, A>,
    right: &'a IndexMap<String, B>,
    visit: &mut F,
) where
    A: Tree,
    B: Tree,
    F: FnMut(&[&'a str], &'a A, &'a B),
{
    let mut path = Vec::new();
    zip_inner(left, right, &mut path, visit);
}

fn zip_inner<'a, A, B, F>(
    left: &'a IndexMap<String, A>,
    right: &'a IndexMap<String, B>,
    path: &mut Vec<&'a str>,
    visit: &mut F,
) where
    A: Tree,
    B: Tree,
    F: FnMut(&[&'a str], &'a A, &'a B),
{
    for (key, l) in left {
        let Some(r) = right.get(key) else {
            continue;
        };
        path.push(key.as_str());
        match (l.children(), r.children()) {
            (Some(lc), Some(rc)) => zip_inner(lc, rc, path, visit),
            (None, None) => visit(path, l, r),
            _ => {}
        }
        path.pop();
    }
}

/// First path present in both trees where one side is a leaf and the other
/// a branch, rendered with [`join_path`].
#[must_use]
pub fn find_kind_mismatch<A, B>(
    left: &IndexMap<String, A>,
    right: &IndexMap<String, B>,
) -> Option<String>
where
    A: Tree,
    B: Tree,
{
    let mut path = Vec::new();
    mismatch_inner(left, right, &mut path)
}

fn mismatch_inner<'a, A, B>(
    left: &'a IndexMap<String, A>,
    right: &IndexMap<String, B>,
    path: &mut Vec<&'a str>,
) -> Option<String>
where
    A: Tree,
    B: Tree,
{
    for (key, l) in left {
        let Some(r) = right.get(key) else {
            continue;
        };
        path.push(key.as_str());
        let found = match (l.children(), r.children()) {
            (Some(lc), Some(rc)) => mismatch_inner(lc, rc, path),
            (None, None) => None,
            _ => Some(join_path(path)),
        };
        if found.is_some() {
            return found;
        }
        path.pop();
    }
    None
}

/// Like [`zip_leaves`] but hands out the `target` leaf mutably.
///
/// Never inserts or removes keys in `target`.
pub fn zip_leaves_mut<'b, A, B, F>(
    target: &mut IndexMap<String, A>,
    source: &'b IndexMap<String, B>,
    visit: &mut F,
) where
    A: Tree,
    B: Tree,
    F: FnMut(&[&'b str], &mut A, &'b B),
{
    let mut path = Vec::new();
    zip_mut_inner(target, source, &mut path, visit);
}

fn zip_mut_inner<'b, A, B, F>(
    target: &mut IndexMap<String, A>,
    source: &'b IndexMap<String, B>,
    path: &mut Vec<&'b str>,
    visit: &mut F,
) where
    A: Tree,
    B: Tree,
    F: FnMut(&[&'b str], &mut A, &'b B),
{
    for (key, s) in source {
        let Some(t) = target.get_mut(key) else {
            continue;
        };
        path.push(key.as_str());
        match (t.children().is_some(), s.children()) {
            (true, Some(sc)) => {
                if let Some(tc) = t.children_mut() {
                    zip_mut_inner(tc, sc, path, visit);
                }
            }
            (false, None) => visit(path, t, s),
            _ => {}
        }
        path.pop();
    }
}

/// Build a tree of the same shape as `source`, converting each leaf with
/// `leaf`. Leaves for which `leaf` returns `None` are left out; branches are
/// always kept.
pub fn map_leaves<A, B, F>(source: &IndexMap<String, A>, leaf: &mut F) -> IndexMap<String, B>
where
    A: Tree,
    B: Tree,
    F: FnMut(&[&str], &A) -> Option<B>,
{
    let mut path = Vec::new();
    map_inner(source, &mut path, leaf)
}

fn map_inner<'a, A, B, F>(
    source: &'a IndexMap<String, A>,
    path: &mut Vec<&'a str>,
    leaf: &mut F,
) -> IndexMap<String, B>
where
    A: Tree,
    B: Tree,
    F: FnMut(&[&str], &A) -> Option<B>,
{
    let mut out = IndexMap::with_capacity(source.len());
    for (key, node) in source {
        path.push(key.as_str());
        let mapped = match node.children() {
            Some(children) => Some(B::branch(map_inner(children, path, leaf))),
            None => leaf(path, node),
        };
        if let Some(mapped) = mapped {
            out.insert(key.clone(), mapped);
        }
        path.pop();
    }
    out
}

/// Add to `target` every branch and leaf of `source` it does not have yet,
/// converting new leaves with `leaf`. Existing entries are never modified.
///
/// Returns the number of leaves added.
pub fn graft_missing<A, B, F>(
    target: &mut IndexMap<String, B>,
    source: &IndexMap<String, A>,
    leaf: &mut F,
) -> usize
where
    A: Tree,
    B: Tree,
    F: FnMut(&[&str], &A) -> Option<B>,
{
    let mut path = Vec::new();
    graft_inner(target, source, &mut path, leaf)
}

fn graft_inner<'a, A, B, F>(
    target: &mut IndexMap<String, B>,
    source: &'a IndexMap<String, A>,
    path: &mut Vec<&'a str>,
    leaf: &mut F,
) -> usize
where
    A: Tree,
    B: Tree,
    F: FnMut(&[&str], &A) -> Option<B>,
{
    let mut added = 0;
    for (key, node) in source {
        path.push(key.as_str());
        match (target.get_mut(key), node.children()) {
            (Some(existing), Some(children)) => {
                if let Some(existing_children) = existing.children_mut() {
                    added += graft_inner(existing_children, children, path, leaf);
                }
            }
            (Some(_), None) => {}
            (None, Some(children)) => {
                let mut fresh = IndexMap::new();
                added += graft_inner(&mut fresh, children, path, leaf);
                target.insert(key.clone(), B::branch(fresh));
            }
            (None, None) => {
                if let Some(mapped) = leaf(path, node) {
                    target.insert(key.clone(), mapped);
                    added += 1;
                }
            }
        }
        path.pop();
    }
    added
}
