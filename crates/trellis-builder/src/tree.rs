//! Tree edit helpers over the arena-style schema
//!
//! The tree is edges in a flat id-indexed map, so every walk here is an
//! iterative traversal over ids; no pointer chasing, no recursion limits.

use std::collections::BTreeSet;

use trellis_core::Schema;

/// Check whether `candidate` is a strict ancestor of `of`
///
/// Walks the parent chain upward from `of` with a visited guard, so a
/// corrupted chain cannot loop forever.
pub(crate) fn is_ancestor(schema: &Schema, candidate: &str, of: &str) -> bool {
    let mut visited = BTreeSet::new();
    let mut current = schema.entity(of).and_then(|e| e.parent_id.as_deref());

    while let Some(id) = current {
        if id == candidate {
            return true;
        }
        if !visited.insert(id) {
            break;
        }
        current = schema.entity(id).and_then(|e| e.parent_id.as_deref());
    }

    false
}

/// Remove an entity from its owner's ordered list (root or parent children)
///
/// Returns the index it occupied, if it was listed.
pub(crate) fn detach(schema: &mut Schema, id: &str) -> Option<usize> {
    let parent_id = schema.entity(id).and_then(|e| e.parent_id.clone());
    match parent_id {
        Some(parent_id) => {
            let children = schema
                .entities
                .get_mut(&parent_id)
                .and_then(|p| p.children.as_mut())?;
            let index = children.iter().position(|child| child == id)?;
            children.remove(index);
            Some(index)
        }
        None => {
            let index = schema.root.iter().position(|root| root == id)?;
            schema.root.remove(index);
            Some(index)
        }
    }
}

/// Insert an id into the root list at `index`, clamped; default append
pub(crate) fn insert_into_root(schema: &mut Schema, id: &str, index: Option<usize>) {
    let position = index
        .unwrap_or(schema.root.len())
        .min(schema.root.len());
    schema.root.insert(position, id.to_string());
}

/// Insert an id into a parent's children list at `index`, clamped; default append
pub(crate) fn insert_into_children(
    schema: &mut Schema,
    parent_id: &str,
    id: &str,
    index: Option<usize>,
) {
    if let Some(parent) = schema.entities.get_mut(parent_id) {
        let children = parent.children.get_or_insert_with(Vec::new);
        let position = index.unwrap_or(children.len()).min(children.len());
        children.insert(position, id.to_string());
    }
}

/// Collect an entity and all its descendants, depth-first, self first
pub(crate) fn collect_subtree(schema: &Schema, id: &str) -> Vec<String> {
    let mut collected = Vec::new();
    let mut stack = vec![id.to_string()];

    while let Some(current) = stack.pop() {
        if let Some(entity) = schema.entity(&current) {
            // Push children reversed so the leftmost subtree is visited first.
            for child in entity.child_ids().iter().rev() {
                stack.push(child.clone());
            }
        }
        collected.push(current);
    }

    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::Entity;

    fn linked(pairs: &[(&str, Option<&str>, &[&str])]) -> Schema {
        let mut schema = Schema::new();
        for (id, parent, children) in pairs {
            let mut entity = Entity::new("node");
            entity.parent_id = parent.map(str::to_string);
            entity.children = Some(children.iter().map(|c| c.to_string()).collect());
            schema.entities.insert(id.to_string(), entity);
            if parent.is_none() {
                schema.root.push(id.to_string());
            }
        }
        schema
    }

    #[test]
    fn test_is_ancestor_walks_whole_chain() {
        let schema = linked(&[
            ("a", None, &["b"]),
            ("b", Some("a"), &["c"]),
            ("c", Some("b"), &[]),
        ]);

        assert!(is_ancestor(&schema, "a", "c"));
        assert!(is_ancestor(&schema, "b", "c"));
        assert!(!is_ancestor(&schema, "c", "a"));
        assert!(!is_ancestor(&schema, "c", "c"));
    }

    #[test]
    fn test_collect_subtree_depth_first_self_first() {
        let schema = linked(&[
            ("a", None, &["b", "d"]),
            ("b", Some("a"), &["c"]),
            ("c", Some("b"), &[]),
            ("d", Some("a"), &[]),
        ]);

        assert_eq!(collect_subtree(&schema, "a"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_detach_returns_previous_index() {
        let mut schema = linked(&[
            ("a", None, &["b", "c"]),
            ("b", Some("a"), &[]),
            ("c", Some("a"), &[]),
        ]);

        assert_eq!(detach(&mut schema, "c"), Some(1));
        assert_eq!(
            schema.entity("a").unwrap().child_ids(),
            &["b".to_string()][..]
        );
    }
}
