//! Read-only queries over a [`NodeStore`].

use std::collections::VecDeque;

use crate::models::TimelineNode;
use crate::store::NodeStore;

/// How many path entries leading up to a branch point are sent as context
/// with a branch generation request.
pub const BRANCH_CONTEXT_LEN: usize = 5;

/// Fresh opaque node/timeline id
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Nodes from the root down to `node_id`, inclusive. Empty if `node_id` is
/// not in the store.
pub fn path_to_root<'a>(store: &'a NodeStore, node_id: &str) -> Vec<&'a TimelineNode> {
    let mut path = Vec::new();
    let mut cursor = store.get(node_id);

    while let Some(node) = cursor {
        path.push(node);
        // depth bounds the walk even if links were tampered with
        if path.len() > store.len() {
            break;
        }
        cursor = node.parent_id.as_deref().and_then(|parent| store.get(parent));
    }

    path.reverse();
    path
}

/// Nodes without children, in creation order
pub fn leaves(store: &NodeStore) -> Vec<&TimelineNode> {
    store.nodes().filter(|node| node.is_leaf()).collect()
}

/// Deepest depth in the store, 0 when empty
pub fn max_depth(store: &NodeStore) -> usize {
    store.nodes().map(|node| node.depth).max().unwrap_or(0)
}

/// `node_id` followed by all of its descendants, breadth-first
pub fn subtree_ids(store: &NodeStore, node_id: &str) -> Vec<String> {
    if !store.contains(node_id) {
        return Vec::new();
    }

    let mut collected = vec![node_id.to_string()];
    let mut queue = VecDeque::from([node_id.to_string()]);

    while let Some(current) = queue.pop_front() {
        if let Some(node) = store.get(&current) {
            for child in &node.child_ids {
                collected.push(child.clone());
                queue.push_back(child.clone());
            }
        }
        if collected.len() > store.len() {
            break;
        }
    }

    collected
}

/// The last `len` entries of a path, oldest first
pub fn context_window<T>(path: &[T], len: usize) -> &[T] {
    let start = path.len().saturating_sub(len);
    &path[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Milestone;
    use chrono::Utc;
    use std::collections::HashSet;

    fn milestones(n: usize) -> Vec<Milestone> {
        (0..n)
            .map(|i| Milestone::new(format!("{}", 1800 + i), format!("M{}", i), "d", "i"))
            .collect()
    }

    fn branched_store() -> NodeStore {
        let mut store = NodeStore::create_root(milestones(4), Utc::now()).unwrap();
        let at = store.ids()[1].clone();
        let branch = store.add_branch(&at, milestones(5), None, Utc::now()).unwrap();
        store.add_branch(&branch[2], milestones(6), None, Utc::now()).unwrap();
        store
    }

    #[test]
    fn test_path_length_matches_depth() {
        let store = branched_store();
        for node in store.nodes() {
            let path = path_to_root(&store, &node.id);
            assert_eq!(path.len(), node.depth + 1);
            assert_eq!(path.last().unwrap().id, node.id);
            assert_eq!(path[0].id, store.root_id());
        }
    }

    #[test]
    fn test_path_of_missing_node_is_empty() {
        let store = branched_store();
        assert!(path_to_root(&store, "ghost").is_empty());
    }

    #[test]
    fn test_leaves_are_nodes_without_children() {
        let store = branched_store();
        let parents: HashSet<&str> = store
            .nodes()
            .filter_map(|n| n.parent_id.as_deref())
            .collect();

        let leaf_ids: HashSet<&str> = leaves(&store).iter().map(|n| n.id.as_str()).collect();
        let childless: HashSet<&str> = store
            .nodes()
            .filter(|n| !parents.contains(n.id.as_str()))
            .map(|n| n.id.as_str())
            .collect();

        assert_eq!(leaf_ids, childless);
        assert_eq!(leaf_ids.len(), 3);
    }

    #[test]
    fn test_max_depth() {
        let store = branched_store();
        // branch at depth 1, second branch at depth 4, six nodes deep
        assert_eq!(max_depth(&store), 10);
    }

    #[test]
    fn test_subtree_collects_descendants() {
        let store = branched_store();
        let root = store.root_id().to_string();
        assert_eq!(subtree_ids(&store, &root).len(), store.len());
        assert!(subtree_ids(&store, "ghost").is_empty());

        let last = store.ids().last().unwrap().clone();
        assert_eq!(subtree_ids(&store, &last), vec![last]);
    }

    #[test]
    fn test_context_window_keeps_nearest_entries() {
        let store = NodeStore::create_root(milestones(8), Utc::now()).unwrap();
        let last = store.ids()[7].clone();
        let path = path_to_root(&store, &last);

        let window = context_window(&path, BRANCH_CONTEXT_LEN);
        let titles: Vec<_> = window.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["M3", "M4", "M5", "M6", "M7"]);

        let short = &path[..2];
        assert_eq!(context_window(short, BRANCH_CONTEXT_LEN).len(), 2);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
