//! Read-only tree inspection: a breadth-first dump for debugging and an
//! invariant checker used by tests.

use std::collections::VecDeque;
use std::fmt;

use crate::common::{Error, PageId, Result};

use super::{BTreeIndex, Key};

/// Summary of one node as seen by [`dump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSummary {
    Internal {
        pid: PageId,
        parent: PageId,
        min_child: PageId,
        keys: Vec<Key>,
    },
    Leaf {
        pid: PageId,
        parent: PageId,
        next: PageId,
        keys: Vec<Key>,
    },
}

impl NodeSummary {
    pub fn pid(&self) -> PageId {
        match self {
            NodeSummary::Internal { pid, .. } | NodeSummary::Leaf { pid, .. } => *pid,
        }
    }

    pub fn keys(&self) -> &[Key] {
        match self {
            NodeSummary::Internal { keys, .. } | NodeSummary::Leaf { keys, .. } => keys,
        }
    }
}

/// Every node of a tree, grouped by level, root first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDump {
    pub levels: Vec<Vec<NodeSummary>>,
}

impl fmt::Display for TreeDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.levels.is_empty() {
            return writeln!(f, "(empty)");
        }
        for (depth, level) in self.levels.iter().enumerate() {
            writeln!(f, "Level {}:", depth)?;
            for node in level {
                match node {
                    NodeSummary::Internal {
                        pid,
                        parent,
                        min_child,
                        keys,
                    } => writeln!(
                        f,
                        "  {} internal parent={} min_child={} keys={:?}",
                        pid, parent, min_child, keys
                    )?,
                    NodeSummary::Leaf {
                        pid,
                        parent,
                        next,
                        keys,
                    } => writeln!(
                        f,
                        "  {} leaf parent={} next={} keys={:?}",
                        pid, parent, next, keys
                    )?,
                }
            }
        }
        Ok(())
    }
}

/// Read every node breadth-first.
pub fn dump(index: &mut BTreeIndex) -> Result<TreeDump> {
    let Some(height) = index.height() else {
        return Ok(TreeDump::default());
    };

    let mut levels = Vec::with_capacity(height as usize + 1);
    let mut frontier = vec![index.root_pid()];
    for depth in 0..=height {
        let mut level = Vec::with_capacity(frontier.len());
        let mut next_frontier = Vec::new();
        for pid in frontier {
            if depth < height {
                let node = index.read_internal(pid)?;
                next_frontier.extend(node.children());
                level.push(NodeSummary::Internal {
                    pid,
                    parent: node.parent(),
                    min_child: node.min_child(),
                    keys: node.entries().map(|(k, _)| k).collect(),
                });
            } else {
                let leaf = index.read_leaf(pid)?;
                level.push(NodeSummary::Leaf {
                    pid,
                    parent: leaf.parent(),
                    next: leaf.next_leaf(),
                    keys: leaf.entries().map(|(k, _)| k).collect(),
                });
            }
        }
        levels.push(level);
        frontier = next_frontier;
    }
    Ok(TreeDump { levels })
}

/// Shape of a verified tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub height: Option<u32>,
    pub internal_count: usize,
    pub leaf_count: usize,
    pub entry_count: usize,
}

/// Walk the whole tree and check its structural invariants.
///
/// Checks, for every node reachable from the root:
/// - keys strictly ascend and lie within the range the parent routes
/// - the parent pointer names the node that lists it as a child
/// - every leaf sits exactly `height` levels below the root
/// - the leaf chain visits the leaves in key order and ends at none
///
/// # Errors
/// Returns `Error::Corrupted` naming the first offending page.
pub fn verify(index: &mut BTreeIndex) -> Result<TreeStats> {
    let Some(height) = index.height() else {
        return Ok(TreeStats::default());
    };
    let mut stats = TreeStats {
        height: Some(height),
        ..TreeStats::default()
    };

    struct Pending {
        pid: PageId,
        parent: PageId,
        depth: u32,
        low: Option<Key>,
        high: Option<Key>,
    }

    let mut queue = VecDeque::from([Pending {
        pid: index.root_pid(),
        parent: PageId::INVALID,
        depth: 0,
        low: None,
        high: None,
    }]);
    let mut leaves = Vec::new();

    while let Some(Pending {
        pid,
        parent,
        depth,
        low,
        high,
    }) = queue.pop_front()
    {
        if depth < height {
            let node = index.read_internal(pid)?;
            stats.internal_count += 1;
            check_parent(pid, node.parent(), parent)?;
            if !node.min_child().is_valid() || node.key_count() == 0 {
                return Err(corrupted(pid, "internal node without children"));
            }
            let keys: Vec<Key> = node.entries().map(|(k, _)| k).collect();
            check_keys(pid, &keys, low, high)?;

            let mut child_low = low;
            for (child, child_high) in node
                .children()
                .zip(keys.iter().map(|k| Some(*k)).chain(std::iter::once(high)))
            {
                queue.push_back(Pending {
                    pid: child,
                    parent: pid,
                    depth: depth + 1,
                    low: child_low,
                    high: child_high,
                });
                child_low = child_high;
            }
        } else {
            let leaf = index.read_leaf(pid)?;
            stats.leaf_count += 1;
            stats.entry_count += leaf.key_count();
            check_parent(pid, leaf.parent(), parent)?;
            if leaf.is_empty() {
                return Err(corrupted(pid, "empty leaf"));
            }
            let keys: Vec<Key> = leaf.entries().map(|(k, _)| k).collect();
            check_keys(pid, &keys, low, high)?;
            leaves.push((pid, leaf.next_leaf()));
        }
    }

    // Breadth-first order visits leaves left to right
    for window in leaves.windows(2) {
        let ((pid, next), (expected, _)) = (window[0], window[1]);
        if next != expected {
            return Err(corrupted(pid, format!("next leaf {} expected {}", next, expected)));
        }
    }
    if let Some(&(pid, next)) = leaves.last() {
        if next.is_valid() {
            return Err(corrupted(pid, format!("last leaf points to {}", next)));
        }
    }

    Ok(stats)
}

fn corrupted(pid: PageId, reason: impl Into<String>) -> Error {
    Error::Corrupted {
        pid,
        reason: reason.into(),
    }
}

fn check_parent(pid: PageId, actual: PageId, expected: PageId) -> Result<()> {
    if actual != expected {
        return Err(corrupted(pid, format!("parent {} expected {}", actual, expected)));
    }
    Ok(())
}

fn check_keys(pid: PageId, keys: &[Key], low: Option<Key>, high: Option<Key>) -> Result<()> {
    if keys.windows(2).any(|w| w[0] >= w[1]) {
        return Err(corrupted(pid, "keys not strictly ascending"));
    }
    if let (Some(low), Some(&first)) = (low, keys.first()) {
        if first < low {
            return Err(corrupted(pid, format!("key {} below range start {}", first, low)));
        }
    }
    if let (Some(high), Some(&last)) = (high, keys.last()) {
        if last >= high {
            return Err(corrupted(pid, format!("key {} at or above range end {}", last, high)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::RecordId;
    use crate::index::btree::LeafNode;
    use crate::storage::OpenMode;
    use tempfile::tempdir;

    fn build(keys: impl IntoIterator<Item = Key>) -> (BTreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let mut index = BTreeIndex::open(dir.path().join("inspect"), OpenMode::ReadWrite).unwrap();
        for key in keys {
            index.insert(key, RecordId::new(PageId::new(1), key)).unwrap();
        }
        (index, dir)
    }

    #[test]
    fn test_dump_empty() {
        let (mut index, _dir) = build([]);
        let tree = dump(&mut index).unwrap();

        assert!(tree.levels.is_empty());
        assert_eq!(tree.to_string(), "(empty)\n");
    }

    #[test]
    fn test_dump_single_leaf() {
        let (mut index, _dir) = build([3, 1, 2]);
        let tree = dump(&mut index).unwrap();

        assert_eq!(tree.levels.len(), 1);
        assert_eq!(tree.levels[0][0].keys(), &[1, 2, 3]);
        assert_eq!(
            tree.to_string(),
            "Level 0:\n  Page(1) leaf parent=Page(INVALID) next=Page(INVALID) keys=[1, 2, 3]\n"
        );
    }

    #[test]
    fn test_dump_two_levels() {
        let limit = LeafNode::ENTRY_LIMIT as Key;
        let (mut index, _dir) = build(0..=limit);
        let tree = dump(&mut index).unwrap();

        assert_eq!(tree.levels.len(), 2);
        assert_eq!(tree.levels[0][0].keys(), &[limit / 2]);
        let leaf_pids: Vec<PageId> = tree.levels[1].iter().map(NodeSummary::pid).collect();
        assert_eq!(leaf_pids, vec![PageId::new(1), PageId::new(2)]);
    }

    #[test]
    fn test_verify_counts() {
        let (mut index, _dir) = build((0..1000).rev());
        let stats = verify(&mut index).unwrap();

        assert_eq!(stats.entry_count, 1000);
        assert_eq!(stats.height, index.height());
        assert!(stats.leaf_count > 1);
        assert!(stats.internal_count >= 1);
    }

    #[test]
    fn test_verify_empty() {
        let (mut index, _dir) = build([]);
        assert_eq!(verify(&mut index).unwrap(), TreeStats::default());
    }
}
