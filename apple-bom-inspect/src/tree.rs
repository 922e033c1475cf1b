// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Walking trees of [BomBlockPaths].
//!
//! Trees are rooted at [crate::format::BomBlockTree::block_paths_index]. Non-leaf
//! nodes hold child node block indices in [BomPathsEntry::value_block_index].
//! Leaf nodes hold the actual entries and are linked to their siblings.
//!
//! Walking uses an explicit stack and a set of visited blocks. Data we can't
//! trust should never be able to recurse us off the end of the call stack or
//! loop forever.

use {
    crate::{
        error::Error,
        format::{BomBlockPaths, BomPathsEntry, ParsedBom},
        Limits,
    },
    log::{trace, warn},
    std::collections::HashSet,
};

/// The result of walking a tree.
#[derive(Debug, Default)]
pub struct TreeWalk {
    /// Leaf entries, in tree order.
    pub entries: Vec<BomPathsEntry>,

    /// Block indices of every node visited, in visit order.
    pub nodes: Vec<u32>,

    /// Problems encountered. The walk stops or skips a branch on each of these.
    pub errors: Vec<Error>,
}

fn read_node(bom: &ParsedBom, block: u32) -> Result<BomBlockPaths, Error> {
    bom.block_as_paths(block)
        .map_err(|err| Error::MalformedTreeNode {
            block,
            detail: err.to_string(),
        })
}

/// Walk a tree depth-first, left to right, collecting leaf entries.
///
/// This is the canonical traversal. Sibling pointers are not followed, but
/// a leaf whose forward pointer refers to a node we have already seen is
/// treated as a cycle and ends the walk.
pub fn walk_tree(bom: &ParsedBom, root: u32, limits: &Limits) -> TreeWalk {
    let mut walk = TreeWalk::default();
    let mut visited = HashSet::new();
    let mut stack = vec![(root, 0usize)];

    while let Some((block, depth)) = stack.pop() {
        if depth >= limits.tree_depth {
            walk.errors.push(Error::TreeTooDeep {
                block,
                limit: limits.tree_depth,
            });
            continue;
        }

        if !visited.insert(block) {
            walk.errors.push(Error::CyclicTreeReference { block });
            continue;
        }

        let node = match read_node(bom, block) {
            Ok(node) => node,
            Err(err) => {
                walk.errors.push(err);
                break;
            }
        };

        trace!(
            "tree node {} @ depth {}: leaf={} count={}",
            block,
            depth,
            node.is_leaf(),
            node.count
        );
        walk.nodes.push(block);

        if node.is_leaf() {
            walk.entries.extend(node.paths.iter().copied());

            let forward = node.next_paths_block_index;
            if forward != 0 && visited.contains(&forward) {
                walk.errors.push(Error::CyclicTreeReference { block: forward });
                break;
            }
        } else {
            // Reversed so the leftmost child is popped first.
            stack.extend(
                node.paths
                    .iter()
                    .rev()
                    .map(|entry| (entry.value_block_index, depth + 1)),
            );
        }
    }

    for err in &walk.errors {
        warn!("tree rooted at block {}: {}", root, err);
    }

    walk
}

/// Walk a tree by descending to its leftmost leaf and following sibling links.
///
/// This should produce the same entries as [walk_tree] for well-formed trees.
pub fn walk_leaves_linear(bom: &ParsedBom, root: u32, limits: &Limits) -> TreeWalk {
    let mut walk = TreeWalk::default();
    let mut visited = HashSet::new();

    let mut block = root;
    let mut depth = 0;

    let mut node = loop {
        if depth >= limits.tree_depth {
            walk.errors.push(Error::TreeTooDeep {
                block,
                limit: limits.tree_depth,
            });
            return walk;
        }
        if !visited.insert(block) {
            walk.errors.push(Error::CyclicTreeReference { block });
            return walk;
        }

        let node = match read_node(bom, block) {
            Ok(node) => node,
            Err(err) => {
                walk.errors.push(err);
                return walk;
            }
        };
        walk.nodes.push(block);

        if node.is_leaf() {
            break node;
        }

        block = match node.paths.first() {
            Some(entry) => entry.value_block_index,
            None => {
                walk.errors.push(Error::MalformedTreeNode {
                    block,
                    detail: "non-leaf node has no children".to_string(),
                });
                return walk;
            }
        };
        depth += 1;
    };

    loop {
        walk.entries.extend(node.paths.iter().copied());

        let forward = node.next_paths_block_index;
        if forward == 0 {
            break;
        }
        if !visited.insert(forward) {
            walk.errors.push(Error::CyclicTreeReference { block: forward });
            break;
        }

        node = match read_node(bom, forward) {
            Ok(node) => node,
            Err(err) => {
                walk.errors.push(err);
                break;
            }
        };
        walk.nodes.push(forward);
    }

    walk
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::{self, TestBom},
    };

    /// Builds a two level tree with three leaves linked left to right.
    fn three_leaf_bom() -> (Vec<u8>, u32) {
        let mut bom = TestBom::default();

        let leaf_a = bom.reserve_block();
        let leaf_b = bom.reserve_block();
        let leaf_c = bom.reserve_block();

        bom.set_block(
            leaf_a,
            testutil::node_block(true, leaf_b, 0, &[(100, 101), (102, 103)]),
        );
        bom.set_block(
            leaf_b,
            testutil::node_block(true, leaf_c, leaf_a, &[(104, 105)]),
        );
        bom.set_block(
            leaf_c,
            testutil::node_block(true, 0, leaf_b, &[(106, 107), (108, 109)]),
        );

        let root = bom.add_block(testutil::node_block(
            false,
            0,
            0,
            &[(leaf_a, 200), (leaf_b, 201), (leaf_c, 202)],
        ));

        (bom.build(), root)
    }

    fn values(walk: &TreeWalk) -> Vec<u32> {
        walk.entries.iter().map(|e| e.value_block_index).collect()
    }

    #[test]
    fn depth_first_order() -> Result<(), Error> {
        let (data, root) = three_leaf_bom();
        let bom = ParsedBom::parse(&data)?;

        let walk = walk_tree(&bom, root, &Limits::default());
        assert!(walk.errors.is_empty(), "{:?}", walk.errors);
        assert_eq!(values(&walk), vec![100, 102, 104, 106, 108]);
        assert_eq!(walk.entries[2].key_block_index, 105);
        assert_eq!(walk.nodes.len(), 4);
        assert_eq!(walk.nodes[0], root);

        let again = walk_tree(&bom, root, &Limits::default());
        assert_eq!(walk.entries, again.entries);

        Ok(())
    }

    #[test]
    fn linear_matches_depth_first() -> Result<(), Error> {
        let (data, root) = three_leaf_bom();
        let bom = ParsedBom::parse(&data)?;

        let linear = walk_leaves_linear(&bom, root, &Limits::default());
        let canonical = walk_tree(&bom, root, &Limits::default());

        assert!(linear.errors.is_empty(), "{:?}", linear.errors);
        assert_eq!(linear.entries, canonical.entries);

        Ok(())
    }

    #[test]
    fn revisited_child_is_skipped() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let leaf = bom.add_block(testutil::node_block(true, 0, 0, &[(1, 2)]));
        let root = bom.add_block(testutil::node_block(
            false,
            0,
            0,
            &[(leaf, 0), (leaf, 0)],
        ));
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let walk = walk_tree(&parsed, root, &Limits::default());
        assert_eq!(values(&walk), vec![1]);
        assert_eq!(walk.errors.len(), 1);
        assert!(matches!(
            walk.errors[0],
            Error::CyclicTreeReference { block } if block == leaf
        ));

        Ok(())
    }

    #[test]
    fn self_referential_node() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let root = bom.reserve_block();
        bom.set_block(root, testutil::node_block(false, 0, 0, &[(root, 0)]));
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let walk = walk_tree(&parsed, root, &Limits::default());
        assert!(walk.entries.is_empty());
        assert!(matches!(walk.errors[0], Error::CyclicTreeReference { .. }));

        let linear = walk_leaves_linear(&parsed, root, &Limits::default());
        assert!(matches!(linear.errors[0], Error::CyclicTreeReference { .. }));

        Ok(())
    }

    #[test]
    fn forward_pointer_to_ancestor() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let root = bom.reserve_block();
        let leaf = bom.add_block(testutil::node_block(true, root, 0, &[(1, 2)]));
        let second = bom.add_block(testutil::node_block(true, 0, 0, &[(3, 4)]));
        bom.set_block(
            root,
            testutil::node_block(false, 0, 0, &[(leaf, 0), (second, 0)]),
        );
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let walk = walk_tree(&parsed, root, &Limits::default());
        assert_eq!(values(&walk), vec![1]);
        assert!(matches!(
            walk.errors[0],
            Error::CyclicTreeReference { block } if block == root
        ));

        let linear = walk_leaves_linear(&parsed, root, &Limits::default());
        assert_eq!(values(&linear), vec![1]);
        assert_eq!(linear.errors.len(), 1);

        Ok(())
    }

    #[test]
    fn malformed_node_keeps_prior_leaves() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let good = bom.add_block(testutil::node_block(true, 0, 0, &[(1, 2)]));
        let mut bad = testutil::node_block(true, 0, 0, &[(3, 4), (5, 6)]);
        bad.truncate(bad.len() - 4);
        let bad = bom.add_block(bad);
        let root = bom.add_block(testutil::node_block(
            false,
            0,
            0,
            &[(good, 0), (bad, 0)],
        ));
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let walk = walk_tree(&parsed, root, &Limits::default());
        assert_eq!(values(&walk), vec![1]);
        assert_eq!(walk.errors.len(), 1);
        assert!(matches!(
            walk.errors[0],
            Error::MalformedTreeNode { block, .. } if block == bad
        ));

        Ok(())
    }

    #[test]
    fn empty_root_block() -> Result<(), Error> {
        let bom = TestBom::default();
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let walk = walk_tree(&parsed, 0, &Limits::default());
        assert!(walk.entries.is_empty());
        assert!(matches!(walk.errors[0], Error::MalformedTreeNode { block: 0, .. }));

        Ok(())
    }

    #[test]
    fn depth_limit() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let mut child = bom.add_block(testutil::node_block(true, 0, 0, &[(1, 2)]));
        for _ in 0..5 {
            child = bom.add_block(testutil::node_block(false, 0, 0, &[(child, 0)]));
        }
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let limits = Limits {
            tree_depth: 3,
            path_depth: 16,
        };
        let walk = walk_tree(&parsed, child, &limits);
        assert!(walk.entries.is_empty());
        assert!(matches!(walk.errors[0], Error::TreeTooDeep { limit: 3, .. }));

        let walk = walk_tree(&parsed, child, &Limits::default());
        assert_eq!(values(&walk), vec![1]);

        Ok(())
    }
}
