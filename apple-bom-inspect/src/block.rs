// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Typed views of individual blocks.
//!
//! Blocks carry no type information. A block's type is known only from what
//! refers to it: a variable, a tree, a tree node, or a path info record.
//! [classify_blocks] follows every such reference reachable from the
//! variables and assigns each block a [BlockRole]. Blocks nothing refers to
//! stay [BomBlock::Unknown].

use {
    crate::{
        error::Error,
        format::{
            BomBlockBomInfo, BomBlockFile, BomBlockPathInfoIndex, BomBlockPathRecord,
            BomBlockPaths, BomBlockTree, BomBlockVIndex, ParsedBom,
        },
    },
    log::debug,
    serde::Serialize,
    std::collections::BTreeMap,
};

/// How a block is referenced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockRole {
    BomInfo,
    Tree,
    VIndex,
    Paths,
    File,
    PathInfoIndex,
    PathRecord,
}

/// A block decoded according to its [BlockRole].
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind")]
pub enum BomBlock {
    /// A block with no data.
    Empty,

    /// A block that nothing refers to or whose data could not be decoded.
    Unknown,

    BomInfo(BomBlockBomInfo),
    File(BomBlockFile),
    PathInfoIndex(BomBlockPathInfoIndex),
    PathRecord(BomBlockPathRecord),
    Paths(BomBlockPaths),
    Tree(BomBlockTree),
    VIndex(BomBlockVIndex),
}

impl BomBlock {
    /// Decode a block as a given role.
    ///
    /// Non-fatal problems decoding the block are returned alongside it.
    pub fn parse(bom: &ParsedBom, index: u32, role: BlockRole) -> Result<(Self, Vec<Error>), Error> {
        Ok(match role {
            BlockRole::BomInfo => {
                let info = bom.block_as_bom_info(index)?;
                (Self::BomInfo(info.value), info.errors)
            }
            BlockRole::Tree => (Self::Tree(bom.block_as_tree(index)?), vec![]),
            BlockRole::VIndex => (Self::VIndex(bom.block_as_vindex(index)?), vec![]),
            BlockRole::Paths => (Self::Paths(bom.block_as_paths(index)?), vec![]),
            BlockRole::File => (Self::File(bom.block_as_file(index)?), vec![]),
            BlockRole::PathInfoIndex => (
                Self::PathInfoIndex(bom.block_as_path_info_index(index)?),
                vec![],
            ),
            BlockRole::PathRecord => (Self::PathRecord(bom.block_as_path_record(index)?), vec![]),
        })
    }
}

fn assign(roles: &mut BTreeMap<u32, BlockRole>, index: u32, role: BlockRole) -> bool {
    match roles.get(&index) {
        Some(existing) => {
            if *existing != role {
                debug!(
                    "block {} referenced as {:?} and {:?}; keeping {:?}",
                    index, existing, role, existing
                );
            }
            false
        }
        None => {
            roles.insert(index, role);
            true
        }
    }
}

fn classify_tree(bom: &ParsedBom, index: u32, roles: &mut BTreeMap<u32, BlockRole>) {
    if !assign(roles, index, BlockRole::Tree) {
        return;
    }

    let tree = match bom.block_as_tree(index) {
        Ok(tree) => tree,
        Err(_) => return,
    };

    let walk = bom.walk_tree(tree.block_paths_index);

    for node in walk.nodes {
        assign(roles, node, BlockRole::Paths);
    }

    for entry in walk.entries {
        assign(roles, entry.key_block_index, BlockRole::File);

        if assign(roles, entry.value_block_index, BlockRole::PathInfoIndex) {
            if let Ok(info) = bom.block_as_path_info_index(entry.value_block_index) {
                assign(roles, info.path_record_index, BlockRole::PathRecord);
            }
        }
    }
}

/// Assign a role to every block reachable from the BOM's variables.
///
/// When a block is reachable in more than one way, the first role found wins.
pub fn classify_blocks(bom: &ParsedBom) -> BTreeMap<u32, BlockRole> {
    let mut roles = BTreeMap::new();

    // Iterate in reverse so the last definition of a duplicated variable wins.
    for var in bom.vars.vars.iter().rev() {
        match var.name.as_str() {
            "BomInfo" => {
                assign(&mut roles, var.block_index, BlockRole::BomInfo);
            }
            "Paths" | "HLIndex" | "Size64" => {
                classify_tree(bom, var.block_index, &mut roles);
            }
            "VIndex" => {
                if assign(&mut roles, var.block_index, BlockRole::VIndex) {
                    if let Ok(vindex) = bom.block_as_vindex(var.block_index) {
                        classify_tree(bom, vindex.tree_block_index, &mut roles);
                    }
                }
            }
            name => {
                debug!("variable {} has unknown block type", name);
            }
        }
    }

    roles
}

/// Describes a single block in the blocks index.
#[derive(Clone, Debug, Serialize)]
pub struct BlockSummary {
    /// Index of this block.
    pub index: u32,

    pub file_offset: u32,
    pub length: u32,

    /// Decoded block content.
    #[serde(flatten)]
    pub block: BomBlock,

    /// Hex encoded block data. Only present when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_hex: Option<String>,

    /// Why the block could not be decoded according to its role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// Describe every block in the blocks index.
pub fn summarize_blocks(bom: &ParsedBom, include_raw: bool) -> Vec<BlockSummary> {
    let roles = classify_blocks(bom);

    bom.blocks
        .blocks
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let index = index as u32;

            let raw_hex = if include_raw {
                Some(
                    bom.block_data(index)
                        .map(hex::encode)
                        .unwrap_or_default(),
                )
            } else {
                None
            };

            let (block, parse_error) = if entry.is_empty() {
                (BomBlock::Empty, None)
            } else if let Some(role) = roles.get(&index) {
                match BomBlock::parse(bom, index, *role) {
                    Ok((block, errors)) if errors.is_empty() => (block, None),
                    Ok((block, errors)) => (
                        block,
                        Some(
                            errors
                                .iter()
                                .map(|e| e.to_string())
                                .collect::<Vec<_>>()
                                .join("; "),
                        ),
                    ),
                    Err(err) => (BomBlock::Unknown, Some(err.to_string())),
                }
            } else {
                (BomBlock::Unknown, None)
            };

            BlockSummary {
                index,
                file_offset: entry.file_offset,
                length: entry.length,
                block,
                raw_hex,
                parse_error,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::{self, TestBom, TestPath},
    };

    #[test]
    fn minimal_roles() -> Result<(), Error> {
        let data = testutil::minimal_root_bom();
        let bom = ParsedBom::parse(&data)?;

        let roles = classify_blocks(&bom);
        assert_eq!(
            roles.values().copied().collect::<Vec<_>>(),
            vec![
                BlockRole::BomInfo,
                BlockRole::PathRecord,
                BlockRole::PathInfoIndex,
                BlockRole::File,
                BlockRole::Paths,
                BlockRole::Tree,
            ]
        );
        assert_eq!(roles.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);

        Ok(())
    }

    #[test]
    fn summaries() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let tree = bom.add_paths_tree(&[TestPath::dir(1, 0, ".", 0o040755)]);
        let stray = bom.add_block(vec![0xde, 0xad]);
        bom.add_var("Paths", tree);
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let blocks = summarize_blocks(&parsed, false);
        assert_eq!(blocks.len(), stray as usize + 1);
        assert!(matches!(blocks[0].block, BomBlock::Empty));
        assert!(matches!(blocks[tree as usize].block, BomBlock::Tree(_)));
        assert!(matches!(blocks[stray as usize].block, BomBlock::Unknown));
        assert!(blocks.iter().all(|b| b.raw_hex.is_none()));
        assert!(blocks.iter().all(|b| b.parse_error.is_none()));

        let blocks = summarize_blocks(&parsed, true);
        assert_eq!(blocks[0].raw_hex.as_deref(), Some(""));
        assert_eq!(blocks[stray as usize].raw_hex.as_deref(), Some("dead"));
        assert!(blocks.iter().all(|b| b.raw_hex.is_some()));

        let value = serde_json::to_value(&blocks[tree as usize])?;
        assert_eq!(value["kind"], "Tree");
        assert_eq!(value["tree"], "tree");
        assert_eq!(value["index"], tree);

        let value = serde_json::to_value(&blocks[0])?;
        assert_eq!(value["kind"], "Empty");

        Ok(())
    }

    #[test]
    fn undecodable_block_is_unknown() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let mut bad = testutil::tree_block(0, 0);
        bad[0] = b'T';
        let bad = bom.add_block(bad);
        bom.add_var("Paths", bad);
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let blocks = summarize_blocks(&parsed, false);
        assert!(matches!(blocks[bad as usize].block, BomBlock::Unknown));
        assert!(blocks[bad as usize]
            .parse_error
            .as_deref()
            .is_some_and(|e| e.contains("bad magic")));

        Ok(())
    }

    #[test]
    fn bom_info_errors_are_joined() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let mut info = testutil::bom_info_block(3, &[(7, 1)]);
        // Declare three entries while only one is present.
        info[8..12].copy_from_slice(&3u32.to_be_bytes());
        let info = bom.add_block(info);
        bom.add_var("BomInfo", info);
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let (_, errors) = BomBlock::parse(&parsed, info, BlockRole::BomInfo)?;
        let expected = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");

        let blocks = summarize_blocks(&parsed, false);
        assert!(matches!(blocks[info as usize].block, BomBlock::BomInfo(_)));
        assert_eq!(blocks[info as usize].parse_error.as_deref(), Some(expected.as_str()));
        assert!(expected.contains("only 1 could be read"));

        Ok(())
    }

    #[test]
    fn vindex_roles() -> Result<(), Error> {
        let mut bom = TestBom::default();
        let tree = bom.add_paths_tree(&[TestPath::dir(1, 0, ".", 0o040755)]);
        let vindex = bom.add_block(testutil::vindex_block(tree));
        bom.add_var("VIndex", vindex);
        let data = bom.build();
        let parsed = ParsedBom::parse(&data)?;

        let roles = classify_blocks(&parsed);
        assert_eq!(roles.get(&vindex), Some(&BlockRole::VIndex));
        assert_eq!(roles.get(&tree), Some(&BlockRole::Tree));

        let blocks = summarize_blocks(&parsed, false);
        match &blocks[vindex as usize].block {
            BomBlock::VIndex(v) => assert_eq!(v.tree_block_index, tree),
            other => panic!("unexpected block {other:?}"),
        }

        Ok(())
    }
}
