// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Assembly of synthetic BOM data for tests.

use crate::format::{BOM_MAGIC, TREE_MAGIC};

/// Accumulates blocks and variables and lays them out as a BOM file.
///
/// Block 0 is always the reserved empty block. Layout is header, block data,
/// blocks index, then variables.
#[derive(Default)]
pub struct TestBom {
    blocks: Vec<Vec<u8>>,
    overrides: Vec<(u32, u32, u32)>,
    vars: Vec<(String, u32)>,
}

impl TestBom {
    pub fn add_block(&mut self, data: Vec<u8>) -> u32 {
        self.blocks.push(data);
        self.blocks.len() as u32
    }

    /// Allocate a block id whose content is provided later via [Self::set_block].
    pub fn reserve_block(&mut self) -> u32 {
        self.add_block(vec![])
    }

    pub fn set_block(&mut self, id: u32, data: Vec<u8>) {
        self.blocks[id as usize - 1] = data;
    }

    /// Force the blocks index entry for a block to arbitrary values.
    pub fn override_entry(&mut self, id: u32, offset: u32, length: u32) {
        self.overrides.push((id, offset, length));
    }

    pub fn add_var(&mut self, name: &str, block: u32) {
        self.vars.push((name.to_string(), block));
    }

    /// Add a tree with a single leaf holding `paths`, returning the tree block.
    pub fn add_paths_tree(&mut self, paths: &[TestPath]) -> u32 {
        let mut entries = vec![];

        for path in paths {
            let record = self.add_block(path_record_block(
                path.path_type,
                path.mode,
                0,
                0,
                0,
                path.size,
                path.checksum,
                &path.link,
            ));
            let info = self.add_block(path_info_block(path.id, record));
            let file = self.add_block(file_block(path.parent, &path.name));
            entries.push((info, file));
        }

        let node = self.add_block(node_block(true, 0, 0, &entries));
        self.add_block(tree_block(node, paths.len() as u32))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; 32];
        let mut entries = vec![(0u32, 0u32)];

        for block in &self.blocks {
            if block.is_empty() {
                entries.push((0, 0));
            } else {
                entries.push((data.len() as u32, block.len() as u32));
                data.extend(block);
            }
        }

        for (id, offset, length) in &self.overrides {
            entries[*id as usize] = (*offset, *length);
        }

        let index_offset = data.len() as u32;
        data.extend((entries.len() as u32).to_be_bytes());
        for (offset, length) in &entries {
            data.extend(offset.to_be_bytes());
            data.extend(length.to_be_bytes());
        }
        let index_length = data.len() as u32 - index_offset;

        let vars_offset = data.len() as u32;
        data.extend((self.vars.len() as u32).to_be_bytes());
        for (name, block) in &self.vars {
            data.extend(block.to_be_bytes());
            data.push(name.len() as u8);
            data.extend(name.as_bytes());
        }
        let vars_length = data.len() as u32 - vars_offset;

        let mut header = vec![];
        header.extend(BOM_MAGIC);
        header.extend(1u32.to_be_bytes());
        header.extend((self.blocks.len() as u32).to_be_bytes());
        header.extend(index_offset.to_be_bytes());
        header.extend(index_length.to_be_bytes());
        header.extend(vars_offset.to_be_bytes());
        header.extend(vars_length.to_be_bytes());
        data[0..32].copy_from_slice(&header);

        data
    }
}

/// Description of a path to add via [TestBom::add_paths_tree].
pub struct TestPath {
    pub id: u32,
    pub parent: u32,
    pub name: String,
    pub path_type: u8,
    pub mode: u16,
    pub size: u32,
    pub checksum: u32,
    pub link: String,
}

impl TestPath {
    pub fn dir(id: u32, parent: u32, name: &str, mode: u16) -> Self {
        Self {
            id,
            parent,
            name: name.to_string(),
            path_type: 2,
            mode,
            size: 0,
            checksum: 0,
            link: String::new(),
        }
    }

    pub fn file(id: u32, parent: u32, name: &str, mode: u16, size: u32, checksum: u32) -> Self {
        Self {
            id,
            parent,
            name: name.to_string(),
            path_type: 1,
            mode,
            size,
            checksum,
            link: String::new(),
        }
    }

    pub fn link(id: u32, parent: u32, name: &str, target: &str) -> Self {
        Self {
            id,
            parent,
            name: name.to_string(),
            path_type: 3,
            mode: 0o120755,
            size: target.len() as u32,
            checksum: 0,
            link: target.to_string(),
        }
    }
}

pub fn tree_block(root: u32, path_count: u32) -> Vec<u8> {
    let mut data = vec![];
    data.extend(TREE_MAGIC);
    data.extend(1u32.to_be_bytes());
    data.extend(root.to_be_bytes());
    data.extend(4096u32.to_be_bytes());
    data.extend(path_count.to_be_bytes());
    data.push(0);
    data
}

pub fn node_block(is_leaf: bool, forward: u32, backward: u32, entries: &[(u32, u32)]) -> Vec<u8> {
    let mut data = vec![];
    data.extend((is_leaf as u16).to_be_bytes());
    data.extend((entries.len() as u16).to_be_bytes());
    data.extend(forward.to_be_bytes());
    data.extend(backward.to_be_bytes());
    for (value, key) in entries {
        data.extend(value.to_be_bytes());
        data.extend(key.to_be_bytes());
    }
    data
}

pub fn file_block(parent: u32, name: &str) -> Vec<u8> {
    let mut data = vec![];
    data.extend(parent.to_be_bytes());
    data.extend(name.as_bytes());
    data.push(0);
    data
}

pub fn path_info_block(path_id: u32, record: u32) -> Vec<u8> {
    let mut data = vec![];
    data.extend(path_id.to_be_bytes());
    data.extend(record.to_be_bytes());
    data
}

#[allow(clippy::too_many_arguments)]
pub fn path_record_block(
    path_type: u8,
    mode: u16,
    uid: u32,
    gid: u32,
    mtime: u32,
    size: u32,
    checksum: u32,
    link: &str,
) -> Vec<u8> {
    let mut data = vec![path_type, 1];
    data.extend(0x0fu16.to_be_bytes());
    data.extend(mode.to_be_bytes());
    data.extend(uid.to_be_bytes());
    data.extend(gid.to_be_bytes());
    data.extend(mtime.to_be_bytes());
    data.extend(size.to_be_bytes());
    data.push(0);
    data.extend(checksum.to_be_bytes());
    if link.is_empty() {
        data.extend(0u32.to_be_bytes());
    } else {
        data.extend((link.len() as u32 + 1).to_be_bytes());
        data.extend(link.as_bytes());
        data.push(0);
    }
    data
}

pub fn bom_info_block(number_of_paths: u32, entries: &[(u32, u32)]) -> Vec<u8> {
    let mut data = vec![];
    data.extend(1u32.to_be_bytes());
    data.extend(number_of_paths.to_be_bytes());
    data.extend((entries.len() as u32).to_be_bytes());
    for (entry_type, count) in entries {
        data.extend(entry_type.to_be_bytes());
        data.extend(count.to_be_bytes());
        data.extend(0u64.to_be_bytes());
    }
    data
}

pub fn vindex_block(tree: u32) -> Vec<u8> {
    let mut data = vec![];
    data.extend(1u32.to_be_bytes());
    data.extend(tree.to_be_bytes());
    data.extend(0u32.to_be_bytes());
    data.push(0);
    data
}

/// A BOM with a `BomInfo` and a `Paths` tree holding only the root directory.
pub fn minimal_root_bom() -> Vec<u8> {
    let mut bom = TestBom::default();

    let info = bom.add_block(bom_info_block(1, &[(7, 1)]));
    let tree = bom.add_paths_tree(&[TestPath::dir(1, 0, ".", 0o040755)]);

    bom.add_var("BomInfo", info);
    bom.add_var("Paths", tree);

    bom.build()
}
