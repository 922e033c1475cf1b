// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! BOM file format primitives.
//!
//! Apple doesn't appear to have documented the BOM file format in any
//! publications or open source source code. So details of our understanding
//! of the BOM format could be wildly inaccurate.
//!
//! # File Format
//!
//! BOM files start with a header, [BomHeader]. The first 8 bytes of which
//! are magic `BOMStore`. All integers are big-endian.
//!
//! BOM files logically consist of a collection of *blocks* and
//! *variables*. Each of these is defined by an *index*, the location of
//! which is defined in [BomHeader]. The *blocks* index is defined by
//! [BomBlocksIndex] and the *vars* index by [BomVarsIndex].
//!
//! Each *block* is simply an offset and length effectively denoting a
//! `&[u8]` from the source data. The type of each *block* is not captured
//! by the blocks index. Rather, block indices are referenced elsewhere and
//! the block type is inferred by the context of its reference. We never
//! sniff block content to guess its type.
//!
//! # Block Types
//!
//! * [BomBlockBomInfo]
//! * [BomBlockFile]
//! * [BomBlockPathInfoIndex]
//! * [BomBlockPathRecord]
//! * [BomBlockPaths]
//! * [BomBlockTree]
//! * [BomBlockVIndex]
//!
//! # Variables
//!
//! ## BomInfo
//!
//! Defines high-level information about the BOM. Its block data is [BomBlockBomInfo].
//!
//! ## Paths
//!
//! Defines the paths tracked by the BOM. Its block data is [BomBlockTree].
//!
//! ## HLIndex
//!
//! Hard link index. Its block data is [BomBlockTree].
//!
//! ## VIndex
//!
//! Its block data is [BomBlockVIndex], which points to a [BomBlockTree].
//!
//! ## Size64
//!
//! Sizes of paths too large for the 32-bit size field. Its block data is
//! [BomBlockTree].
//!
//! The leaves of the `HLIndex`, `VIndex`, and `Size64` trees are decoded
//! with the same layout as `Paths`. This is inferred from their shape and
//! has not been verified against many real packages.

use {
    crate::{
        cursor::ByteCursor,
        error::{Decoded, Error, SectionError},
        path::{BomPath, BomPathType},
        tree, Limits,
    },
    log::{debug, warn},
    scroll::{ctx::SizeWith as _, Pread, SizeWith},
    serde::{Serialize, Serializer},
    std::{
        borrow::Cow,
        collections::{HashMap, HashSet},
    },
};

/// Magic at the start of every BOM file.
pub const BOM_MAGIC: &[u8; 8] = b"BOMStore";

/// Magic at the start of every [BomBlockTree].
pub const TREE_MAGIC: &[u8; 4] = b"tree";

fn serialize_magic<S: Serializer, const N: usize>(
    value: &[u8; N],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(value))
}

/// The header for a BOM file.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, Pread, Serialize, SizeWith)]
pub struct BomHeader {
    /// Format magic. Always `BOMStore`
    #[serde(serialize_with = "serialize_magic")]
    pub magic: [u8; 8],

    /// File format version number.
    pub version: u32,

    /// Number of *blocks* in this BOM.
    pub number_of_blocks: u32,

    /// Start offset of blocks index relative to start of this header.
    pub blocks_index_offset: u32,

    /// Length of blocks index in bytes.
    pub blocks_index_length: u32,

    /// Start offset of variables index relative to start of this header.
    pub vars_index_offset: u32,

    /// Length of variables index in bytes.
    pub vars_index_length: u32,
}

fn check_range(
    section: &'static str,
    offset: u32,
    length: u32,
    available: usize,
) -> Result<(), Error> {
    if offset as u64 + length as u64 > available as u64 {
        Err(Error::HeaderRange {
            section,
            offset,
            length,
            available,
        })
    } else {
        Ok(())
    }
}

impl BomHeader {
    /// Parse and validate the header at the start of BOM data.
    ///
    /// Fails if the magic is wrong or if either index lies outside `data`.
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut cursor = ByteCursor::new(data);

        let magic = cursor.read_bytes(BOM_MAGIC.len())?;
        if magic != BOM_MAGIC {
            return Err(Error::InvalidMagic(magic.to_vec()));
        }

        cursor.seek(0)?;
        let header = cursor.read_record::<BomHeader>()?;

        check_range(
            "blocks index",
            header.blocks_index_offset,
            header.blocks_index_length,
            data.len(),
        )?;
        check_range(
            "variables index",
            header.vars_index_offset,
            header.vars_index_length,
            data.len(),
        )?;

        Ok(header)
    }

    /// Obtain the raw data holding the *blocks* index.
    pub fn blocks_index_data<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], Error> {
        ByteCursor::new(data)
            .sub_cursor(
                self.blocks_index_offset as usize,
                self.blocks_index_length as usize,
            )?
            .read_bytes(self.blocks_index_length as usize)
    }

    /// Parse the *blocks* index.
    pub fn blocks_index(&self, data: &[u8]) -> Result<Decoded<BomBlocksIndex>, Error> {
        BomBlocksIndex::parse(self.blocks_index_data(data)?, data.len())
    }

    /// Obtain the raw data holding the *vars* index.
    pub fn vars_index_data<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], Error> {
        ByteCursor::new(data)
            .sub_cursor(
                self.vars_index_offset as usize,
                self.vars_index_length as usize,
            )?
            .read_bytes(self.vars_index_length as usize)
    }

    /// Parse the *vars* index.
    pub fn vars_index(&self, data: &[u8]) -> Result<Decoded<BomVarsIndex>, Error> {
        BomVarsIndex::parse(self.vars_index_data(data)?)
    }
}

/// Defines *blocks* in the BOM file.
///
/// This is the data structure referred to by [BomHeader::blocks_index_offset] and
/// [BomHeader::blocks_index_length].
///
/// The 1st block appears to always be NULL (0 values in its entry).
///
/// The blocks count in this data structure and [BomHeader::number_of_blocks] may
/// disagree. The number of blocks in the file header appears to be the number of
/// populated blocks, not counting the initial NULL/empty/0 block. And the block
/// count in this data structure can be substantially larger than what is reported
/// by the file header.
#[derive(Clone, Default, Debug, Serialize)]
pub struct BomBlocksIndex {
    /// The number of entries in this index.
    pub count: u32,

    /// The records defining individual blocks.
    pub blocks: Vec<BomBlocksEntry>,
}

impl BomBlocksIndex {
    /// Parse the blocks index from its raw data.
    ///
    /// `file_length` is the length of the entire BOM. Entries pointing outside
    /// of it are replaced by an empty entry and reported as errors.
    pub fn parse(data: &[u8], file_length: usize) -> Result<Decoded<Self>, Error> {
        let mut cursor = ByteCursor::new(data);

        let count = cursor.read_u32()?;
        let entry_size = BomBlocksEntry::size_with(&scroll::BE);
        let mut blocks = Vec::with_capacity(cursor.capacity_hint(count, entry_size));
        let mut errors = vec![];

        for index in 0..count {
            let entry = cursor.read_record::<BomBlocksEntry>()?;

            if entry.end() > file_length as u64 {
                errors.push(Error::BlockRange {
                    index,
                    offset: entry.file_offset,
                    length: entry.length,
                    available: file_length,
                });
                blocks.push(BomBlocksEntry::default());
            } else {
                blocks.push(entry);
            }
        }

        Ok(Decoded::new(Self { count, blocks }, errors))
    }
}

/// Defines the location of a *block*.
///
/// This type is part of [BomBlocksIndex].
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Pread, Serialize, SizeWith)]
pub struct BomBlocksEntry {
    /// Start offset of block data relative to start of file / [BomHeader].
    pub file_offset: u32,

    /// Length in bytes of block data.
    pub length: u32,
}

impl BomBlocksEntry {
    /// Whether this entry holds no data.
    ///
    /// Empty entries denote absent blocks and are never dereferenced.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn end(&self) -> u64 {
        self.file_offset as u64 + self.length as u64
    }
}

/// Describes an individual BOM variable.
///
/// A variable consists of a string name and pointer to the block index
/// holding its variable-specific data.
#[derive(Clone, Debug, Serialize)]
pub struct BomVar {
    /// Index of block holding data for this variable.
    pub block_index: u32,

    /// Length of name. Does not include NULL terminator.
    pub name_length: u8,

    /// Name of variable.
    pub name: String,
}

impl BomVar {
    fn read(cursor: &mut ByteCursor) -> Result<Self, Error> {
        let block_index = cursor.read_u32()?;
        let name_length = cursor.read_u8()?;
        let name = String::from_utf8_lossy(cursor.read_bytes(name_length as usize)?).to_string();

        Ok(Self {
            block_index,
            name_length,
            name,
        })
    }
}

/// The collection of variables in a BOM file.
///
/// This structure is what [BomHeader::vars_index_offset] and
/// [BomHeader::vars_index_length] refers to.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BomVarsIndex {
    /// Number of variables.
    pub count: u32,

    /// Records for each variable, in file order.
    pub vars: Vec<BomVar>,
}

impl BomVarsIndex {
    /// Parse the variables index from its raw data.
    ///
    /// Only failing to read the count is fatal. A truncated entry ends
    /// parsing, as later entries can't be located without it.
    pub fn parse(data: &[u8]) -> Result<Decoded<Self>, Error> {
        let mut cursor = ByteCursor::new(data);

        let count = cursor.read_u32()?;
        // Smallest possible entry is a block index and an empty name.
        let mut vars: Vec<BomVar> = Vec::with_capacity(cursor.capacity_hint(count, 5));
        let mut errors = vec![];
        let mut seen = HashSet::new();

        for index in 0..count {
            match BomVar::read(&mut cursor) {
                Ok(var) => {
                    if !seen.insert(var.name.clone()) {
                        errors.push(Error::DuplicateVariable(var.name.clone()));
                    }
                    vars.push(var);
                }
                Err(err) => {
                    errors.push(Error::MalformedVariable {
                        index,
                        detail: err.to_string(),
                    });
                    break;
                }
            }
        }

        Ok(Decoded::new(Self { count, vars }, errors))
    }

    /// Find a variable by name.
    ///
    /// When a name is defined multiple times, the last definition wins.
    pub fn get(&self, name: &str) -> Option<&BomVar> {
        self.vars.iter().rev().find(|v| v.name == name)
    }

    /// Obtain a mapping of variable name to block index.
    pub fn to_map(&self) -> HashMap<String, u32> {
        self.vars
            .iter()
            .map(|v| (v.name.clone(), v.block_index))
            .collect()
    }
}

/// Block type for `BomInfo` variable.
///
/// Describes high-level information about the BOM, notably the version and
/// number of paths.
#[derive(Clone, Default, Debug, Serialize)]
pub struct BomBlockBomInfo {
    /// BOM version.
    pub version: u32,

    /// Total number of paths tracked by this BOM.
    pub number_of_paths: u32,

    /// Number of [BomInfoEntry] records in this data structure.
    pub number_of_info_entries: u32,

    /// Further describes attributes of the BOM.
    pub entries: Vec<BomInfoEntry>,
}

impl BomBlockBomInfo {
    /// Parse from block data.
    ///
    /// Failure to read the fixed fields is an error. Truncated entries are
    /// reported alongside the entries that could be read.
    pub fn parse(data: &[u8]) -> Result<Decoded<Self>, Error> {
        let mut cursor = ByteCursor::new(data);

        let version = cursor.read_u32()?;
        let number_of_paths = cursor.read_u32()?;
        let number_of_info_entries = cursor.read_u32()?;

        let entry_size = BomInfoEntry::size_with(&scroll::BE);
        let mut entries =
            Vec::with_capacity(cursor.capacity_hint(number_of_info_entries, entry_size));
        let mut errors = vec![];

        for _ in 0..number_of_info_entries {
            match cursor.read_record::<BomInfoEntry>() {
                Ok(entry) => entries.push(entry),
                Err(_) => {
                    errors.push(Error::BomInfoTruncated {
                        declared: number_of_info_entries,
                        read: entries.len() as u32,
                    });
                    break;
                }
            }
        }

        Ok(Decoded::new(
            Self {
                version,
                number_of_paths,
                number_of_info_entries,
                entries,
            },
            errors,
        ))
    }
}

/// Holds data records stored within [BomBlockBomInfo].
///
/// Only the first two fields are believed to carry meaning.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, Pread, Serialize, SizeWith)]
pub struct BomInfoEntry {
    /// Appears to be a CPU type for the files it describes.
    pub entry_type: u32,

    /// Appears to be a count of paths for [Self::entry_type].
    pub entry_count: u32,

    /// Unknown.
    pub c: u32,

    /// Unknown.
    pub d: u32,
}

/// Block describing a named file.
#[derive(Clone, Debug, Serialize)]
pub struct BomBlockFile {
    /// Internal path ID of parent path.
    ///
    /// `0` means no parent (this file exists at the root).
    pub parent_path_id: u32,

    /// The name of this file.
    ///
    /// Only the leaf file or directory name. i.e. the final component in a
    /// path.
    pub name: String,
}

impl BomBlockFile {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut cursor = ByteCursor::new(data);

        let parent_path_id = cursor.read_u32()?;
        let name = String::from_utf8_lossy(cursor.read_cstring()?).to_string();

        Ok(Self {
            parent_path_id,
            name,
        })
    }
}

/// Block type describing a node in a tree of paths.
///
/// Internally this stores a collection [BomPathsEntry]. In leaf nodes these
/// point to [BomBlockPathInfoIndex] and [BomBlockFile] blocks further
/// describing each path. In other nodes the first field of each entry points
/// to a child [BomBlockPaths].
///
/// Each logical path appears to have an internal numeric identifier uniquely
/// describing the path. This *path ID* is used for paths to refer to each
/// other. For example, [BomBlockFile] refers to its parent directory/path
/// via this ID.
#[derive(Clone, Default, Debug, Serialize)]
pub struct BomBlockPaths {
    /// Whether this is a leaf node of the tree.
    pub is_leaf: u16,

    /// The number of entries in this node.
    pub count: u16,

    /// Block index of [BomBlockPaths] that is after this one. 0 if none.
    pub next_paths_block_index: u32,

    /// Block index of [BomBlockPaths] that is before this one. 0 if none.
    pub previous_paths_block_index: u32,

    /// The entries of this node, in on-disk order.
    pub paths: Vec<BomPathsEntry>,
}

impl BomBlockPaths {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut cursor = ByteCursor::new(data);

        let is_leaf = cursor.read_u16()?;
        let count = cursor.read_u16()?;
        let forward = cursor.read_u32()?;
        let backward = cursor.read_u32()?;

        let entry_size = BomPathsEntry::size_with(&scroll::BE);
        if cursor.remaining() < count as usize * entry_size {
            return Err(Error::OutOfBounds {
                offset: cursor.position(),
                length: count as usize * entry_size,
                available: cursor.len(),
            });
        }

        let mut paths = Vec::with_capacity(count as usize);
        for _ in 0..count {
            paths.push(cursor.read_record::<BomPathsEntry>()?);
        }

        Ok(Self {
            is_leaf,
            count,
            next_paths_block_index: forward,
            previous_paths_block_index: backward,
            paths,
        })
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf != 0
    }
}

/// A pair of block indices within a [BomBlockPaths].
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Pread, Serialize, SizeWith)]
pub struct BomPathsEntry {
    /// Block index of the value.
    ///
    /// In leaf nodes this is a [BomBlockPathInfoIndex]. Otherwise it is a
    /// child [BomBlockPaths].
    pub value_block_index: u32,

    /// Block index of the key, a [BomBlockFile].
    pub key_block_index: u32,
}

/// Block type describing a single path.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, Pread, Serialize, SizeWith)]
pub struct BomBlockPathInfoIndex {
    /// Unique identifier for this path.
    ///
    /// This is not a block index.
    pub path_id: u32,

    /// Block index of [BomBlockPathRecord] holding metadata for this path.
    pub path_record_index: u32,
}

/// Block type defining low-level path information.
///
/// This is where most of the metadata defining a BOM path lives.
#[derive(Clone, Default, Debug, Serialize)]
pub struct BomBlockPathRecord {
    /// The type of the path.
    ///
    /// See [crate::BomPathType] for definitions.
    pub path_type: u8,

    /// Unknown.
    pub a: u8,

    /// File architecture.
    ///
    /// Probably corresponds to value in Mach-O header.
    pub architecture: u16,

    /// File mode.
    pub mode: u16,

    /// UID of owner.
    pub user: u32,

    /// GID of owner.
    pub group: u32,

    /// Modified time in seconds since UNIX epoch.
    pub mtime: u32,

    /// Size in bytes.
    pub size: u32,

    /// Unknown.
    pub b: u8,

    /// CRC32 checksum or device type.
    pub checksum_or_type: u32,

    /// Length of link name.
    ///
    /// May be non-0 for non-link path records.
    ///
    /// Includes NULL terminator.
    pub link_name_length: u32,

    /// Link path name.
    pub link_name: Option<String>,
}

impl BomBlockPathRecord {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut cursor = ByteCursor::new(data);

        let path_type = cursor.read_u8()?;
        let a = cursor.read_u8()?;
        let architecture = cursor.read_u16()?;
        let mode = cursor.read_u16()?;
        let user = cursor.read_u32()?;
        let group = cursor.read_u32()?;
        let mtime = cursor.read_u32()?;
        let size = cursor.read_u32()?;
        let b = cursor.read_u8()?;
        let checksum_or_type = cursor.read_u32()?;
        let link_name_length = cursor.read_u32()?;

        let link_name = if BomPathType::from(path_type) == BomPathType::Symlink
            && link_name_length > 0
        {
            let raw = cursor.read_bytes(link_name_length as usize)?;
            let raw = raw.split(|b| *b == 0).next().unwrap_or(raw);

            Some(String::from_utf8_lossy(raw).to_string())
        } else {
            None
        };

        Ok(Self {
            path_type,
            a,
            architecture,
            mode,
            user,
            group,
            mtime,
            size,
            b,
            checksum_or_type,
            link_name_length,
            link_name,
        })
    }
}

/// Block type for various variables describing a collection/tree of paths.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, Pread, Serialize, SizeWith)]
pub struct BomBlockTree {
    /// Always `tree`.
    #[serde(serialize_with = "serialize_magic")]
    pub tree: [u8; 4],

    /// Version of this data structure. Always appears to be 1.
    pub version: u32,

    /// Block index of the root [BomBlockPaths] of the tree.
    pub block_paths_index: u32,

    /// Block size. Always appears to be 4096.
    pub block_size: u32,

    /// Number of paths tracked by this tree.
    pub path_count: u32,

    /// Unknown.
    pub a: u8,
}

impl BomBlockTree {
    pub fn parse(data: &[u8], block: u32) -> Result<Self, Error> {
        let tree = ByteCursor::new(data).read_record::<BomBlockTree>()?;

        if &tree.tree != TREE_MAGIC {
            return Err(Error::MalformedTree {
                block,
                detail: format!("bad magic {}", hex::encode(tree.tree)),
            });
        }
        if tree.version != 1 {
            warn!("tree in block {} has unexpected version {}", block, tree.version);
        }

        Ok(tree)
    }

    /// Resolve the [BomPath] in this tree.
    pub fn bom_paths(&self, bom: &ParsedBom) -> Decoded<Vec<BomPath>> {
        crate::path::decode_path_tree(bom, self.block_paths_index, &bom.limits)
    }
}

/// Block type for the `VIndex` variable data.
///
/// We don't know much about this data structure.
#[repr(C)]
#[derive(Clone, Copy, Default, Debug, Pread, Serialize, SizeWith)]
pub struct BomBlockVIndex {
    /// Unknown.
    pub a: u32,

    /// Block index holding a [BomBlockTree].
    pub tree_block_index: u32,

    /// Unknown.
    pub b: u32,

    /// Unknown.
    pub c: u8,
}

impl BomBlockVIndex {
    /// Resolve the [BomBlockTree] this instance points to.
    pub fn tree(&self, bom: &ParsedBom) -> Result<BomBlockTree, Error> {
        bom.block_as_tree(self.tree_block_index)
    }
}

/// Parsed BOM data structure.
///
/// Instances hold references to the data they are backed by. Only the header
/// and the block and variable indices are parsed up front. Everything else is
/// decoded on demand through the `block_as_*` methods.
#[derive(Debug)]
pub struct ParsedBom<'a> {
    /// Underlying data backing this BOM.
    pub data: Cow<'a, [u8]>,

    /// The file header.
    pub header: BomHeader,

    /// The blocks index.
    pub blocks: BomBlocksIndex,

    /// BOM variables.
    pub vars: BomVarsIndex,

    /// Non-fatal problems found in the blocks and variables indices.
    pub errors: Vec<SectionError>,

    /// Bounds applied when walking trees and path chains.
    pub limits: Limits,
}

impl<'a> ParsedBom<'a> {
    /// Parse BOM data into a data structure.
    ///
    /// Fails if the header or either index can't be read. Individual bad
    /// blocks or variables are recorded in [Self::errors].
    pub fn parse(data: &'a [u8]) -> Result<Self, Error> {
        let header = BomHeader::parse(data)?;
        debug!(
            "BOM version {} with {} blocks",
            header.version, header.number_of_blocks
        );

        let blocks = header.blocks_index(data)?;
        let vars = header.vars_index(data)?;

        let errors = blocks
            .errors
            .iter()
            .map(|e| SectionError::new("blocks_index", e))
            .chain(vars.errors.iter().map(|e| SectionError::new("variables", e)))
            .collect::<Vec<_>>();

        for err in &errors {
            warn!("{}: {}", err.section, err.detail);
        }

        Ok(Self {
            data: Cow::Borrowed(data),
            header,
            blocks: blocks.value,
            vars: vars.value,
            errors,
            limits: Limits::default(),
        })
    }

    /// Replace the limits used when walking trees and path chains.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Attempt to locate a named variable.
    pub fn find_variable(&self, name: &str) -> Result<&BomVar, Error> {
        self.vars
            .get(name)
            .ok_or_else(|| Error::NoVar(name.to_string()))
    }

    /// Attempt to resolve the [BomBlockBomInfo] for this instance.
    pub fn bom_info(&self) -> Result<Decoded<BomBlockBomInfo>, Error> {
        let var = self.find_variable("BomInfo")?;

        self.block_as_bom_info(var.block_index)
    }

    fn tree_variable(&self, name: &str) -> Result<Decoded<Vec<BomPath>>, Error> {
        let var = self.find_variable(name)?;
        let tree = self.block_as_tree(var.block_index)?;

        Ok(tree.bom_paths(self))
    }

    /// Resolve the hard link index tree.
    pub fn hl_index(&self) -> Result<Decoded<Vec<BomPath>>, Error> {
        self.tree_variable("HLIndex")
    }

    /// Resolve all paths in this BOM.
    pub fn paths(&self) -> Result<Decoded<Vec<BomPath>>, Error> {
        self.tree_variable("Paths")
    }

    /// Resolve the Size64 tree.
    pub fn size64(&self) -> Result<Decoded<Vec<BomPath>>, Error> {
        self.tree_variable("Size64")
    }

    /// Resolve the V Index.
    pub fn vindex(&self) -> Result<Decoded<Vec<BomPath>>, Error> {
        let var = self.find_variable("VIndex")?;
        let index = self.block_as_vindex(var.block_index)?;
        let tree = index.tree(self)?;

        Ok(tree.bom_paths(self))
    }

    /// Resolve the entry in the blocks index for a block.
    pub fn block_entry(&self, index: u32) -> Result<&BomBlocksEntry, Error> {
        self.blocks
            .blocks
            .get(index as usize)
            .ok_or(Error::BadIndex(index))
    }

    /// Resolve the raw data backing a block given a block index.
    ///
    /// Empty blocks are absent and can't be resolved.
    pub fn block_data(&self, index: u32) -> Result<&[u8], Error> {
        let entry = self.block_entry(index)?;

        if entry.is_empty() {
            return Err(Error::EmptyBlock(index));
        }

        let start = entry.file_offset as usize;
        let end = start + entry.length as usize;

        self.data.get(start..end).ok_or(Error::BlockRange {
            index,
            offset: entry.file_offset,
            length: entry.length,
            available: self.data.len(),
        })
    }

    /// Attempt to resolve a block at an index as a [BomBlockBomInfo].
    pub fn block_as_bom_info(&self, index: u32) -> Result<Decoded<BomBlockBomInfo>, Error> {
        debug!("block {} -> BomInfo", index);
        BomBlockBomInfo::parse(self.block_data(index)?)
    }

    /// Attempt to resolve a block at an index as a [BomBlockFile].
    pub fn block_as_file(&self, index: u32) -> Result<BomBlockFile, Error> {
        BomBlockFile::parse(self.block_data(index)?)
    }

    /// Attempt to resolve a block at an index as a [BomBlockPathInfoIndex].
    pub fn block_as_path_info_index(&self, index: u32) -> Result<BomBlockPathInfoIndex, Error> {
        ByteCursor::new(self.block_data(index)?).read_record()
    }

    /// Attempt to resolve a block at an index as a [BomBlockPathRecord].
    pub fn block_as_path_record(&self, index: u32) -> Result<BomBlockPathRecord, Error> {
        BomBlockPathRecord::parse(self.block_data(index)?)
    }

    /// Attempt to resolve a block at an index as a [BomBlockPaths].
    pub fn block_as_paths(&self, index: u32) -> Result<BomBlockPaths, Error> {
        BomBlockPaths::parse(self.block_data(index)?)
    }

    /// Attempt to resolve a block at an index as a [BomBlockTree].
    pub fn block_as_tree(&self, index: u32) -> Result<BomBlockTree, Error> {
        debug!("block {} -> tree", index);
        BomBlockTree::parse(self.block_data(index)?, index)
    }

    /// Attempt to resolve a block at an index as a [BomBlockVIndex].
    pub fn block_as_vindex(&self, index: u32) -> Result<BomBlockVIndex, Error> {
        debug!("block {} -> VIndex", index);
        ByteCursor::new(self.block_data(index)?).read_record()
    }

    /// Walk the tree rooted at a [BomBlockPaths] block.
    pub fn walk_tree(&self, root: u32) -> tree::TreeWalk {
        tree::walk_tree(self, root, &self.limits)
    }
}
