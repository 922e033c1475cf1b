// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resolved paths.

use {
    crate::{
        error::{Decoded, Error},
        format::{BomBlockFile, BomBlockPathRecord, ParsedBom},
        Limits,
    },
    chrono::{DateTime, SecondsFormat, TimeZone, Utc},
    log::trace,
    serde::{Serialize, Serializer},
    simple_file_manifest::{
        S_IFDIR, S_IRGRP, S_IROTH, S_IRUSR, S_IWGRP, S_IWOTH, S_IWUSR, S_IXGRP, S_IXOTH, S_IXUSR,
    },
    std::collections::{HashMap, HashSet},
};

const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;
const S_ISUID: u32 = 0o4000;
const S_ISGID: u32 = 0o2000;
const S_ISVTX: u32 = 0o1000;

/// The type of path in a BOM.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BomPathType {
    /// A regular file.
    File,

    /// A directory.
    Directory,

    /// A symlink.
    Symlink,

    /// A device.
    Device,

    /// A named pipe.
    Fifo,

    /// A socket.
    Socket,

    /// Some other type we don't know about.
    Unknown(u8),
}

impl From<u8> for BomPathType {
    fn from(v: u8) -> Self {
        match v {
            1 => Self::File,
            2 => Self::Directory,
            3 => Self::Symlink,
            4 => Self::Device,
            _ => Self::Unknown(v),
        }
    }
}

impl From<BomPathType> for u8 {
    fn from(t: BomPathType) -> Self {
        match t {
            BomPathType::File => 1,
            BomPathType::Directory => 2,
            BomPathType::Symlink => 3,
            BomPathType::Device => 4,
            BomPathType::Fifo | BomPathType::Socket => 0,
            BomPathType::Unknown(v) => v,
        }
    }
}

impl BomPathType {
    /// Resolve the type from a record's type code and mode.
    ///
    /// Type codes not known to us fall back to the file type bits of the mode.
    pub fn from_record(code: u8, mode: u16) -> Self {
        match Self::from(code) {
            Self::Unknown(v) => match mode as u32 & S_IFMT {
                S_IFIFO => Self::Fifo,
                S_IFSOCK => Self::Socket,
                _ => Self::Unknown(v),
            },
            t => t,
        }
    }

    /// Name of this type as used in serialized output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Device => "device",
            Self::Fifo => "fifo",
            Self::Socket => "socket",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl Serialize for BomPathType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

fn permission(mode: u32, bit: u32, c: char) -> char {
    if mode & bit != 0 {
        c
    } else {
        '-'
    }
}

fn execute(mode: u32, bit: u32, special_bit: u32, special: char) -> char {
    match (mode & bit != 0, mode & special_bit != 0) {
        (true, true) => special,
        (false, true) => special.to_ascii_uppercase(),
        (true, false) => 'x',
        (false, false) => '-',
    }
}

/// Render a file mode as a string like `drwxr-xr-x`.
///
/// The type character comes from the file type bits of the mode. If those
/// are absent, `path_type` is used instead.
pub fn symbolic_mode(mode: u16, path_type: BomPathType) -> String {
    let mode = mode as u32;
    let mut s = String::with_capacity(10);

    s.push(match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFREG => '-',
        S_IFLNK => 'l',
        S_IFCHR => 'c',
        S_IFBLK => 'b',
        S_IFIFO => 'p',
        S_IFSOCK => 's',
        _ => match path_type {
            BomPathType::Directory => 'd',
            BomPathType::File => '-',
            BomPathType::Symlink => 'l',
            BomPathType::Fifo => 'p',
            BomPathType::Socket => 's',
            BomPathType::Device | BomPathType::Unknown(_) => '?',
        },
    });

    s.push(permission(mode, S_IRUSR, 'r'));
    s.push(permission(mode, S_IWUSR, 'w'));
    s.push(execute(mode, S_IXUSR, S_ISUID, 's'));
    s.push(permission(mode, S_IRGRP, 'r'));
    s.push(permission(mode, S_IWGRP, 'w'));
    s.push(execute(mode, S_IXGRP, S_ISGID, 's'));
    s.push(permission(mode, S_IROTH, 'r'));
    s.push(permission(mode, S_IWOTH, 'w'));
    s.push(execute(mode, S_IXOTH, S_ISVTX, 't'));

    s
}

/// Render seconds since the UNIX epoch as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn mtime_iso8601(mtime: u32) -> Result<String, Error> {
    Ok(modified_time(mtime)?.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn modified_time(mtime: u32) -> Result<DateTime<Utc>, Error> {
    Utc.timestamp_opt(mtime as _, 0)
        .single()
        .ok_or(Error::BadTime)
}

/// Represents a full path in a BOM.
///
/// This is a higher-level data structure with a Rust friendly API. It has
/// fields for all the data constituting a path in a BOM.
#[derive(Clone, Debug, Serialize)]
pub struct BomPath {
    /// The full path.
    path: String,

    /// The type of path.
    path_type: BomPathType,
    path_type_raw: u8,

    file_mode: u16,
    symbolic_mode: String,
    user_id: u32,
    group_id: u32,
    mtime: u32,
    mtime_iso8601: String,
    size: u64,
    crc32: Option<u32>,
    device_type: Option<u32>,
    architecture: u16,
    link_name: String,

    /// Whether the metadata record for this path could not be fully read.
    truncated: bool,
}

impl BomPath {
    /// Construct an instance from a low-level BOM record.
    pub fn from_record(path: String, record: &BomBlockPathRecord) -> Result<Self, Error> {
        let path_type = BomPathType::from_record(record.path_type, record.mode);

        let crc32 = match path_type {
            BomPathType::File => Some(record.checksum_or_type),
            _ => None,
        };
        let device_type = match path_type {
            BomPathType::Device => Some(record.checksum_or_type),
            _ => None,
        };
        let link_name = match path_type {
            BomPathType::Symlink => record.link_name.clone().unwrap_or_default(),
            _ => String::new(),
        };

        Ok(Self {
            path,
            path_type,
            path_type_raw: record.path_type,
            file_mode: record.mode,
            symbolic_mode: symbolic_mode(record.mode, path_type),
            user_id: record.user,
            group_id: record.group,
            mtime: record.mtime,
            mtime_iso8601: mtime_iso8601(record.mtime)?,
            size: record.size as u64,
            crc32,
            device_type,
            architecture: record.architecture,
            link_name,
            truncated: false,
        })
    }

    /// Construct an instance for a path whose metadata could not be read.
    ///
    /// Only the path and type are meaningful.
    pub fn truncated(path: String, path_type_raw: u8) -> Self {
        let path_type = BomPathType::from(path_type_raw);

        Self {
            path,
            path_type,
            path_type_raw,
            file_mode: 0,
            symbolic_mode: symbolic_mode(0, path_type),
            user_id: 0,
            group_id: 0,
            mtime: 0,
            mtime_iso8601: "1970-01-01T00:00:00Z".to_string(),
            size: 0,
            crc32: None,
            device_type: None,
            architecture: 0,
            link_name: String::new(),
            truncated: true,
        }
    }

    /// The type of this path.
    pub fn path_type(&self) -> BomPathType {
        self.path_type
    }

    /// The raw type code of this path.
    pub fn path_type_raw(&self) -> u8 {
        self.path_type_raw
    }

    /// The full path of this instance.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File mode bitfield.
    pub fn file_mode(&self) -> u16 {
        self.file_mode
    }

    /// Obtain the symbolic file mode for this path.
    ///
    /// e.g. a string like `drwxr-xr-x`.
    pub fn symbolic_mode(&self) -> &str {
        &self.symbolic_mode
    }

    /// Numeric user identifier (UID) that owns this path.
    pub fn user_id(&self) -> u32 {
        self.user_id
    }

    /// Numeric group identifier (GID) that owns this path.
    pub fn group_id(&self) -> u32 {
        self.group_id
    }

    /// Modified time in seconds since the UNIX epoch.
    pub fn mtime(&self) -> u32 {
        self.mtime
    }

    /// Modified time of this path.
    pub fn modified_time(&self) -> Result<DateTime<Utc>, Error> {
        modified_time(self.mtime)
    }

    /// Modified time rendered as UTC ISO-8601.
    pub fn mtime_iso8601(&self) -> &str {
        &self.mtime_iso8601
    }

    /// Size of path in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// CRC32 of this path.
    ///
    /// Only set for regular files.
    pub fn crc32(&self) -> Option<u32> {
        self.crc32
    }

    /// Device type. Only set for devices.
    pub fn device_type(&self) -> Option<u32> {
        self.device_type
    }

    /// File architecture.
    pub fn architecture(&self) -> u16 {
        self.architecture
    }

    /// The path that this link refers to.
    ///
    /// Empty for anything that isn't a symlink. Also empty for a symlink whose
    /// record carries no target. Such records are still returned and a
    /// [Error::TruncatedMetadataRecord] is reported for them, so a non-empty
    /// value only holds for well-formed symlinks.
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Whether the metadata for this path could not be fully read.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

fn resolve_full_path(
    file: &BomBlockFile,
    files_by_id: &HashMap<u32, BomBlockFile>,
    max_depth: usize,
) -> Result<String, Error> {
    let mut components = vec![file.name.as_str()];
    let mut parent = file.parent_path_id;
    let mut seen = HashSet::new();

    while parent != 0 {
        if components.len() >= max_depth {
            return Err(Error::UnresolvableNameEntry {
                path_id: parent,
                reason: format!("parent chain exceeds {max_depth} entries"),
            });
        }
        if !seen.insert(parent) {
            return Err(Error::UnresolvableNameEntry {
                path_id: parent,
                reason: "cycle in parent chain".to_string(),
            });
        }

        let entry = files_by_id
            .get(&parent)
            .ok_or_else(|| Error::UnresolvableNameEntry {
                path_id: parent,
                reason: "parent not found".to_string(),
            })?;

        components.push(entry.name.as_str());
        parent = entry.parent_path_id;
    }

    components.reverse();

    Ok(components.join("/"))
}

/// Resolve every leaf of a paths tree into a [BomPath].
///
/// `root` is the block index of the root [crate::format::BomBlockPaths].
/// Paths are emitted in tree order. Records that can't be resolved are
/// reported as errors and either skipped (no usable name) or emitted
/// truncated (no usable metadata).
pub fn decode_path_tree(bom: &ParsedBom, root: u32, limits: &Limits) -> Decoded<Vec<BomPath>> {
    let walk = crate::tree::walk_tree(bom, root, limits);
    let mut errors = walk.errors;

    let leaves = walk
        .entries
        .iter()
        .map(|entry| {
            (
                bom.block_as_file(entry.key_block_index),
                bom.block_as_path_info_index(entry.value_block_index),
            )
        })
        .collect::<Vec<_>>();

    let files_by_id = leaves
        .iter()
        .filter_map(|(file, info)| match (file, info) {
            (Ok(file), Ok(info)) => Some((info.path_id, file.clone())),
            _ => None,
        })
        .collect::<HashMap<_, _>>();

    let mut paths = Vec::with_capacity(leaves.len());

    for (entry, (file, info)) in walk.entries.iter().zip(leaves) {
        let file = match file {
            Ok(file) => file,
            Err(err) => {
                errors.push(Error::UnresolvableNameEntry {
                    path_id: 0,
                    reason: format!("file block {}: {}", entry.key_block_index, err),
                });
                continue;
            }
        };

        let path = match resolve_full_path(&file, &files_by_id, limits.path_depth) {
            Ok(path) => path,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        trace!("resolved {}", path);

        let info = match info {
            Ok(info) => info,
            Err(err) => {
                errors.push(Error::TruncatedMetadataRecord {
                    block: entry.value_block_index,
                    detail: err.to_string(),
                });
                paths.push(BomPath::truncated(path, 0));
                continue;
            }
        };

        let record_block = info.path_record_index;

        let record = bom
            .block_as_path_record(record_block)
            .and_then(|record| BomPath::from_record(path.clone(), &record));

        match record {
            Ok(record) => {
                if record.path_type() == BomPathType::Symlink && record.link_name().is_empty() {
                    errors.push(Error::TruncatedMetadataRecord {
                        block: record_block,
                        detail: format!("symlink {} has no link target", record.path()),
                    });
                }
                paths.push(record);
            }
            Err(err) => {
                errors.push(Error::TruncatedMetadataRecord {
                    block: record_block,
                    detail: err.to_string(),
                });

                let path_type = bom
                    .block_data(record_block)
                    .ok()
                    .and_then(|data| data.first().copied())
                    .unwrap_or(0);

                paths.push(BomPath::truncated(path, path_type));
            }
        }
    }

    Decoded::new(paths, errors)
}
