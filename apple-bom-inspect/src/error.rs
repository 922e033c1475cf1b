// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use {serde::Serialize, std::path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("(de)serialization error: {0}")]
    Scroll(#[from] scroll::Error),

    #[error("read of {length} bytes at offset {offset} exceeds data length {available}")]
    OutOfBounds {
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("invalid BOM magic: {}", hex::encode(.0))]
    InvalidMagic(Vec<u8>),

    #[error("{section} range {offset}+{length} exceeds file length {available}")]
    HeaderRange {
        section: &'static str,
        offset: u32,
        length: u32,
        available: usize,
    },

    #[error("block {index} range {offset}+{length} exceeds file length {available}")]
    BlockRange {
        index: u32,
        offset: u32,
        length: u32,
        available: usize,
    },

    #[error("bad index into BOM data: block {0}")]
    BadIndex(u32),

    #[error("block {0} is empty")]
    EmptyBlock(u32),

    #[error("variable #{index} is malformed: {detail}")]
    MalformedVariable { index: u32, detail: String },

    #[error("variable {0} defined more than once; using the last definition")]
    DuplicateVariable(String),

    #[error("data type {0} not found")]
    NoVar(String),

    #[error("malformed tree in block {block}: {detail}")]
    MalformedTree { block: u32, detail: String },

    #[error("malformed tree node in block {block}: {detail}")]
    MalformedTreeNode { block: u32, detail: String },

    #[error("tree node block {block} referenced more than once")]
    CyclicTreeReference { block: u32 },

    #[error("tree node block {block} exceeds maximum depth {limit}")]
    TreeTooDeep { block: u32, limit: usize },

    #[error("metadata record in block {block} truncated: {detail}")]
    TruncatedMetadataRecord { block: u32, detail: String },

    #[error("unable to resolve name for path id {path_id}: {reason}")]
    UnresolvableNameEntry { path_id: u32, reason: String },

    #[error("BomInfo declares {declared} entries but only {read} could be read")]
    BomInfoTruncated { declared: u32, read: u32 },

    #[error("invalid time value")]
    BadTime,

    #[error("failed reading {}: {source}", .path.display())]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad arguments: {0}")]
    CliBadArgs(String),
}

impl Error {
    /// Stable name for the class of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scroll(_) => "DecodeError",
            Self::OutOfBounds { .. } => "OutOfBounds",
            Self::InvalidMagic(_) => "InvalidMagic",
            Self::HeaderRange { .. } => "HeaderRangeError",
            Self::BlockRange { .. } => "BlockRangeError",
            Self::BadIndex(_) => "BadIndex",
            Self::EmptyBlock(_) => "EmptyBlock",
            Self::MalformedVariable { .. } => "MalformedVariable",
            Self::DuplicateVariable(_) => "DuplicateVariable",
            Self::NoVar(_) => "MissingVariable",
            Self::MalformedTree { .. } => "MalformedTree",
            Self::MalformedTreeNode { .. } => "MalformedTreeNode",
            Self::CyclicTreeReference { .. } => "CyclicTreeReference",
            Self::TreeTooDeep { .. } => "TreeTooDeep",
            Self::TruncatedMetadataRecord { .. } => "TruncatedMetadataRecord",
            Self::UnresolvableNameEntry { .. } => "UnresolvableNameEntry",
            Self::BomInfoTruncated { .. } => "BomInfoTruncated",
            Self::BadTime => "BadTime",
            Self::ReadFile { .. } => "ReadFile",
            Self::Io(_) => "Io",
            Self::Json(_) => "Json",
            Self::CliBadArgs(_) => "CliBadArgs",
        }
    }
}

/// A non-fatal problem encountered while decoding one section of a BOM.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SectionError {
    /// Section of the document the error belongs to (e.g. `paths`).
    pub section: String,

    /// Class of the error. See [Error::kind].
    pub kind: &'static str,

    /// Human readable description.
    pub detail: String,
}

impl SectionError {
    pub fn new(section: impl ToString, err: &Error) -> Self {
        Self {
            section: section.to_string(),
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// The outcome of decoding a section that tolerates partial failure.
///
/// `value` holds everything that could be recovered. `errors` describes what
/// could not.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    pub errors: Vec<Error>,
}

impl<T> Decoded<T> {
    pub fn new(value: T, errors: Vec<Error>) -> Self {
        Self { value, errors }
    }
}
