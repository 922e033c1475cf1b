// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Inspect Apple BOM files.
//!
//! Apple Bill of Materials (BOM) files are a file format / data structure
//! for indexing file content with additional metadata. They are commonly
//! found in flat packages (e.g. `.pkg` files) and in installer receipts.
//!
//! This crate provides best-effort, read-only decoding of BOM files into a
//! structured [BomDocument]. Decoding is tolerant of damage: only a bad
//! header or unreadable indices are fatal. Everything else that goes wrong
//! is recorded in [BomDocument::parse_errors] and decoding carries on with
//! what can be recovered.
//!
//! The simplest entry points are [parse] and [parse_file]. Lower-level access
//! to blocks and variables is available through [ParsedBom].

pub mod block;
pub mod cursor;
pub mod document;
pub mod error;
pub mod format;
pub mod path;
pub mod tree;

#[cfg(test)]
mod testutil;

pub use {
    document::{parse, parse_file, BomDocument, ParseOptions},
    error::{Decoded, Error, SectionError},
    format::ParsedBom,
    path::{BomPath, BomPathType},
};

/// Bounds applied when following references in untrusted data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Limits {
    /// Maximum depth of tree nodes below the root.
    pub tree_depth: usize,

    /// Maximum number of components in a resolved path.
    pub path_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            tree_depth: 4096,
            path_depth: 4096,
        }
    }
}
