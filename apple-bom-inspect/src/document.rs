// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Whole-file decoding into a [BomDocument].

use {
    crate::{
        block::{summarize_blocks, BlockSummary},
        error::{Decoded, Error, SectionError},
        format::{BomBlockBomInfo, BomBlocksIndex, BomHeader, BomVar, ParsedBom},
        path::BomPath,
        Limits,
    },
    log::{info, warn},
    serde::Serialize,
    std::path::Path,
};

/// Value of [BomDocument::format].
pub const FORMAT_NAME: &str = "apple-bom";

/// Controls what [parse] produces.
#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    /// Whether to describe every block in [BomDocument::blocks].
    pub include_blocks: bool,

    /// Whether block descriptions carry hex encoded block data.
    pub include_raw_block_bytes: bool,

    pub limits: Limits,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_blocks: true,
            include_raw_block_bytes: false,
            limits: Limits::default(),
        }
    }
}

impl ParseOptions {
    pub fn include_blocks(mut self, value: bool) -> Self {
        self.include_blocks = value;
        self
    }

    pub fn include_raw_block_bytes(mut self, value: bool) -> Self {
        self.include_raw_block_bytes = value;
        self
    }

    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}

/// Everything that could be decoded from a BOM.
///
/// Sections are `None` when their variable is absent or could not be
/// decoded at all. The latter is recorded in [Self::parse_errors].
#[derive(Clone, Debug, Serialize)]
pub struct BomDocument {
    /// Always [FORMAT_NAME].
    pub format: &'static str,

    /// Length of the decoded data.
    pub byte_length: usize,

    /// Filesystem path the data was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,

    pub header: BomHeader,
    pub blocks_index: BomBlocksIndex,
    pub variables: Vec<BomVar>,
    pub bom_info: Option<BomBlockBomInfo>,
    pub paths: Option<Vec<BomPath>>,
    pub hl_index: Option<Vec<BomPath>>,
    pub size64: Option<Vec<BomPath>>,
    pub vindex: Option<Vec<BomPath>>,
    pub blocks: Option<Vec<BlockSummary>>,

    /// Non-fatal problems, in the order they were found.
    pub parse_errors: Vec<SectionError>,
}

/// Fold the outcome of decoding a section into its value and diagnostics.
fn section<T>(
    name: &str,
    result: Result<Decoded<T>, Error>,
    errors: &mut Vec<SectionError>,
) -> Option<T> {
    let decoded = match result {
        Ok(decoded) => decoded,
        Err(Error::NoVar(_)) => return None,
        Err(err) => {
            warn!("{}: {}", name, err);
            errors.push(SectionError::new(name, &err));
            return None;
        }
    };

    errors.extend(decoded.errors.iter().map(|e| SectionError::new(name, e)));

    Some(decoded.value)
}

/// Decode BOM data.
///
/// Fails only if the header, blocks index, or variables index can't be read.
/// Problems anywhere else end up in [BomDocument::parse_errors].
pub fn parse(data: &[u8], options: &ParseOptions) -> Result<BomDocument, Error> {
    let bom = ParsedBom::parse(data)?.with_limits(options.limits);
    let mut errors = bom.errors.clone();

    let bom_info = section("bom_info", bom.bom_info(), &mut errors);
    let paths = section("paths", bom.paths(), &mut errors);
    let hl_index = section("hl_index", bom.hl_index(), &mut errors);
    let size64 = section("size64", bom.size64(), &mut errors);
    let vindex = section("vindex", bom.vindex(), &mut errors);

    let blocks = if options.include_blocks {
        Some(summarize_blocks(&bom, options.include_raw_block_bytes))
    } else {
        None
    };

    info!(
        "decoded {} paths with {} errors",
        paths.as_ref().map(|p| p.len()).unwrap_or(0),
        errors.len()
    );

    Ok(BomDocument {
        format: FORMAT_NAME,
        byte_length: data.len(),
        source_path: None,
        header: bom.header,
        blocks_index: bom.blocks,
        variables: bom.vars.vars,
        bom_info,
        paths,
        hl_index,
        size64,
        vindex,
        blocks,
        parse_errors: errors,
    })
}

/// Decode a BOM file.
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<BomDocument, Error> {
    let path = path.as_ref();

    let data = std::fs::read(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    let mut document = parse(&data, options)?;
    document.source_path = Some(path.display().to_string());

    Ok(document)
}
