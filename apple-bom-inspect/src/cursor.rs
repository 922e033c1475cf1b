// Copyright 2022 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bounds-checked big-endian reading.

use {
    crate::Error,
    scroll::{
        ctx::{SizeWith, TryFromCtx},
        Endian, Pread,
    },
};

/// A read position over an immutable byte slice.
///
/// All multi-byte integers in BOM data are big-endian. Every read is bounds
/// checked against the underlying slice before any data is consumed, so a
/// failed read leaves the position untouched.
#[derive(Clone, Copy, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current offset into the underlying data.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Length of the underlying data.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check(&self, offset: usize, length: usize) -> Result<(), Error> {
        match offset.checked_add(length) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(Error::OutOfBounds {
                offset,
                length,
                available: self.data.len(),
            }),
        }
    }

    /// Move to an absolute offset.
    ///
    /// Seeking to the end of the data is allowed. Seeking past it is not.
    pub fn seek(&mut self, offset: usize) -> Result<(), Error> {
        self.check(offset, 0)?;
        self.position = offset;

        Ok(())
    }

    fn read_scalar<T>(&mut self) -> Result<T, Error>
    where
        T: TryFromCtx<'a, Endian, Error = scroll::Error>,
    {
        self.check(self.position, std::mem::size_of::<T>())?;

        Ok(self.data.gread_with::<T>(&mut self.position, scroll::BE)?)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        self.read_scalar()
    }

    pub fn read_u16(&mut self) -> Result<u16, Error> {
        self.read_scalar()
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        self.read_scalar()
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        self.read_scalar()
    }

    /// Read a fixed-size record deriving [scroll::Pread] and [scroll::SizeWith].
    pub fn read_record<T>(&mut self) -> Result<T, Error>
    where
        T: TryFromCtx<'a, Endian, Error = scroll::Error> + SizeWith<Endian>,
    {
        self.check(self.position, T::size_with(&scroll::BE))?;

        Ok(self.data.gread_with::<T>(&mut self.position, scroll::BE)?)
    }

    /// Read exactly `length` bytes.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8], Error> {
        self.check(self.position, length)?;

        let start = self.position;
        self.position += length;

        Ok(&self.data[start..self.position])
    }

    /// Read a NULL terminated string.
    ///
    /// The terminator is consumed but not returned. If no terminator is
    /// present, everything up to the end of the data is returned.
    pub fn read_cstring(&mut self) -> Result<&'a [u8], Error> {
        self.check(self.position, 0)?;

        let rest = &self.data[self.position..];

        match rest.iter().position(|b| *b == 0) {
            Some(end) => {
                self.position += end + 1;
                Ok(&rest[..end])
            }
            None => {
                self.position = self.data.len();
                Ok(rest)
            }
        }
    }

    /// Obtain an independent cursor over a sub-range of the data.
    pub fn sub_cursor(&self, offset: usize, length: usize) -> Result<ByteCursor<'a>, Error> {
        self.check(offset, length)?;

        Ok(ByteCursor::new(&self.data[offset..offset + length]))
    }

    /// Number of `entry_size` records that could still fit in the remaining data.
    ///
    /// Used to bound preallocation when a count comes from untrusted input.
    pub fn capacity_hint(&self, count: u32, entry_size: usize) -> usize {
        (count as usize).min(self.remaining() / entry_size.max(1))
    }
}
