// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parsing utilities shared by the wire formats: the header cursor,
//! checked header views, and one's-complement checksums.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

/// Errors from parsing a header.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The header extends past the end of the packet.
    #[error("header extends past the end of the packet")]
    Truncated,
}

/// A parse position inside a packet buffer.
///
/// The cursor only moves forward, and only by the size of a successfully
/// bounds-checked header. It is an offset relative to the buffer's current
/// head; after a head adjustment a fresh cursor must be used.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderCursor {
    pos: usize,
}

impl HeaderCursor {
    pub fn new() -> HeaderCursor {
        HeaderCursor { pos: 0 }
    }

    /// The current byte offset from the buffer head.
    pub fn offset(&self) -> usize {
        self.pos
    }

    pub(crate) fn advance(&mut self, bytes: usize) {
        self.pos += bytes;
    }
}

/// A checked immutable view of a `T` at `offset` into `data`.
///
/// Returns `None` unless the whole of `[offset, offset + size_of::<T>())`
/// lies inside `data`.
pub(crate) fn header_at<T>(data: &[u8], offset: usize) -> Option<LayoutVerified<&[u8], T>>
where
    T: FromBytes + Unaligned,
{
    let end = offset.checked_add(mem::size_of::<T>())?;
    LayoutVerified::new_unaligned(data.get(offset..end)?)
}

/// A checked mutable view of a `T` at `offset` into `data`.
pub(crate) fn header_at_mut<T>(
    data: &mut [u8],
    offset: usize,
) -> Option<LayoutVerified<&mut [u8], T>>
where
    T: FromBytes + AsBytes + Unaligned,
{
    let end = offset.checked_add(mem::size_of::<T>())?;
    LayoutVerified::new_unaligned(data.get_mut(offset..end)?)
}

/// A one's-complement checksum, as used by IPv4, ICMP, TCP, and UDP.
///
/// This checksum operates by computing the 1s complement sum of successive
/// 16-bit words of the input.
pub struct Checksum(u32);

impl Checksum {
    pub fn new() -> Checksum {
        Checksum(0)
    }

    /// Add bytes to the checksum.
    ///
    /// If `bytes` does not contain an even number of bytes, a single zero
    /// byte will be added to the end before updating the checksum.
    pub fn add_bytes(&mut self, mut bytes: &[u8]) {
        while bytes.len() > 1 {
            self.0 += u32::from(BigEndian::read_u16(bytes));
            bytes = &bytes[2..];
        }
        if bytes.len() == 1 {
            self.0 += u32::from(BigEndian::read_u16(&[bytes[0], 0]));
        }
    }

    /// Compute the checksum of all data added so far.
    ///
    /// Calling `sum` does *not* reset the checksum; more bytes may be added
    /// afterwards.
    pub fn sum(&self) -> u16 {
        let mut sum = self.0;
        while (sum >> 16) != 0 {
            sum = (sum >> 16) + (sum & 0xFFFF);
        }
        !sum as u16
    }
}

impl Default for Checksum {
    fn default() -> Checksum {
        Checksum::new()
    }
}

/// Checksum bytes.
///
/// `checksum` is a shorthand for
///
/// ```rust
/// # use fastpath::wire::util::Checksum;
/// # let bytes = [0u8; 2];
/// let mut c = Checksum::new();
/// c.add_bytes(&bytes);
/// c.sum();
/// ```
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut c = Checksum::new();
    c.add_bytes(bytes);
    c.sum()
}

/// 16-bit addition with end-around carry.
pub fn csum16_add(csum: u16, addend: u16) -> u16 {
    let (sum, overflow) = csum.overflowing_add(addend);
    sum + u16::from(overflow)
}

/// Incrementally update a checksum after one 16-bit word of the summed
/// data changes from `old` to `new`.
///
/// Numerically identical to recomputing the checksum over the mutated
/// bytes, so single-field rewrites (ICMP echo type, IPv4 TTL) never need a
/// full pass over the header.
pub fn csum_update(csum: u16, old: u16, new: u16) -> u16 {
    !csum16_add(csum16_add(!csum, !old), new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_bytes_pads_odd_length() {
        // [0x01, 0x02, 0x03] sums as 0x0102 + 0x0300.
        assert_eq!(checksum(&[0x01, 0x02, 0x03]), !0x0402u16);
    }

    #[test]
    fn sum_folds_carries() {
        let mut c = Checksum::new();
        c.add_bytes(&[0xFF, 0xFF, 0x00, 0x01]);
        assert_eq!(c.sum(), !0x0001u16);
    }

    #[test]
    fn csum16_add_carries() {
        assert_eq!(csum16_add(0xFFFF, 0x0001), 0x0001);
        assert_eq!(csum16_add(0x0001, 0xFFFF), 0x0001);
        assert_eq!(csum16_add(0xFFFF, 0xFFFF), 0xFFFF);
        assert_eq!(csum16_add(0x1234, 0x0001), 0x1235);
    }

    #[test]
    fn incremental_update_matches_recomputation() {
        // Swap the first word of a four-word buffer through a set of
        // values that exercises carry propagation both ways, comparing the
        // incremental update against a full recomputation each time.
        let values = [
            0x0000u16, 0x0001, 0x00FF, 0x0800, 0x7FFF, 0x8000, 0xFFFE, 0xFFFF,
        ];
        for &old in &values {
            for &new in &values {
                let mut data = [0u8; 8];
                data[..2].copy_from_slice(&old.to_be_bytes());
                data[2..4].copy_from_slice(&0x1234u16.to_be_bytes());
                data[4..6].copy_from_slice(&0xABCDu16.to_be_bytes());
                data[6..8].copy_from_slice(&0x0042u16.to_be_bytes());
                let before = checksum(&data);

                data[..2].copy_from_slice(&new.to_be_bytes());
                let recomputed = checksum(&data);

                assert_eq!(
                    csum_update(before, old, new),
                    recomputed,
                    "old={:#06x} new={:#06x}",
                    old,
                    new
                );
            }
        }
    }

    #[test]
    fn cursor_starts_at_zero_and_advances() {
        let mut cursor = HeaderCursor::new();
        assert_eq!(cursor.offset(), 0);
        cursor.advance(14);
        cursor.advance(20);
        assert_eq!(cursor.offset(), 34);
    }
}
