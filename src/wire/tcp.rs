// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! TCP segment headers.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::wire::util::{self, HeaderCursor, ParseError};

// Same layout story as the other wire structs: repr(C, packed), byte-array
// fields, big-endian accessors. Only the fixed 20-byte prefix is modeled;
// options are payload as far as the packet programs are concerned.
#[repr(C, packed)]
pub struct TcpHdr {
    src_port: [u8; 2],
    dst_port: [u8; 2],
    seq_num: [u8; 4],
    ack: [u8; 4],
    data_off_reserved_ns: u8,
    flags: u8,
    window_size: [u8; 2],
    checksum: [u8; 2],
    urg_ptr: [u8; 2],
}

unsafe impl FromBytes for TcpHdr {}
unsafe impl AsBytes for TcpHdr {}
unsafe impl Unaligned for TcpHdr {}

impl TcpHdr {
    /// The fixed header prefix size in bytes, excluding options.
    pub const SIZE: usize = mem::size_of::<TcpHdr>();

    pub fn src_port(&self) -> u16 {
        BigEndian::read_u16(&self.src_port)
    }

    pub fn dst_port(&self) -> u16 {
        BigEndian::read_u16(&self.dst_port)
    }

    pub fn seq_num(&self) -> u32 {
        BigEndian::read_u32(&self.seq_num)
    }

    pub fn ack_num(&self) -> u32 {
        BigEndian::read_u32(&self.ack)
    }

    pub fn data_off(&self) -> u8 {
        self.data_off_reserved_ns >> 4
    }

    pub fn window_size(&self) -> u16 {
        BigEndian::read_u16(&self.window_size)
    }

    pub fn set_src_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.src_port, port);
    }

    pub fn set_dst_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.dst_port, port);
    }
}

/// Parse a TCP header and apply the port-rewrite mutation.
///
/// After the bounds check passes, the destination port is decremented by
/// one in place (the rewrite the port-rewrite program exists to perform;
/// all layout fields were validated first, so mutating here is safe).
/// TCP is a terminal layer for the programs in this crate, so only the
/// header's byte offset is returned.
pub fn parse(cursor: &mut HeaderCursor, data: &mut [u8]) -> Result<usize, ParseError> {
    let offset = cursor.offset();
    let mut hdr = util::header_at_mut::<TcpHdr>(data, offset).ok_or(ParseError::Truncated)?;
    let port = hdr.dst_port();
    hdr.set_dst_port(port.wrapping_sub(1));
    cursor.advance(TcpHdr::SIZE);
    Ok(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(src_port: u16, dst_port: u16) -> Vec<u8> {
        let mut bytes = vec![0u8; TcpHdr::SIZE];
        BigEndian::write_u16(&mut bytes[0..2], src_port);
        BigEndian::write_u16(&mut bytes[2..4], dst_port);
        bytes[12] = 5 << 4;
        bytes
    }

    #[test]
    fn parse_rewrites_dst_port() {
        let mut bytes = segment(40000, 8080);
        let mut cursor = HeaderCursor::new();
        let offset = parse(&mut cursor, &mut bytes).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(cursor.offset(), TcpHdr::SIZE);

        let hdr = util::header_at::<TcpHdr>(&bytes, 0).unwrap();
        assert_eq!(hdr.src_port(), 40000);
        assert_eq!(hdr.dst_port(), 8079);
    }

    #[test]
    fn truncated_header_mutates_nothing() {
        let mut bytes = segment(40000, 8080);
        bytes.truncate(TcpHdr::SIZE - 1);
        let snapshot = bytes.clone();
        let mut cursor = HeaderCursor::new();
        assert_eq!(parse(&mut cursor, &mut bytes), Err(ParseError::Truncated));
        assert_eq!(cursor.offset(), 0);
        assert_eq!(bytes, snapshot);
    }
}
