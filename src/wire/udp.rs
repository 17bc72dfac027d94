// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! UDP datagram headers.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::wire::util::{self, HeaderCursor, ParseError};

// Same layout story as the other wire structs: repr(C, packed), byte-array
// fields, big-endian accessors.
#[repr(C, packed)]
pub struct UdpHdr {
    src_port: [u8; 2],
    dst_port: [u8; 2],
    length: [u8; 2],
    checksum: [u8; 2],
}

unsafe impl FromBytes for UdpHdr {}
unsafe impl AsBytes for UdpHdr {}
unsafe impl Unaligned for UdpHdr {}

impl UdpHdr {
    /// The UDP header size in bytes.
    pub const SIZE: usize = mem::size_of::<UdpHdr>();

    pub fn src_port(&self) -> u16 {
        BigEndian::read_u16(&self.src_port)
    }

    pub fn dst_port(&self) -> u16 {
        BigEndian::read_u16(&self.dst_port)
    }

    pub fn length(&self) -> u16 {
        BigEndian::read_u16(&self.length)
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.checksum)
    }

    pub fn set_src_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.src_port, port);
    }

    pub fn set_dst_port(&mut self, port: u16) {
        BigEndian::write_u16(&mut self.dst_port, port);
    }
}

/// Parse a UDP header and apply the port-rewrite mutation.
///
/// Like [`crate::wire::tcp::parse`]: after the bounds check, the
/// destination port is decremented by one in place, and only the header's
/// byte offset is returned since UDP is a terminal layer here.
pub fn parse(cursor: &mut HeaderCursor, data: &mut [u8]) -> Result<usize, ParseError> {
    let offset = cursor.offset();
    let mut hdr = util::header_at_mut::<UdpHdr>(data, offset).ok_or(ParseError::Truncated)?;
    let port = hdr.dst_port();
    hdr.set_dst_port(port.wrapping_sub(1));
    cursor.advance(UdpHdr::SIZE);
    Ok(offset)
}
