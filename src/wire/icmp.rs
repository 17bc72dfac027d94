// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! ICMP and ICMPv6 echo headers.
//!
//! Both protocols front their messages with the same 8-byte layout (type,
//! code, checksum, and for echo messages an identifier and sequence
//! number), so a single header struct serves both; only the type values
//! differ.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::wire::util::{self, csum_update, Checksum, HeaderCursor, ParseError};

/// ICMP echo request type.
pub const ICMP_ECHO_REQUEST: u8 = 8;
/// ICMP echo reply type.
pub const ICMP_ECHO_REPLY: u8 = 0;
/// ICMPv6 echo request type.
pub const ICMPV6_ECHO_REQUEST: u8 = 128;
/// ICMPv6 echo reply type.
pub const ICMPV6_ECHO_REPLY: u8 = 129;

// Same layout story as the other wire structs: repr(C, packed), byte-array
// fields, big-endian accessors.
#[repr(C, packed)]
pub struct IcmpHdr {
    msg_type: u8,
    code: u8,
    checksum: [u8; 2],
    id: [u8; 2],
    sequence: [u8; 2],
}

unsafe impl FromBytes for IcmpHdr {}
unsafe impl AsBytes for IcmpHdr {}
unsafe impl Unaligned for IcmpHdr {}

impl IcmpHdr {
    /// The echo header size in bytes.
    pub const SIZE: usize = mem::size_of::<IcmpHdr>();

    pub fn msg_type(&self) -> u8 {
        self.msg_type
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn checksum(&self) -> u16 {
        BigEndian::read_u16(&self.checksum)
    }

    pub fn id(&self) -> u16 {
        BigEndian::read_u16(&self.id)
    }

    pub fn sequence(&self) -> u16 {
        BigEndian::read_u16(&self.sequence)
    }

    /// Replace the message type, patching the checksum incrementally.
    ///
    /// Only the 16-bit word holding the type and code changes, so the
    /// update is exact: the result equals a full recomputation over the
    /// mutated message.
    pub fn rewrite_type(&mut self, msg_type: u8) {
        let old = u16::from(self.msg_type) << 8 | u16::from(self.code);
        self.msg_type = msg_type;
        let new = u16::from(self.msg_type) << 8 | u16::from(self.code);
        let checksum = csum_update(self.checksum(), old, new);
        BigEndian::write_u16(&mut self.checksum, checksum);
    }

    /// Compute and set the checksum over the header and `payload`.
    ///
    /// A full recomputation, used when building messages from scratch.
    /// (For ICMPv6 the real checksum also covers a pseudo-header; the
    /// programs here never build ICMPv6 messages, only patch them, so no
    /// pseudo-header variant is provided.)
    pub fn set_checksum(&mut self, payload: &[u8]) {
        self.checksum = [0, 0];
        let mut c = Checksum::new();
        c.add_bytes(self.as_bytes());
        c.add_bytes(payload);
        let sum = c.sum();
        BigEndian::write_u16(&mut self.checksum, sum);
    }
}

/// Parse an ICMP header. Returns the header's byte offset and the message
/// type.
pub fn parse(cursor: &mut HeaderCursor, data: &[u8]) -> Result<(usize, u8), ParseError> {
    let offset = cursor.offset();
    let hdr = util::header_at::<IcmpHdr>(data, offset).ok_or(ParseError::Truncated)?;
    let msg_type = hdr.msg_type();
    cursor.advance(IcmpHdr::SIZE);
    Ok((offset, msg_type))
}

/// Parse an ICMPv6 header. Returns the header's byte offset and the
/// message type.
pub fn parse_v6(cursor: &mut HeaderCursor, data: &[u8]) -> Result<(usize, u8), ParseError> {
    parse(cursor, data)
}
