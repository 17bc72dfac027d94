// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! IPv6 headers.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::ip::Ipv6Addr;
use crate::wire::util::{self, HeaderCursor, ParseError};

/// Mask selecting the traffic-class and flow-label bits of the first
/// 32-bit word, as consumed by route lookups.
const FLOWINFO_MASK: u32 = 0x0FFF_FFFF;

// Same layout story as the other wire structs: repr(C, packed), byte-array
// fields, big-endian accessors.
#[repr(C, packed)]
pub struct Ipv6Hdr {
    version_tc_flow: [u8; 4],
    payload_len: [u8; 2],
    next_hdr: u8,
    hop_limit: u8,
    src_ip: [u8; 16],
    dst_ip: [u8; 16],
}

unsafe impl FromBytes for Ipv6Hdr {}
unsafe impl AsBytes for Ipv6Hdr {}
unsafe impl Unaligned for Ipv6Hdr {}

impl Ipv6Hdr {
    /// The fixed IPv6 header size in bytes.
    pub const SIZE: usize = mem::size_of::<Ipv6Hdr>();

    pub fn version(&self) -> u8 {
        self.version_tc_flow[0] >> 4
    }

    /// Traffic class and flow label, in host byte order.
    pub fn flow_info(&self) -> u32 {
        BigEndian::read_u32(&self.version_tc_flow) & FLOWINFO_MASK
    }

    pub fn payload_len(&self) -> u16 {
        BigEndian::read_u16(&self.payload_len)
    }

    pub fn next_hdr(&self) -> u8 {
        self.next_hdr
    }

    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    /// Decrement the hop limit by one. Returns the new value.
    ///
    /// Unlike IPv4 there is no header checksum to patch.
    pub fn decrement_hop_limit(&mut self) -> u8 {
        self.hop_limit = self.hop_limit.wrapping_sub(1);
        self.hop_limit
    }

    pub fn src_ip(&self) -> Ipv6Addr {
        Ipv6Addr::new(self.src_ip)
    }

    pub fn dst_ip(&self) -> Ipv6Addr {
        Ipv6Addr::new(self.dst_ip)
    }

    pub fn set_src_ip(&mut self, src_ip: Ipv6Addr) {
        self.src_ip = src_ip.ipv6_bytes();
    }

    pub fn set_dst_ip(&mut self, dst_ip: Ipv6Addr) {
        self.dst_ip = dst_ip.ipv6_bytes();
    }

    /// Swap the source and destination addresses in place.
    pub fn swap_addrs(&mut self) {
        let tmp = self.src_ip;
        self.src_ip = self.dst_ip;
        self.dst_ip = tmp;
    }
}

/// Parse an IPv6 header.
///
/// The header is a fixed 40 bytes; extension headers are left to the
/// caller as payload. Returns the header's byte offset and the next-header
/// number.
pub fn parse(cursor: &mut HeaderCursor, data: &[u8]) -> Result<(usize, u8), ParseError> {
    let offset = cursor.offset();
    let hdr = util::header_at::<Ipv6Hdr>(data, offset).ok_or(ParseError::Truncated)?;
    let next_hdr = hdr.next_hdr();
    cursor.advance(Ipv6Hdr::SIZE);
    Ok((offset, next_hdr))
}
