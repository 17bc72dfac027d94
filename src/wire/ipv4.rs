// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! IPv4 headers.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::ip::Ipv4Addr;
use crate::wire::util::{self, csum_update, Checksum, HeaderCursor, ParseError};

// Ipv4Hdr has the same memory layout (thanks to repr(C, packed)) as an
// IPv4 header without options. Fields are only u8 or [u8; x] since network
// byte order (big endian) may not be the same as the endianness of the
// computer we're running on, and since repr(packed) is only safe with
// values with no alignment requirements.
#[repr(C, packed)]
pub struct Ipv4Hdr {
    version_ihl: u8,
    dscp_ecn: u8,
    total_len: [u8; 2],
    id: [u8; 2],
    flags_frag_off: [u8; 2],
    ttl: u8,
    proto: u8,
    hdr_checksum: [u8; 2],
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
}

unsafe impl FromBytes for Ipv4Hdr {}
unsafe impl AsBytes for Ipv4Hdr {}
unsafe impl Unaligned for Ipv4Hdr {}

impl Ipv4Hdr {
    /// The size of the fixed header prefix, excluding options.
    pub const SIZE: usize = mem::size_of::<Ipv4Hdr>();

    pub fn version(&self) -> u8 {
        self.version_ihl >> 4
    }

    pub fn ihl(&self) -> u8 {
        self.version_ihl & 0xF
    }

    /// The full header length in bytes, computed from the IHL field.
    pub fn header_len(&self) -> usize {
        usize::from(self.ihl()) * 4
    }

    /// The raw DSCP/ECN byte (the key's type-of-service value).
    pub fn tos(&self) -> u8 {
        self.dscp_ecn
    }

    pub fn total_length(&self) -> u16 {
        BigEndian::read_u16(&self.total_len)
    }

    pub fn id(&self) -> u16 {
        BigEndian::read_u16(&self.id)
    }

    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    pub fn proto(&self) -> u8 {
        self.proto
    }

    pub fn hdr_checksum(&self) -> u16 {
        BigEndian::read_u16(&self.hdr_checksum)
    }

    pub fn src_ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.src_ip)
    }

    pub fn dst_ip(&self) -> Ipv4Addr {
        Ipv4Addr::new(self.dst_ip)
    }

    pub fn set_src_ip(&mut self, src_ip: Ipv4Addr) {
        self.src_ip = src_ip.ipv4_bytes();
    }

    pub fn set_dst_ip(&mut self, dst_ip: Ipv4Addr) {
        self.dst_ip = dst_ip.ipv4_bytes();
    }

    /// Swap the source and destination addresses in place.
    ///
    /// The header checksum is unaffected: the one's-complement sum is the
    /// same whichever order the address words appear in.
    pub fn swap_addrs(&mut self) {
        let tmp = self.src_ip;
        self.src_ip = self.dst_ip;
        self.dst_ip = tmp;
    }

    /// Decrement the TTL by one and patch the header checksum
    /// incrementally. Returns the new TTL.
    ///
    /// Callers are expected to have checked that the TTL has room to drop;
    /// the forwarding engine never forwards a packet whose TTL is 1.
    pub fn decrement_ttl(&mut self) -> u8 {
        let old = u16::from(self.ttl) << 8 | u16::from(self.proto);
        self.ttl = self.ttl.wrapping_sub(1);
        let new = u16::from(self.ttl) << 8 | u16::from(self.proto);
        let checksum = csum_update(self.hdr_checksum(), old, new);
        BigEndian::write_u16(&mut self.hdr_checksum, checksum);
        self.ttl
    }

    /// Compute and set the header checksum from the current header state.
    ///
    /// This is a full recomputation over the fixed header; the in-place
    /// mutators above keep the checksum current incrementally instead.
    pub fn set_checksum(&mut self) {
        self.hdr_checksum = [0, 0];
        let mut c = Checksum::new();
        c.add_bytes(self.as_bytes());
        let sum = c.sum();
        BigEndian::write_u16(&mut self.hdr_checksum, sum);
    }
}

/// Parse an IPv4 header.
///
/// The fixed 20-byte prefix is bounds-checked first; the header's true
/// extent is then recomputed from the IHL field and re-validated before
/// the cursor advances past it (a fixed-size check alone is insufficient
/// for a variable-length header). Returns the header's byte offset and the
/// protocol number of the payload.
pub fn parse(cursor: &mut HeaderCursor, data: &[u8]) -> Result<(usize, u8), ParseError> {
    let offset = cursor.offset();
    let hdr = util::header_at::<Ipv4Hdr>(data, offset).ok_or(ParseError::Truncated)?;
    let header_len = hdr.header_len();
    if offset + header_len > data.len() {
        return Err(ParseError::Truncated);
    }
    let proto = hdr.proto();
    cursor.advance(header_len);
    Ok((offset, proto))
}
