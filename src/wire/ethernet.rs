// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Ethernet frames and 802.1Q/802.1ad VLAN tags.

use std::mem;

use byteorder::{BigEndian, ByteOrder};
use zerocopy::{AsBytes, FromBytes, Unaligned};

use crate::wire::util::{self, HeaderCursor, ParseError};

/// EtherType for IPv4.
pub const ETHERTYPE_IPV4: u16 = 0x0800;
/// EtherType for IPv6.
pub const ETHERTYPE_IPV6: u16 = 0x86DD;
/// Tag protocol identifier for 802.1Q.
pub const TPID_8021Q: u16 = 0x8100;
/// Tag protocol identifier for 802.1ad (QinQ).
pub const TPID_8021AD: u16 = 0x88A8;

/// The most stacked VLAN tags a single parse will walk.
///
/// Scanning stops after this many tags no matter how many are present,
/// keeping the per-packet work ceiling fixed.
pub const VLAN_MAX_DEPTH: usize = 5;

/// Is `ethertype` one of the two registered VLAN tag protocol values?
pub fn is_vlan_proto(ethertype: u16) -> bool {
    ethertype == TPID_8021Q || ethertype == TPID_8021AD
}

/// A MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mac([u8; 6]);

impl Mac {
    pub const fn new(bytes: [u8; 6]) -> Mac {
        Mac(bytes)
    }

    pub fn bytes(self) -> [u8; 6] {
        self.0
    }
}

// EthernetHdr has the same memory layout (thanks to repr(C, packed)) as an
// Ethernet header. Thus, we can simply reinterpret the bytes of the
// Ethernet header as an EthernetHdr and then safely access its fields.
// Note, however, that it is *not* safe to have the types of any of the
// fields be anything other than u8 or [u8; x] since network byte order
// (big endian) may not be the same as the endianness of the computer we're
// running on, and since repr(packed) is only safe with values with no
// alignment requirements.
#[repr(C, packed)]
pub struct EthernetHdr {
    dst_mac: [u8; 6],
    src_mac: [u8; 6],
    ethertype: [u8; 2],
}

unsafe impl FromBytes for EthernetHdr {}
unsafe impl AsBytes for EthernetHdr {}
unsafe impl Unaligned for EthernetHdr {}

impl EthernetHdr {
    /// The fixed Ethernet header size in bytes.
    pub const SIZE: usize = mem::size_of::<EthernetHdr>();

    pub fn dst_mac(&self) -> Mac {
        Mac::new(self.dst_mac)
    }

    pub fn src_mac(&self) -> Mac {
        Mac::new(self.src_mac)
    }

    /// The EtherType in host byte order.
    pub fn ethertype(&self) -> u16 {
        BigEndian::read_u16(&self.ethertype)
    }

    pub fn set_dst_mac(&mut self, mac: Mac) {
        self.dst_mac = mac.bytes();
    }

    pub fn set_src_mac(&mut self, mac: Mac) {
        self.src_mac = mac.bytes();
    }

    pub fn set_ethertype(&mut self, ethertype: u16) {
        BigEndian::write_u16(&mut self.ethertype, ethertype);
    }

    /// Swap the source and destination addresses in place.
    pub fn swap_macs(&mut self) {
        let tmp = self.dst_mac;
        self.dst_mac = self.src_mac;
        self.src_mac = tmp;
    }
}

// Same layout story as EthernetHdr: two big-endian 16-bit fields.
#[repr(C, packed)]
pub struct VlanHdr {
    tci: [u8; 2],
    encapsulated_proto: [u8; 2],
}

unsafe impl FromBytes for VlanHdr {}
unsafe impl AsBytes for VlanHdr {}
unsafe impl Unaligned for VlanHdr {}

impl VlanHdr {
    /// The VLAN tag size in bytes.
    pub const SIZE: usize = mem::size_of::<VlanHdr>();

    /// The tag control information (priority and VLAN id) in host byte
    /// order.
    pub fn tci(&self) -> u16 {
        BigEndian::read_u16(&self.tci)
    }

    /// The EtherType of the encapsulated payload, in host byte order.
    pub fn encapsulated_proto(&self) -> u16 {
        BigEndian::read_u16(&self.encapsulated_proto)
    }

    pub fn set_tci(&mut self, tci: u16) {
        BigEndian::write_u16(&mut self.tci, tci);
    }

    pub fn set_encapsulated_proto(&mut self, ethertype: u16) {
        BigEndian::write_u16(&mut self.encapsulated_proto, ethertype);
    }
}

/// Parse an Ethernet header and any stacked VLAN tags behind it.
///
/// On success the cursor has advanced past the Ethernet header and every
/// tag consumed, and the return value is the header's byte offset plus the
/// working EtherType in host byte order. At most [`VLAN_MAX_DEPTH`] tags
/// are walked; if the ceiling is hit (or a tag is cut short) while the
/// working EtherType still names a VLAN tag, that tag value is returned
/// as-is and the caller sees it as an unhandled protocol.
///
/// Fails with [`ParseError::Truncated`], cursor unmoved, if the fixed
/// Ethernet header itself does not fit.
pub fn parse(cursor: &mut HeaderCursor, data: &[u8]) -> Result<(usize, u16), ParseError> {
    let offset = cursor.offset();
    let hdr = util::header_at::<EthernetHdr>(data, offset).ok_or(ParseError::Truncated)?;
    let mut proto = hdr.ethertype();
    cursor.advance(EthernetHdr::SIZE);

    // Bounded scan so the worst-case work per packet stays fixed; a frame
    // may carry more tags than we are willing to look at.
    for _ in 0..VLAN_MAX_DEPTH {
        if !is_vlan_proto(proto) {
            break;
        }
        let tag = match util::header_at::<VlanHdr>(data, cursor.offset()) {
            Some(tag) => tag,
            None => break,
        };
        proto = tag.encapsulated_proto();
        cursor.advance(VlanHdr::SIZE);
    }

    Ok((offset, proto))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_tags(tags: usize, inner: u16) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[2, 0, 0, 0, 0, 1]);
        frame.extend_from_slice(&[2, 0, 0, 0, 0, 2]);
        let outer = if tags > 0 { TPID_8021Q } else { inner };
        frame.extend_from_slice(&outer.to_be_bytes());
        for i in 0..tags {
            let encapsulated = if i + 1 < tags { TPID_8021Q } else { inner };
            frame.extend_from_slice(&(100 + i as u16).to_be_bytes());
            frame.extend_from_slice(&encapsulated.to_be_bytes());
        }
        frame
    }

    #[test]
    fn parse_untagged() {
        let frame = frame_with_tags(0, ETHERTYPE_IPV4);
        let mut cursor = HeaderCursor::new();
        let (offset, proto) = parse(&mut cursor, &frame).unwrap();
        assert_eq!(offset, 0);
        assert_eq!(proto, ETHERTYPE_IPV4);
        assert_eq!(cursor.offset(), EthernetHdr::SIZE);
    }

    #[test]
    fn parse_single_tag() {
        let frame = frame_with_tags(1, ETHERTYPE_IPV4);
        let mut cursor = HeaderCursor::new();
        let (_, proto) = parse(&mut cursor, &frame).unwrap();
        assert_eq!(proto, ETHERTYPE_IPV4);
        assert_eq!(cursor.offset(), EthernetHdr::SIZE + VlanHdr::SIZE);
    }

    #[test]
    fn truncated_header_leaves_cursor_unmoved() {
        let frame = frame_with_tags(0, ETHERTYPE_IPV4);
        let mut cursor = HeaderCursor::new();
        assert_eq!(
            parse(&mut cursor, &frame[..EthernetHdr::SIZE - 1]),
            Err(ParseError::Truncated)
        );
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn unrolling_stops_at_max_depth() {
        // Six stacked tags: the scan must stop after the fifth, returning
        // the still-VLAN EtherType it read there.
        let frame = frame_with_tags(6, ETHERTYPE_IPV4);
        let mut cursor = HeaderCursor::new();
        let (_, proto) = parse(&mut cursor, &frame).unwrap();
        assert!(is_vlan_proto(proto));
        assert_eq!(
            cursor.offset(),
            EthernetHdr::SIZE + VLAN_MAX_DEPTH * VlanHdr::SIZE
        );
    }

    #[test]
    fn truncated_tag_stops_the_scan() {
        let frame = frame_with_tags(1, ETHERTYPE_IPV4);
        let mut cursor = HeaderCursor::new();
        // Cut the frame in the middle of the tag: the Ethernet parse still
        // succeeds but the working EtherType stays 802.1Q.
        let (_, proto) = parse(&mut cursor, &frame[..EthernetHdr::SIZE + 2]).unwrap();
        assert_eq!(proto, TPID_8021Q);
        assert_eq!(cursor.offset(), EthernetHdr::SIZE);
    }

    #[test]
    fn mac_swap() {
        let mut frame = frame_with_tags(0, ETHERTYPE_IPV4);
        let mut hdr = util::header_at_mut::<EthernetHdr>(&mut frame, 0).unwrap();
        let (dst, src) = (hdr.dst_mac(), hdr.src_mac());
        hdr.swap_macs();
        assert_eq!(hdr.dst_mac(), src);
        assert_eq!(hdr.src_mac(), dst);
    }
}
