// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! VLAN tag insertion and removal.
//!
//! Both operations resize the packet at its head, which invalidates every
//! previously derived header offset; they therefore re-validate the
//! Ethernet header from scratch after the resize before touching it.
//! [`pop`] and [`push`] are inverses on a well-formed frame: pushing a tag
//! and popping it (or the other way around) restores the original bytes
//! exactly.

use thiserror::Error;

use crate::buffer::{BufferError, PacketBuffer};
use crate::wire::ethernet::{is_vlan_proto, EthernetHdr, VlanHdr, TPID_8021Q};
use crate::wire::util::{header_at, header_at_mut};

/// Errors from VLAN tag push/pop.
///
/// On error the packet keeps its pre-mutation headers; no partially
/// rewritten state is left behind.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VlanError {
    /// `pop` was asked to remove a tag from a frame whose EtherType is not
    /// a VLAN tag protocol.
    #[error("outermost EtherType is not a VLAN tag")]
    NotTagged,
    /// `push` was asked to add a tag to a frame that already carries one.
    #[error("outermost EtherType is already a VLAN tag")]
    AlreadyTagged,
    /// The Ethernet header or the tag does not fit in the packet.
    #[error("frame too short for the requested tag operation")]
    Truncated,
    /// The head resize itself failed.
    #[error(transparent)]
    Resize(#[from] BufferError),
}

/// Pop the outermost VLAN tag off the packet.
///
/// Returns the popped tag's control information (host byte order). The
/// Ethernet header is preserved and its EtherType replaced with the tag's
/// encapsulated protocol.
pub fn pop(buf: &mut PacketBuffer) -> Result<u16, VlanError> {
    let (eth_copy, tci, inner_proto) = {
        let data = buf.data();
        let eth = header_at::<EthernetHdr>(data, 0).ok_or(VlanError::Truncated)?;
        if !is_vlan_proto(eth.ethertype()) {
            return Err(VlanError::NotTagged);
        }
        // The tag sits immediately after the Ethernet header; its bounds
        // still need checking.
        let tag = header_at::<VlanHdr>(data, EthernetHdr::SIZE).ok_or(VlanError::Truncated)?;

        // Save the tag's id for returning and the outer Ethernet header
        // before we cut it off.
        let mut eth_copy = [0u8; EthernetHdr::SIZE];
        eth_copy.copy_from_slice(&data[..EthernetHdr::SIZE]);
        (eth_copy, tag.tci(), tag.encapsulated_proto())
    };

    buf.adjust_head(VlanHdr::SIZE as isize)?;

    // The resize produced a new buffer view; re-validate that an Ethernet
    // header still fits before writing into it.
    let data = buf.data_mut();
    if data.len() < EthernetHdr::SIZE {
        return Err(VlanError::Truncated);
    }
    data[..EthernetHdr::SIZE].copy_from_slice(&eth_copy);
    let mut eth = header_at_mut::<EthernetHdr>(data, 0).ok_or(VlanError::Truncated)?;
    eth.set_ethertype(inner_proto);

    Ok(tci)
}

/// Push a VLAN tag carrying `tci` in between the Ethernet header and its
/// payload.
///
/// The new tag encapsulates the frame's original EtherType and the outer
/// EtherType becomes 802.1Q.
pub fn push(buf: &mut PacketBuffer, tci: u16) -> Result<(), VlanError> {
    let (eth_copy, orig_proto) = {
        let data = buf.data();
        let eth = header_at::<EthernetHdr>(data, 0).ok_or(VlanError::Truncated)?;
        if is_vlan_proto(eth.ethertype()) {
            return Err(VlanError::AlreadyTagged);
        }
        let mut eth_copy = [0u8; EthernetHdr::SIZE];
        eth_copy.copy_from_slice(&data[..EthernetHdr::SIZE]);
        (eth_copy, eth.ethertype())
    };

    // Grow into the headroom. On failure the buffer is untouched and the
    // frame keeps its pre-mutation headers.
    buf.adjust_head(-(VlanHdr::SIZE as isize))?;

    let data = buf.data_mut();
    if data.len() < EthernetHdr::SIZE + VlanHdr::SIZE {
        return Err(VlanError::Truncated);
    }
    data[..EthernetHdr::SIZE].copy_from_slice(&eth_copy);

    {
        let mut tag =
            header_at_mut::<VlanHdr>(data, EthernetHdr::SIZE).ok_or(VlanError::Truncated)?;
        tag.set_tci(tci);
        tag.set_encapsulated_proto(orig_proto);
    }

    let mut eth = header_at_mut::<EthernetHdr>(data, 0).ok_or(VlanError::Truncated)?;
    eth.set_ethertype(TPID_8021Q);

    Ok(())
}
