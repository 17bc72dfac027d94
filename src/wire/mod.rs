// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parsing and in-place mutation of wire formats.
//!
//! This module provides checked access to the various wire formats walked
//! by the packet programs. Header layouts are described by
//! `#[repr(C, packed)]` structs whose fields are only `u8` or `[u8; N]`,
//! reinterpreted from packet bytes via [`zerocopy::LayoutVerified`]; all
//! multi-byte fields are big-endian on the wire and converted at the
//! accessor boundary.
//!
//! Each parser takes a [`HeaderCursor`] and the packet bytes, proves that
//! the whole header lies inside the buffer before touching it, and returns
//! the header's byte offset together with the next-layer protocol
//! identifier in host byte order. On a failed bounds check the cursor is
//! left unmoved.

pub mod ethernet;
pub mod icmp;
pub mod ipv4;
pub mod ipv6;
pub mod tcp;
pub mod udp;
pub mod util;

pub use self::util::{HeaderCursor, ParseError};
