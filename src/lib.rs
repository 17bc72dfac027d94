// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-packet header parsing and forwarding decisions for raw Ethernet
//! frames.
//!
//! This crate is the shared machinery used by every packet program in the
//! repository: a bounds-checked cursor for walking stacked protocol headers
//! (Ethernet with nested VLAN tags, IPv4, IPv6, ICMP/ICMPv6, TCP/UDP),
//! in-place header mutation (VLAN tag push/pop, address swaps, incremental
//! checksum updates, TTL decrement), and a forwarding engine that turns a
//! route lookup into a concrete verdict.
//!
//! Processing is strictly per-packet and stateless: a program receives one
//! [`PacketBuffer`], walks it once with bounded work (stacked-VLAN scanning
//! has a fixed iteration ceiling), and yields exactly one [`Verdict`]. The
//! only shared state lives in externally-owned tables ([`tables`],
//! [`stats`]) which support concurrent lookup and increment.

pub mod buffer;
pub mod forward;
pub mod ip;
pub mod programs;
pub mod stats;
pub mod tables;
pub mod vlan;
pub mod wire;

pub use crate::buffer::{BufferError, PacketBuffer};
pub use crate::stats::{Action, StatsCollector, Verdict};
pub use crate::wire::ParseError;
