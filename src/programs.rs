// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The per-packet programs.
//!
//! Each program takes one packet buffer plus the external collaborators it
//! needs, walks the headers one at a time (every helper bounds-checks
//! before it reads), and yields exactly one verdict, recorded with the
//! statistics collector on the way out. Anything a program cannot parse,
//! or does not want to deal with, it passes up to the normal stack.

use log::debug;

use crate::buffer::PacketBuffer;
use crate::forward::{self, FibResolver};
use crate::ip::IpProto;
use crate::stats::{StatsCollector, Verdict};
use crate::tables::{DeviceTable, RedirectTable};
use crate::vlan;
use crate::wire::ethernet::{
    self, is_vlan_proto, EthernetHdr, Mac, ETHERTYPE_IPV4, ETHERTYPE_IPV6,
};
use crate::wire::icmp::{
    self, ICMPV6_ECHO_REPLY, ICMPV6_ECHO_REQUEST, ICMP_ECHO_REPLY, ICMP_ECHO_REQUEST,
};
use crate::wire::ipv4::Ipv4Hdr;
use crate::wire::ipv6::Ipv6Hdr;
use crate::wire::util::{header_at, header_at_mut, HeaderCursor};
use crate::wire::{ipv4, ipv6, tcp, udp};

/// Baseline program: pass everything.
pub fn pass(buf: &mut PacketBuffer, stats: &StatsCollector) -> Verdict {
    stats.record(Verdict::Pass, buf.len() as u64)
}

/// Classify ICMP/ICMPv6 echo requests and drop the even-numbered ones.
///
/// Walks Ethernet (including stacked VLAN tags), then IPv4 or IPv6, then
/// the ICMP echo header, and drops echo requests whose sequence number is
/// even. Everything else, including anything that fails to parse, is
/// passed up the stack.
pub fn packet_parser(buf: &mut PacketBuffer, stats: &StatsCollector) -> Verdict {
    let verdict = classify(buf);
    stats.record(verdict, buf.len() as u64)
}

fn classify(buf: &mut PacketBuffer) -> Verdict {
    let data = buf.data();
    let mut cursor = HeaderCursor::new();

    let (_, ethertype) = match ethernet::parse(&mut cursor, data) {
        Ok(parsed) => parsed,
        Err(_) => return Verdict::Pass,
    };

    let sequence = if ethertype == ETHERTYPE_IPV4 {
        let proto = match ipv4::parse(&mut cursor, data) {
            Ok((_, proto)) => proto,
            Err(_) => return Verdict::Pass,
        };
        if proto != IpProto::Icmp as u8 {
            return Verdict::Pass;
        }
        let (offset, msg_type) = match icmp::parse(&mut cursor, data) {
            Ok(parsed) => parsed,
            Err(_) => return Verdict::Pass,
        };
        if msg_type != ICMP_ECHO_REQUEST {
            return Verdict::Pass;
        }
        match header_at::<icmp::IcmpHdr>(data, offset) {
            Some(hdr) => hdr.sequence(),
            None => return Verdict::Pass,
        }
    } else if ethertype == ETHERTYPE_IPV6 {
        let next_hdr = match ipv6::parse(&mut cursor, data) {
            Ok((_, next_hdr)) => next_hdr,
            Err(_) => return Verdict::Pass,
        };
        if next_hdr != IpProto::Icmpv6 as u8 {
            return Verdict::Pass;
        }
        let (offset, msg_type) = match icmp::parse_v6(&mut cursor, data) {
            Ok(parsed) => parsed,
            Err(_) => return Verdict::Pass,
        };
        if msg_type != ICMPV6_ECHO_REQUEST {
            return Verdict::Pass;
        }
        match header_at::<icmp::IcmpHdr>(data, offset) {
            Some(hdr) => hdr.sequence(),
            None => return Verdict::Pass,
        }
    } else {
        return Verdict::Pass;
    };

    if sequence % 2 == 0 {
        Verdict::Drop
    } else {
        Verdict::Pass
    }
}

/// Walk to the transport header and let its parser apply the
/// destination-port decrement.
pub fn port_rewrite(buf: &mut PacketBuffer, stats: &StatsCollector) -> Verdict {
    rewrite_transport_port(buf);
    stats.record(Verdict::Pass, buf.len() as u64)
}

fn rewrite_transport_port(buf: &mut PacketBuffer) {
    let data = buf.data_mut();
    let mut cursor = HeaderCursor::new();

    let ethertype = match ethernet::parse(&mut cursor, data) {
        Ok((_, ethertype)) => ethertype,
        Err(_) => return,
    };

    let proto = if ethertype == ETHERTYPE_IPV4 {
        match ipv4::parse(&mut cursor, data) {
            Ok((_, proto)) => proto,
            Err(_) => return,
        }
    } else if ethertype == ETHERTYPE_IPV6 {
        match ipv6::parse(&mut cursor, data) {
            Ok((_, next_hdr)) => next_hdr,
            Err(_) => return,
        }
    } else {
        return;
    };

    // The transport parsers mutate in place; a truncated header leaves
    // the packet untouched.
    if proto == IpProto::Tcp as u8 {
        let _ = tcp::parse(&mut cursor, data);
    } else if proto == IpProto::Udp as u8 {
        let _ = udp::parse(&mut cursor, data);
    }
}

/// Pop the outermost VLAN tag if one is present, otherwise push a new one
/// with tag control information 1.
pub fn vlan_swap(buf: &mut PacketBuffer, stats: &StatsCollector) -> Verdict {
    swap_vlan_tag(buf);
    stats.record(Verdict::Pass, buf.len() as u64)
}

fn swap_vlan_tag(buf: &mut PacketBuffer) {
    let tagged = {
        let mut cursor = HeaderCursor::new();
        match ethernet::parse(&mut cursor, buf.data()) {
            Ok(_) => match header_at::<EthernetHdr>(buf.data(), 0) {
                Some(eth) => is_vlan_proto(eth.ethertype()),
                None => return,
            },
            Err(_) => return,
        }
    };

    let result = if tagged {
        vlan::pop(buf).map(|_| ())
    } else {
        vlan::push(buf, 1)
    };
    if let Err(err) = result {
        debug!("vlan swap left the frame alone: {}", err);
    }
}

/// Answer ICMP/ICMPv6 echo requests from the fast path.
///
/// Swaps the IP addresses and link-layer addresses, rewrites the echo type
/// to a reply with an incremental checksum update, and transmits the frame
/// back out the interface it arrived on.
pub fn icmp_echo(buf: &mut PacketBuffer, stats: &StatsCollector) -> Verdict {
    let verdict = build_echo_reply(buf);
    stats.record(verdict, buf.len() as u64)
}

fn build_echo_reply(buf: &mut PacketBuffer) -> Verdict {
    let data = buf.data_mut();
    let mut cursor = HeaderCursor::new();

    let (eth_offset, ethertype) = match ethernet::parse(&mut cursor, data) {
        Ok(parsed) => parsed,
        Err(_) => return Verdict::Pass,
    };

    // Parse down to the echo request, then swap the IP addresses; the IP
    // checksum is order-insensitive, so no patch is needed there.
    let (icmp_offset, reply_type) = if ethertype == ETHERTYPE_IPV4 {
        let (ip_offset, proto) = match ipv4::parse(&mut cursor, data) {
            Ok(parsed) => parsed,
            Err(_) => return Verdict::Pass,
        };
        if proto != IpProto::Icmp as u8 {
            return Verdict::Pass;
        }
        let (icmp_offset, msg_type) = match icmp::parse(&mut cursor, data) {
            Ok(parsed) => parsed,
            Err(_) => return Verdict::Pass,
        };
        if msg_type != ICMP_ECHO_REQUEST {
            return Verdict::Pass;
        }
        match header_at_mut::<Ipv4Hdr>(data, ip_offset) {
            Some(mut ip) => ip.swap_addrs(),
            None => return Verdict::Pass,
        };
        (icmp_offset, ICMP_ECHO_REPLY)
    } else if ethertype == ETHERTYPE_IPV6 {
        let (ip_offset, next_hdr) = match ipv6::parse(&mut cursor, data) {
            Ok(parsed) => parsed,
            Err(_) => return Verdict::Pass,
        };
        if next_hdr != IpProto::Icmpv6 as u8 {
            return Verdict::Pass;
        }
        let (icmp_offset, msg_type) = match icmp::parse_v6(&mut cursor, data) {
            Ok(parsed) => parsed,
            Err(_) => return Verdict::Pass,
        };
        if msg_type != ICMPV6_ECHO_REQUEST {
            return Verdict::Pass;
        }
        match header_at_mut::<Ipv6Hdr>(data, ip_offset) {
            Some(mut ip) => ip.swap_addrs(),
            None => return Verdict::Pass,
        };
        (icmp_offset, ICMPV6_ECHO_REPLY)
    } else {
        return Verdict::Pass;
    };

    match header_at_mut::<EthernetHdr>(data, eth_offset) {
        Some(mut eth) => eth.swap_macs(),
        None => return Verdict::Pass,
    };

    match header_at_mut::<icmp::IcmpHdr>(data, icmp_offset) {
        Some(mut hdr) => hdr.rewrite_type(reply_type),
        None => return Verdict::Pass,
    };

    Verdict::Transmit
}

/// Redirect every parseable frame to a fixed destination.
///
/// Rewrites the destination MAC to `dst_mac` and redirects out
/// `egress_ifindex`.
pub fn redirect(
    buf: &mut PacketBuffer,
    dst_mac: Mac,
    egress_ifindex: u32,
    stats: &StatsCollector,
) -> Verdict {
    let verdict = {
        let data = buf.data_mut();
        let mut cursor = HeaderCursor::new();
        match ethernet::parse(&mut cursor, data) {
            Ok((eth_offset, _)) => match header_at_mut::<EthernetHdr>(data, eth_offset) {
                Some(mut eth) => {
                    eth.set_dst_mac(dst_mac);
                    Verdict::Redirect(egress_ifindex)
                }
                None => Verdict::Pass,
            },
            Err(_) => Verdict::Pass,
        }
    };
    stats.record(verdict, buf.len() as u64)
}

/// Redirect frames by their source MAC.
///
/// The redirect table names, per source address, the destination MAC to
/// rewrite in; the egress device lives at slot 0 of the device table.
/// Unknown sources pass up the stack.
pub fn redirect_map(
    buf: &mut PacketBuffer,
    redirects: &RedirectTable,
    devices: &DeviceTable,
    stats: &StatsCollector,
) -> Verdict {
    let verdict = redirect_by_source(buf, redirects, devices);
    stats.record(verdict, buf.len() as u64)
}

fn redirect_by_source(
    buf: &mut PacketBuffer,
    redirects: &RedirectTable,
    devices: &DeviceTable,
) -> Verdict {
    let data = buf.data_mut();
    let mut cursor = HeaderCursor::new();

    let eth_offset = match ethernet::parse(&mut cursor, data) {
        Ok((eth_offset, _)) => eth_offset,
        Err(_) => return Verdict::Pass,
    };

    let src = match header_at::<EthernetHdr>(data, eth_offset) {
        Some(eth) => eth.src_mac(),
        None => return Verdict::Pass,
    };

    // Do we know where to redirect this frame?
    let dst = match redirects.lookup(src) {
        Some(dst) => dst,
        None => return Verdict::Pass,
    };

    match header_at_mut::<EthernetHdr>(data, eth_offset) {
        Some(mut eth) => eth.set_dst_mac(dst),
        None => return Verdict::Pass,
    };

    match devices.lookup(0) {
        Some(ifindex) => Verdict::Redirect(ifindex),
        None => {
            debug!("redirect: no egress device registered");
            Verdict::Pass
        }
    }
}

/// Forward IP packets by FIB lookup.
///
/// Reads the fixed Ethernet header (VLAN-tagged frames fall through as
/// unhandled EtherTypes), dispatches IPv4/IPv6 to the forwarding engine,
/// and maps a successful redirect through the device table. A frame too
/// short for its Ethernet or IP header is dropped here rather than passed:
/// this program owns its interfaces and a runt frame on them is garbage.
pub fn router<R: FibResolver>(
    buf: &mut PacketBuffer,
    ingress_ifindex: u32,
    fib: &R,
    devices: &DeviceTable,
    stats: &StatsCollector,
) -> Verdict {
    let verdict = route(buf, ingress_ifindex, fib, devices);
    stats.record(verdict, buf.len() as u64)
}

fn route<R: FibResolver>(
    buf: &mut PacketBuffer,
    ingress_ifindex: u32,
    fib: &R,
    devices: &DeviceTable,
) -> Verdict {
    let data = buf.data_mut();

    let ethertype = match header_at::<EthernetHdr>(data, 0) {
        Some(eth) => eth.ethertype(),
        None => return Verdict::Drop,
    };

    let decision = if ethertype == ETHERTYPE_IPV4 {
        forward::forward_ipv4(data, 0, EthernetHdr::SIZE, ingress_ifindex, fib)
    } else if ethertype == ETHERTYPE_IPV6 {
        forward::forward_ipv6(data, 0, EthernetHdr::SIZE, ingress_ifindex, fib)
    } else {
        return Verdict::Pass;
    };

    match decision {
        Ok(Verdict::Redirect(index)) => match devices.lookup(index) {
            Some(ifindex) => Verdict::Redirect(ifindex),
            None => {
                debug!("router: no egress device for index {}", index);
                Verdict::Pass
            }
        },
        Ok(verdict) => verdict,
        // Too short for the IP header it claims to carry.
        Err(_) => Verdict::Drop,
    }
}
