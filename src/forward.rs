// Copyright 2018 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Forwarding decisions.
//!
//! The engine builds a [`RouteLookupKey`] from a parsed IP header, hands
//! it to an injected [`FibResolver`], and maps the resolution to a
//! [`Verdict`]. The mapping is total: every [`ForwardingOutcome`] produces
//! exactly one verdict, and a successful resolution also rewrites the
//! frame in place (TTL or hop-limit decrement, link-layer addresses from
//! the resolved next hop).

use log::debug;

use crate::ip::{IpAddress, IpVersion};
use crate::stats::Verdict;
use crate::wire::ethernet::{EthernetHdr, Mac};
use crate::wire::ipv4::Ipv4Hdr;
use crate::wire::ipv6::Ipv6Hdr;
use crate::wire::util::{header_at, header_at_mut, ParseError};

/// The key a route lookup is made with.
///
/// Built from the parsed IP header. The transport ports are carried for
/// the resolver's benefit but are always zero: routing here is not
/// transport-aware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLookupKey {
    pub l4_protocol: u8,
    pub tot_len: u16,
    /// The IPv4 type-of-service byte; zero for IPv6.
    pub tos: u8,
    /// The IPv6 traffic class and flow label; zero for IPv4.
    pub flow_info: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub src: IpAddress,
    pub dst: IpAddress,
}

impl RouteLookupKey {
    pub fn for_ipv4(ip: &Ipv4Hdr) -> RouteLookupKey {
        RouteLookupKey {
            l4_protocol: ip.proto(),
            tot_len: ip.total_length(),
            tos: ip.tos(),
            flow_info: 0,
            src_port: 0,
            dst_port: 0,
            src: IpAddress::V4(ip.src_ip()),
            dst: IpAddress::V4(ip.dst_ip()),
        }
    }

    pub fn for_ipv6(ip: &Ipv6Hdr) -> RouteLookupKey {
        RouteLookupKey {
            l4_protocol: ip.next_hdr(),
            tot_len: ip.payload_len(),
            tos: 0,
            flow_info: ip.flow_info(),
            src_port: 0,
            dst_port: 0,
            src: IpAddress::V6(ip.src_ip()),
            dst: IpAddress::V6(ip.dst_ip()),
        }
    }

    /// The address family the lookup is for.
    pub fn family(&self) -> IpVersion {
        self.src.version()
    }
}

/// The resolution of a route lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardingOutcome {
    /// A route and next-hop neighbor exist: forward out `ifindex` with the
    /// given link-layer addresses.
    Success {
        ifindex: u32,
        src_mac: Mac,
        dst_mac: Mac,
    },
    /// The destination is blackholed.
    Blackhole,
    /// The destination is unreachable.
    Unreachable,
    /// The destination is administratively prohibited.
    Prohibited,
    /// The packet is not to be forwarded.
    NotForwarded,
    /// Forwarding is not enabled on the ingress interface.
    ForwardingDisabled,
    /// The route requires an encapsulation this path does not support.
    UnsupportedEncap,
    /// No neighbor entry exists for the next hop.
    NoNeighbor,
    /// The packet would need fragmenting to fit the egress MTU.
    FragmentationNeeded,
}

/// A forwarding information base.
///
/// Resolution must not block: implementations are expected to answer from
/// tables that are already in memory.
pub trait FibResolver {
    fn resolve(&self, key: &RouteLookupKey, ingress_ifindex: u32) -> ForwardingOutcome;
}

/// Decide the fate of a parsed IPv4 packet.
///
/// `eth_offset`/`ip_offset` locate the already-parsed headers in `data`.
/// A TTL of 1 or less yields [`Verdict::Pass`] before the resolver is
/// consulted: such a packet belongs to the normal stack, which will
/// generate the right error, not to the fast path.
pub fn forward_ipv4<R: FibResolver>(
    data: &mut [u8],
    eth_offset: usize,
    ip_offset: usize,
    ingress_ifindex: u32,
    fib: &R,
) -> Result<Verdict, ParseError> {
    let key = {
        let ip = header_at::<Ipv4Hdr>(data, ip_offset).ok_or(ParseError::Truncated)?;
        if ip.ttl() <= 1 {
            return Ok(Verdict::Pass);
        }
        RouteLookupKey::for_ipv4(&ip)
    };

    let outcome = fib.resolve(&key, ingress_ifindex);
    if let ForwardingOutcome::Success { .. } = outcome {
        let mut ip = header_at_mut::<Ipv4Hdr>(data, ip_offset).ok_or(ParseError::Truncated)?;
        ip.decrement_ttl();
    }
    apply_outcome(data, eth_offset, outcome)
}

/// Decide the fate of a parsed IPv6 packet.
///
/// The hop-limit rule mirrors [`forward_ipv4`]'s TTL rule.
pub fn forward_ipv6<R: FibResolver>(
    data: &mut [u8],
    eth_offset: usize,
    ip_offset: usize,
    ingress_ifindex: u32,
    fib: &R,
) -> Result<Verdict, ParseError> {
    let key = {
        let ip = header_at::<Ipv6Hdr>(data, ip_offset).ok_or(ParseError::Truncated)?;
        if ip.hop_limit() <= 1 {
            return Ok(Verdict::Pass);
        }
        RouteLookupKey::for_ipv6(&ip)
    };

    let outcome = fib.resolve(&key, ingress_ifindex);
    if let ForwardingOutcome::Success { .. } = outcome {
        let mut ip = header_at_mut::<Ipv6Hdr>(data, ip_offset).ok_or(ParseError::Truncated)?;
        ip.decrement_hop_limit();
    }
    apply_outcome(data, eth_offset, outcome)
}

// The outcome-to-verdict map. Total over ForwardingOutcome; a new outcome
// variant must be placed in exactly one arm before this compiles again.
fn apply_outcome(
    data: &mut [u8],
    eth_offset: usize,
    outcome: ForwardingOutcome,
) -> Result<Verdict, ParseError> {
    match outcome {
        ForwardingOutcome::Success {
            ifindex,
            src_mac,
            dst_mac,
        } => {
            let mut eth =
                header_at_mut::<EthernetHdr>(data, eth_offset).ok_or(ParseError::Truncated)?;
            eth.set_src_mac(src_mac);
            eth.set_dst_mac(dst_mac);
            debug!("fib: forwarding out ifindex {}", ifindex);
            Ok(Verdict::Redirect(ifindex))
        }
        ForwardingOutcome::Blackhole
        | ForwardingOutcome::Unreachable
        | ForwardingOutcome::Prohibited => Ok(Verdict::Drop),
        ForwardingOutcome::NotForwarded
        | ForwardingOutcome::ForwardingDisabled
        | ForwardingOutcome::UnsupportedEncap
        | ForwardingOutcome::NoNeighbor
        | ForwardingOutcome::FragmentationNeeded => Ok(Verdict::Pass),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use byteorder::{BigEndian, ByteOrder};

    use crate::ip::IpProto;
    use crate::wire::ethernet::ETHERTYPE_IPV4;
    use crate::wire::util::checksum;

    struct FixedFib {
        outcome: ForwardingOutcome,
        calls: Cell<usize>,
    }

    impl FixedFib {
        fn new(outcome: ForwardingOutcome) -> FixedFib {
            FixedFib {
                outcome,
                calls: Cell::new(0),
            }
        }
    }

    impl FibResolver for FixedFib {
        fn resolve(&self, _key: &RouteLookupKey, _ingress_ifindex: u32) -> ForwardingOutcome {
            self.calls.set(self.calls.get() + 1);
            self.outcome
        }
    }

    fn ipv4_frame(ttl: u8) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[2, 0, 0, 0, 0, 1]);
        frame.extend_from_slice(&[2, 0, 0, 0, 0, 2]);
        frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
        let mut ip = vec![0u8; Ipv4Hdr::SIZE];
        ip[0] = 0x45;
        BigEndian::write_u16(&mut ip[2..4], Ipv4Hdr::SIZE as u16);
        ip[8] = ttl;
        ip[9] = IpProto::Udp as u8;
        ip[12..16].copy_from_slice(&[10, 0, 0, 1]);
        ip[16..20].copy_from_slice(&[10, 0, 1, 1]);
        frame.extend_from_slice(&ip);
        header_at_mut::<Ipv4Hdr>(&mut frame, EthernetHdr::SIZE)
            .unwrap()
            .set_checksum();
        frame
    }

    #[test]
    fn exhausted_ttl_passes_without_resolving() {
        let fib = FixedFib::new(ForwardingOutcome::Blackhole);
        let mut frame = ipv4_frame(1);
        let verdict = forward_ipv4(&mut frame, 0, EthernetHdr::SIZE, 3, &fib).unwrap();
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(fib.calls.get(), 0);
    }

    #[test]
    fn success_rewrites_and_redirects() {
        let src_mac = Mac::new([0x02, 0, 0, 0, 0, 0xAA]);
        let dst_mac = Mac::new([0x02, 0, 0, 0, 0, 0xBB]);
        let fib = FixedFib::new(ForwardingOutcome::Success {
            ifindex: 7,
            src_mac,
            dst_mac,
        });
        let mut frame = ipv4_frame(64);
        let verdict = forward_ipv4(&mut frame, 0, EthernetHdr::SIZE, 3, &fib).unwrap();
        assert_eq!(verdict, Verdict::Redirect(7));
        assert_eq!(fib.calls.get(), 1);

        let eth = header_at::<EthernetHdr>(&frame, 0).unwrap();
        assert_eq!(eth.src_mac(), src_mac);
        assert_eq!(eth.dst_mac(), dst_mac);
        let ip_bytes = &frame[EthernetHdr::SIZE..];
        let ip = header_at::<Ipv4Hdr>(ip_bytes, 0).unwrap();
        assert_eq!(ip.ttl(), 63);
        // The incremental TTL patch kept the header checksum valid.
        assert_eq!(checksum(ip_bytes), 0);
    }

    #[test]
    fn outcome_map_is_total() {
        let cases = [
            (ForwardingOutcome::Blackhole, Verdict::Drop),
            (ForwardingOutcome::Unreachable, Verdict::Drop),
            (ForwardingOutcome::Prohibited, Verdict::Drop),
            (ForwardingOutcome::NotForwarded, Verdict::Pass),
            (ForwardingOutcome::ForwardingDisabled, Verdict::Pass),
            (ForwardingOutcome::UnsupportedEncap, Verdict::Pass),
            (ForwardingOutcome::NoNeighbor, Verdict::Pass),
            (ForwardingOutcome::FragmentationNeeded, Verdict::Pass),
        ];
        for (outcome, expected) in cases {
            let fib = FixedFib::new(outcome);
            let mut frame = ipv4_frame(64);
            let verdict = forward_ipv4(&mut frame, 0, EthernetHdr::SIZE, 3, &fib).unwrap();
            assert_eq!(verdict, expected, "{:?}", outcome);
            // Nothing was rewritten on the non-success paths.
            let ip = header_at::<Ipv4Hdr>(&frame[EthernetHdr::SIZE..], 0).unwrap();
            assert_eq!(ip.ttl(), 64);
        }
    }

    #[test]
    fn key_is_built_from_the_header() {
        let frame = ipv4_frame(64);
        let ip = header_at::<Ipv4Hdr>(&frame[EthernetHdr::SIZE..], 0).unwrap();
        let key = RouteLookupKey::for_ipv4(&ip);
        assert_eq!(key.family(), IpVersion::V4);
        assert_eq!(key.l4_protocol, IpProto::Udp as u8);
        assert_eq!(key.tot_len, Ipv4Hdr::SIZE as u16);
        assert_eq!(key.src_port, 0);
        assert_eq!(key.dst_port, 0);
    }
}
