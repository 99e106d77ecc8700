// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! HWID-based packet routing: `dest_from_hwid` plus the fixed
//! `[src][dst]` routing-action matrix and the per-destination outbound
//! interface table. Transcribed verbatim from the original firmware's
//! `routing.c` rather than re-derived from prose, so the policy (which
//! destinations may talk to which) matches exactly.

use comms_kernel::hwid::{Destination, NUM_DESTS};
use comms_kernel::hwid::HwId;

pub use comms_kernel::hwid::dest_from_hwid;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoutingAction {
    Drop,
    Forward,
    Handle,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interface {
    Uart,
    Spi,
    Rf,
    Invalid,
}

// [src][dst], order {Obc, Comms, Gs1, Gs2, Aro, LocalDebug}.
const ROUTING_TABLE: [[RoutingAction; NUM_DESTS]; NUM_DESTS] = {
    use RoutingAction::{Drop as D, Forward as F, Handle as H};
    [
        [F, H, F, F, F, F], // Obc
        [D, D, D, D, D, D], // Comms (self never originates traffic)
        [F, H, F, F, D, F], // Gs1
        [F, H, F, F, D, F], // Gs2
        [F, D, D, D, D, D], // Aro (may only reach Obc)
        [F, H, F, F, D, F], // LocalDebug
    ]
};

const DEST_INTERFACE_TABLE: [Interface; NUM_DESTS] = [
    Interface::Spi,     // Obc
    Interface::Invalid, // Comms
    Interface::Rf,      // Gs1
    Interface::Rf,      // Gs2
    Interface::Rf,      // Aro
    Interface::Uart,    // LocalDebug
];

pub fn routing_action(src: Destination, dst: Destination) -> RoutingAction {
    match (src.table_index(), dst.table_index()) {
        (Some(s), Some(d)) => ROUTING_TABLE[s][d],
        _ => RoutingAction::Drop,
    }
}

pub fn interface_of(dst: Destination) -> Interface {
    match dst.table_index() {
        Some(d) => DEST_INTERFACE_TABLE[d],
        None => Interface::Invalid,
    }
}

/// The outcome of a routing decision for one inbound packet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RouteDecision {
    Drop,
    Forward(Interface),
    Handle,
}

/// Routes an inbound packet given its source and destination HWID and
/// this unit's own HWID. `dst == self_hwid` is handled before consulting
/// the matrix at all, matching the original's override ("pass to command
/// dispatcher regardless of what the table says").
pub fn route(src_hwid: HwId, dst_hwid: HwId, self_hwid: HwId) -> RouteDecision {
    if dst_hwid == self_hwid {
        return RouteDecision::Handle;
    }
    let src = dest_from_hwid(src_hwid, self_hwid);
    let dst = dest_from_hwid(dst_hwid, self_hwid);
    if src == Destination::Invalid || dst == Destination::Invalid {
        return RouteDecision::Drop;
    }
    match routing_action(src, dst) {
        RoutingAction::Drop => RouteDecision::Drop,
        RoutingAction::Handle => RouteDecision::Handle,
        RoutingAction::Forward => {
            let iface = interface_of(dst);
            if iface == Interface::Invalid {
                RouteDecision::Drop
            } else {
                RouteDecision::Forward(iface)
            }
        }
    }
}

/// 16-bit per-destination outbound sequence counters ("Sequence
/// counter" in the data model): advanced only when COMMS itself
/// originates a packet toward a destination, never consulted on
/// receive -- RX replay defense is the authenticator's timestamp
/// window, not this counter. A reply packet reuses the request's own
/// sequence number (`CommandHeader::reply_to`) and does not touch this
/// table.
pub struct SequenceCounters {
    next: [u16; NUM_DESTS],
}

impl SequenceCounters {
    pub const fn new() -> Self {
        SequenceCounters { next: [0; NUM_DESTS] }
    }

    /// Returns the sequence number to use for the next packet COMMS
    /// sends to `dest`, and advances the counter. Wraps modulo 2^15 --
    /// bit 15 is the reply flag in `CommandHeader` and is never part of
    /// this counter.
    pub fn next_for(&mut self, dest: Destination) -> Option<u16> {
        let i = dest.table_index()?;
        let seq = self.next[i];
        self.next[i] = seq.wrapping_add(1) & 0x7fff;
        Some(seq)
    }
}

impl Default for SequenceCounters {
    fn default() -> Self {
        Self::new()
    }
}
