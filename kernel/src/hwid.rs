// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Hardware-ID address space and the destinations it maps to.
//!
//! The ranges below are transcribed from the flight firmware's
//! `hwid.h`: every packet on the bus (UART, SPI, or RF) carries a 16-bit
//! source and destination HWID, and every HWID falls into exactly one of
//! the ranges here or is `Invalid`. `Comms` (this unit) is not a fixed
//! range -- it is the single HWID value read out of flash at
//! provisioning time, so `dest_from_hwid` takes it as an explicit
//! argument rather than consulting hidden state, keeping it the pure
//! function the router module requires.

/// A 16-bit hardware address, as carried on the wire.
pub type HwId = u16;

/// The logical endpoints a packet can be addressed to or from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Destination {
    Obc,
    Comms,
    Gs1,
    Gs2,
    Aro,
    LocalDebug,
    Invalid,
}

/// Number of real (non-`Invalid`) destinations, used to size routing and
/// per-destination sequence-number tables.
pub const NUM_DESTS: usize = 6;

impl Destination {
    /// Index into `NUM_DESTS`-sized tables (`Invalid` has no slot and must
    /// never be looked up this way).
    pub fn table_index(self) -> Option<usize> {
        match self {
            Destination::Obc => Some(0),
            Destination::Comms => Some(1),
            Destination::Gs1 => Some(2),
            Destination::Gs2 => Some(3),
            Destination::Aro => Some(4),
            Destination::LocalDebug => Some(5),
            Destination::Invalid => None,
        }
    }
}

const HWID_OBC_START: HwId = 0x7000;
const HWID_OBC_END: HwId = 0x701F;
const HWID_GS1_START: HwId = 0x8000;
const HWID_GS1_END: HwId = 0x801F;
const HWID_GS2_START: HwId = 0x8020;
const HWID_GS2_END: HwId = 0x803F;
const HWID_ARO_START: HwId = 0xE000;
const HWID_ARO_END: HwId = 0xEFFF;
const HWID_LOCAL: HwId = 0xFFFF;

/// Resolves a raw HWID to the destination it names. `self_hwid` is this
/// unit's own provisioned HWID (read once from flash at boot); it is
/// checked before the fixed ranges since a unit's own HWID would
/// otherwise fall outside every range here.
pub fn dest_from_hwid(id: HwId, self_hwid: HwId) -> Destination {
    if id == self_hwid {
        return Destination::Comms;
    }
    match id {
        HWID_OBC_START..=HWID_OBC_END => Destination::Obc,
        HWID_GS1_START..=HWID_GS1_END => Destination::Gs1,
        HWID_GS2_START..=HWID_GS2_END => Destination::Gs2,
        HWID_ARO_START..=HWID_ARO_END => Destination::Aro,
        HWID_LOCAL => Destination::LocalDebug,
        _ => Destination::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF_HWID: HwId = 0x7005;

    #[test]
    fn obc_range_resolves() {
        assert_eq!(dest_from_hwid(0x7000, SELF_HWID), Destination::Obc);
        assert_eq!(dest_from_hwid(0x701f, SELF_HWID), Destination::Obc);
        assert_eq!(dest_from_hwid(0x7020, SELF_HWID), Destination::Invalid);
    }

    #[test]
    fn gs_ranges_are_distinct() {
        assert_eq!(dest_from_hwid(0x8000, SELF_HWID), Destination::Gs1);
        assert_eq!(dest_from_hwid(0x801f, SELF_HWID), Destination::Gs1);
        assert_eq!(dest_from_hwid(0x8020, SELF_HWID), Destination::Gs2);
        assert_eq!(dest_from_hwid(0x803f, SELF_HWID), Destination::Gs2);
        assert_eq!(dest_from_hwid(0x8040, SELF_HWID), Destination::Invalid);
    }

    #[test]
    fn aro_and_local() {
        assert_eq!(dest_from_hwid(0xe000, SELF_HWID), Destination::Aro);
        assert_eq!(dest_from_hwid(0xefff, SELF_HWID), Destination::Aro);
        assert_eq!(dest_from_hwid(0xffff, SELF_HWID), Destination::LocalDebug);
    }

    #[test]
    fn self_hwid_overrides_its_containing_range() {
        assert_eq!(dest_from_hwid(SELF_HWID, SELF_HWID), Destination::Comms);
        assert_eq!(dest_from_hwid(0x7006, SELF_HWID), Destination::Obc);
    }
}
