// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Raw radio-register snapshot/apply, backing `GET/SET/RESET_RADIOTELEM`.
//! The register layout itself (PKTCTRL, MDMCFG, FREQ, the RF front-end
//! select byte) is chip-specific and out of scope here; this crate only
//! moves an opaque fixed-size blob of them back and forth so the command
//! dispatcher never needs to know their meaning, matching the original
//! firmware's `radiotelem_t` being a flat struct of raw register values.

/// `radiotelem_t` is 13 `u16` registers plus one `u8` front-end-select
/// byte in the original firmware.
pub const RADIOTELEM_LEN: usize = 13 * 2 + 1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RadioTelem(pub [u8; RADIOTELEM_LEN]);

impl RadioTelem {
    pub const fn zeroed() -> Self {
        RadioTelem([0u8; RADIOTELEM_LEN])
    }
}

impl Default for RadioTelem {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Chip-level access to the radio's configuration registers. Implemented
/// by the chip crate; the command dispatcher only snapshots, applies, or
/// resets -- it never interprets individual fields.
pub trait RadioRegisters {
    fn snapshot(&self) -> RadioTelem;
    fn apply(&self, telem: &RadioTelem);
    fn reset_to_default(&self);
}
