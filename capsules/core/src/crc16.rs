// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! CRC-16 over an arbitrary byte range -- the outermost integrity check
//! on every RF packet, covering the length byte through the MAC field
//! but excluding the CRC field itself. Built on the `crc` crate rather
//! than a hand-rolled table, the same way `other_examples`' bootloader
//! reaches for `crc::{Crc, CRC_32_ISCSI}` instead of writing its own
//! polynomial loop.

use crc::{Crc, CRC_16_IBM_3740};

static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Computes the CRC-16 of `data`.
pub fn checksum(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Verifies `data` against an expected CRC-16 value.
pub fn verify(data: &[u8], expected: u16) -> bool {
    checksum(data) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_deterministic() {
        let data = b"comms flight firmware";
        assert_eq!(checksum(data), checksum(data));
    }

    #[test]
    fn single_bit_flip_changes_checksum() {
        let mut data = [0x01, 0x02, 0x03, 0x04, 0x05];
        let original = checksum(&data);
        data[2] ^= 0x01;
        assert_ne!(checksum(&data), original);
    }

    #[test]
    fn verify_roundtrips() {
        let data = [1u8, 2, 3, 4, 5, 6, 7];
        let crc = checksum(&data);
        assert!(verify(&data, crc));
        assert!(!verify(&data, crc.wrapping_add(1)));
    }

    #[test]
    fn empty_input_has_a_defined_checksum() {
        let _ = checksum(&[]);
    }
}
