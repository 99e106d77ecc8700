// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! The signed-image verifier the bootloader consults before jumping to
//! the application: CBC-MAC of the application flash region under each
//! of up to `MAX_KEYS` signature keys, compared in constant time against
//! the signature stored just below the end of the region. The image is
//! valid if *any* key's MAC matches.
//!
//! This crate has no dependency on `comms-kernel` or the application
//! workspace -- the bootloader is flashed and updated independently of
//! the application image it verifies, so its trust base has to stand on
//! its own.

#![no_std]

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;
use subtle::ConstantTimeEq;

pub const BLOCK_LEN: usize = 16;
pub const KEY_LEN: usize = 16;
pub const MAX_KEYS: usize = 3;

/// Application code region: `0x0400..0x6BF0` (§6 flash layout). Fixed
/// for this design, not per-board -- the bootloader, updater, and
/// verifier all agree on it.
pub const APP_REGION_LEN: usize = 0x6bf0 - 0x0400;

static_assertions::const_assert_eq!(APP_REGION_LEN % BLOCK_LEN, 0);

/// Computes CBC-MAC(key, data) with a zero IV, zero-padding a trailing
/// partial block. Same construction as the application's packet
/// authenticator (§4.1), reimplemented here rather than shared because
/// this crate cannot depend on the application workspace.
fn cbc_mac(key: &[u8; KEY_LEN], data: &[u8]) -> [u8; BLOCK_LEN] {
    let cipher = Aes128::new(key.into());
    let mut mac = [0u8; BLOCK_LEN];
    let mut chunks = data.chunks_exact(BLOCK_LEN);

    for chunk in &mut chunks {
        for (m, b) in mac.iter_mut().zip(chunk.iter()) {
            *m ^= b;
        }
        cipher.encrypt_block((&mut mac).into());
    }

    let remainder = chunks.remainder();
    if !remainder.is_empty() {
        let mut padded = [0u8; BLOCK_LEN];
        padded[..remainder.len()].copy_from_slice(remainder);
        for (m, b) in mac.iter_mut().zip(padded.iter()) {
            *m ^= b;
        }
        cipher.encrypt_block((&mut mac).into());
    }

    mac
}

/// Up to `MAX_KEYS` signature keys read out of flash. Unused key slots
/// are all-zero; `verify` tries every populated slot regardless of
/// whether an earlier one already matched, so verification time does
/// not leak which key (if any) signed the image.
pub struct KeySet {
    keys: [[u8; KEY_LEN]; MAX_KEYS],
    populated: [bool; MAX_KEYS],
}

impl KeySet {
    pub fn new(keys: [[u8; KEY_LEN]; MAX_KEYS], populated: [bool; MAX_KEYS]) -> Self {
        KeySet { keys, populated }
    }

    /// Computes the application region's CBC-MAC under each populated
    /// key and compares it against `signature` in constant time. All
    /// populated keys are checked even after a match is found.
    pub fn verify(&self, app_region: &[u8], signature: &[u8; BLOCK_LEN]) -> bool {
        let mut any_match = subtle::Choice::from(0u8);
        for (key, &populated) in self.keys.iter().zip(self.populated.iter()) {
            if !populated {
                continue;
            }
            let mac = cbc_mac(key, app_region);
            any_match |= mac.ct_eq(signature);
        }
        any_match.into()
    }
}

/// The updater command loop the bootloader's power-on sequence enters
/// after init: a fixed opcode set, a soft timeout that a valid command
/// extends, and the end-of-image marker that triggers verification.
/// Hardware-agnostic -- `UpdaterPlatform` is the seam the board crate's
/// flash/watchdog drivers sit behind, grounded on §4.9.
pub mod updater {
    use crate::{KeySet, APP_REGION_LEN, BLOCK_LEN};

    pub const PING: u8 = 0x00;
    pub const ACK: u8 = 0x01;
    pub const WRITE_PAGE: u8 = 0x02;
    pub const ERASE: u8 = 0x0c;
    pub const START: u8 = 0x0e;
    pub const NACK: u8 = 0x0f;

    pub const PAGE_LEN: usize = 128;
    pub const END_OF_IMAGE_PAGE: u8 = 255;

    /// "~45,000 main-loop ticks -- much less than one watchdog cycle's
    /// worth of command traffic." A session with no chatter for this
    /// many idle ticks gives up on the updater and stops refreshing the
    /// watchdog, letting the hardware reset bring it back here.
    pub const INITIAL_TIMEOUT_TICKS: u32 = 45_000;

    /// Short grace period between a validated end-of-image marker and
    /// the jump to the application, long enough to let the ACK reply
    /// actually get out over the wire first.
    pub const APP_FLASH_TIMEOUT_TICKS: u32 = 100;

    /// The board-specific hooks the updater's opcode handlers need.
    /// `app_region`/`app_signature` are direct flash reads -- on this
    /// chip family program flash is memory-mapped, so no DMA or async
    /// completion is needed to read it back for verification.
    pub trait UpdaterPlatform {
        fn feed_watchdog(&mut self);
        fn erase_app_region(&mut self) -> bool;
        fn write_page(&mut self, page: u8, data: &[u8; PAGE_LEN]) -> bool;
        fn app_region(&self) -> &[u8; APP_REGION_LEN];
        fn app_signature(&self) -> &[u8; BLOCK_LEN];
        fn keyset(&self) -> &KeySet;
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum UpdaterExit {
        /// Soft timeout expired with no end-of-image marker accepted.
        TimedOut,
        /// End-of-image marker accepted and the image verified; the
        /// caller should stop feeding commands and jump to the
        /// application once `APP_FLASH_TIMEOUT_TICKS` has elapsed.
        BootApp,
    }

    pub struct Updater<'a, P: UpdaterPlatform> {
        platform: &'a mut P,
        ticks_remaining: u32,
    }

    impl<'a, P: UpdaterPlatform> Updater<'a, P> {
        pub fn new(platform: &'a mut P) -> Self {
            Updater {
                platform,
                ticks_remaining: INITIAL_TIMEOUT_TICKS,
            }
        }

        /// Called once per main-loop iteration between received bytes.
        /// Returns `Some(TimedOut)` the iteration the soft timeout
        /// reaches zero; the caller should stop calling `tick_idle` and
        /// `handle_command` after that and let the hardware watchdog do
        /// the rest.
        pub fn tick_idle(&mut self) -> Option<UpdaterExit> {
            if self.ticks_remaining == 0 {
                return Some(UpdaterExit::TimedOut);
            }
            self.ticks_remaining -= 1;
            None
        }

        /// Handles one received updater command, writing the reply
        /// opcode and payload into `reply_out` (`reply_out[0]` is the
        /// opcode). Returns the reply length and, once the end-of-image
        /// marker validates, `Some(BootApp)`.
        pub fn handle_command(
            &mut self,
            opcode: u8,
            payload: &[u8],
            reply_out: &mut [u8],
        ) -> (usize, Option<UpdaterExit>) {
            self.platform.feed_watchdog();
            self.ticks_remaining = INITIAL_TIMEOUT_TICKS;

            match opcode {
                PING => {
                    reply_out[0] = ACK;
                    let pong = b"pong";
                    reply_out[1..1 + pong.len()].copy_from_slice(pong);
                    (1 + pong.len(), None)
                }
                ERASE => {
                    if self.platform.erase_app_region() {
                        reply_out[0] = ACK;
                        let msg = b"erased";
                        reply_out[1..1 + msg.len()].copy_from_slice(msg);
                        (1 + msg.len(), None)
                    } else {
                        reply_out[0] = NACK;
                        (1, None)
                    }
                }
                WRITE_PAGE => self.handle_write_page(payload, reply_out),
                _ => {
                    reply_out[0] = NACK;
                    (1, None)
                }
            }
        }

        fn handle_write_page(
            &mut self,
            payload: &[u8],
            reply_out: &mut [u8],
        ) -> (usize, Option<UpdaterExit>) {
            let Some(&page) = payload.first() else {
                reply_out[0] = NACK;
                return (1, None);
            };
            if page == END_OF_IMAGE_PAGE {
                return self.finish_image(reply_out);
            }
            if payload.len() < 1 + PAGE_LEN {
                reply_out[0] = NACK;
                return (1, None);
            }
            let mut data = [0u8; PAGE_LEN];
            data.copy_from_slice(&payload[1..1 + PAGE_LEN]);
            if self.platform.write_page(page, &data) {
                reply_out[0] = ACK;
                reply_out[1] = page;
                (2, None)
            } else {
                reply_out[0] = NACK;
                (1, None)
            }
        }

        fn finish_image(&mut self, reply_out: &mut [u8]) -> (usize, Option<UpdaterExit>) {
            let valid = self
                .platform
                .keyset()
                .verify(self.platform.app_region(), self.platform.app_signature());
            if valid {
                reply_out[0] = ACK;
                reply_out[1] = END_OF_IMAGE_PAGE;
                self.ticks_remaining = APP_FLASH_TIMEOUT_TICKS;
                (2, Some(UpdaterExit::BootApp))
            } else {
                reply_out[0] = NACK;
                (1, None)
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyset_with(keys: [[u8; KEY_LEN]; MAX_KEYS], populated: [bool; MAX_KEYS]) -> KeySet {
        KeySet::new(keys, populated)
    }

    #[test]
    fn image_valid_under_any_populated_key() {
        let image = [0xabu8; BLOCK_LEN * 4];
        let key0 = [0x11u8; KEY_LEN];
        let key1 = [0x22u8; KEY_LEN];
        let key2 = [0x33u8; KEY_LEN];
        let sig_under_key1 = cbc_mac(&key1, &image);

        let keyset = keyset_with([key0, key1, key2], [true, true, true]);
        assert!(keyset.verify(&image, &sig_under_key1));
    }

    #[test]
    fn image_invalid_when_no_key_matches() {
        let image = [0xabu8; BLOCK_LEN * 4];
        let keyset = keyset_with(
            [[0x11u8; KEY_LEN], [0x22u8; KEY_LEN], [0x33u8; KEY_LEN]],
            [true, true, true],
        );
        let bogus_signature = [0u8; BLOCK_LEN];
        assert!(!keyset.verify(&image, &bogus_signature));
    }

    #[test]
    fn unpopulated_key_slots_are_never_consulted() {
        let image = [0x44u8; BLOCK_LEN * 2];
        let real_key = [0x55u8; KEY_LEN];
        let sig = cbc_mac(&real_key, &image);

        // real_key sits in slot 1, but only slot 0 is marked populated.
        let keyset = keyset_with([[0u8; KEY_LEN], real_key, [0u8; KEY_LEN]], [true, false, false]);
        assert!(!keyset.verify(&image, &sig));
    }

    #[test]
    fn single_bit_flip_in_image_invalidates_signature() {
        let mut image = [0x66u8; BLOCK_LEN * 3];
        let key = [0x77u8; KEY_LEN];
        let sig = cbc_mac(&key, &image);
        image[BLOCK_LEN] ^= 0x01;

        let keyset = keyset_with([key, [0u8; KEY_LEN], [0u8; KEY_LEN]], [true, false, false]);
        assert!(!keyset.verify(&image, &sig));
    }

    #[test]
    fn trailing_partial_block_is_zero_padded_like_the_authenticator() {
        let key = [0x88u8; KEY_LEN];
        let mut exact = [0x99u8; BLOCK_LEN * 2];
        let partial = &exact[..BLOCK_LEN + 5];
        let mac_partial = cbc_mac(&key, partial);
        for b in exact[BLOCK_LEN + 5..].iter_mut() {
            *b = 0;
        }
        let mac_padded = cbc_mac(&key, &exact);
        assert_eq!(mac_partial, mac_padded);
    }
}
