// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! A software `hil::AesEcb` backed by the RustCrypto `aes` crate, for
//! chips with no crypto coprocessor (or for host-side tests). Grounded on
//! the wider example pack's use of `aes = "0.8"` in a `no_std` kernel
//! workspace (`other_examples/darkfireeee-Exo-OS`) rather than a
//! hand-written S-box table.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes128;

use comms_kernel::hil::aes_ecb::{AesEcb, BLOCK_LEN, KEY_LEN};
use comms_kernel::ErrorCode;

pub struct SoftAesEcb {
    cipher: Option<Aes128>,
}

impl SoftAesEcb {
    pub const fn new() -> Self {
        SoftAesEcb { cipher: None }
    }
}

impl Default for SoftAesEcb {
    fn default() -> Self {
        Self::new()
    }
}

impl AesEcb for SoftAesEcb {
    fn set_key(&mut self, key: &[u8; KEY_LEN]) {
        self.cipher = Some(Aes128::new(key.into()));
    }

    fn encrypt_block(&mut self, block: &mut [u8; BLOCK_LEN]) -> Result<(), ErrorCode> {
        let cipher = self.cipher.as_ref().ok_or(ErrorCode::Off)?;
        cipher.encrypt_block(block.into());
        Ok(())
    }
}
