// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Low-level, hardware-adjacent primitives: CRC-16 (§4.2), the CBC-MAC
//! construction built on one `hil::AesEcb` block encrypt (§4.1), and the
//! two serial framers (§4.5). Everything in this crate is a pure
//! function or a small state machine over caller-owned buffers -- no
//! routing or authentication policy lives here, only the building blocks
//! `capsules_extra` composes.

#![no_std]

pub mod cbc_mac;
pub mod crc16;
pub mod serial_framer;
pub mod soft_aes;
