// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Hardware Interface Layer: the traits chip crates implement and
//! capsules/board code programs against, in the teacher's `hil` tradition
//! (see e.g. its `hil::symmetric_encryption::AES128Ecb`). Every trait here
//! is a client/callback pair: a `set_client` registration plus a `Client`
//! trait the caller implements, because every one of these operations
//! completes asynchronously from an ISR rather than returning its result
//! inline.

pub mod aes_ecb;
pub mod flash;
pub mod gpio;
pub mod radio;
pub mod radio_regs;
pub mod rtc;
pub mod spi;
pub mod uart;
pub mod watchdog;
