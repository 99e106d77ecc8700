// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Policy capsules built on `comms_kernel`'s `hil` traits and
//! `comms_capsules_core`'s wire primitives: HWID-based routing, CBC-MAC
//! packet authentication, the opcode-indexed command dispatcher, and the
//! two link layers (RF and local-bus) that tie the rest together.

#![no_std]

pub mod authenticator;
pub mod command_dispatcher;
pub mod local_link;
pub mod radio_link;
pub mod router;
