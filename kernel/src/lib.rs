// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Core of the COMMS flight firmware: the hardware-interface traits
//! (`hil`), the wire data model (`packet`, `hwid`), the telemetry record,
//! and the scheduler loop that ties every interface together each main
//! loop iteration.
//!
//! # Concurrency model
//!
//! Single-threaded cooperative main loop, interrupted only by ISRs that
//! run to completion before returning (see `scheduler` module docs).
//! There is no preemption, no second thread, and no blocking primitive
//! besides `hil::radio::Radio::send_packet`'s documented busy-wait. Shared
//! state crossing the ISR/mainline boundary uses `comms_cells`, never a
//! lock.

#![no_std]

pub mod debug;
pub mod errorcode;
pub mod hil;
pub mod hwid;
pub mod packet;
pub mod scheduler;
pub mod telemetry;

pub use errorcode::ErrorCode;
pub use hwid::{Destination, HwId};
