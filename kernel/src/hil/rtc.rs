// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Real-time clock: a settable seconds-since-epoch counter, backing
//! `GET_TIME`/`SET_TIME` and the authenticator's timestamp window check.

/// Unix-style seconds-since-epoch clock. `is_set` distinguishes "reads as
/// zero because it really is the epoch" from "reads as zero because
/// nothing has ever set it" -- the authenticator only enforces its
/// timestamp window once `is_set()` is true, matching the original
/// firmware's `rtc_set` guard.
pub trait Rtc {
    fn get_time(&self) -> u32;
    fn set_time(&self, seconds: u32);
    fn is_set(&self) -> bool;
}
