// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Watchdog timer control, used by the bootloader's command loop
//! (extend the timeout on every valid command, shorten it once an
//! end-of-image marker has been accepted) and by the application's
//! `REBOOT` command.

/// A hardware watchdog timer. `feed` restarts the countdown at whatever
/// period was last configured with `set_period_ms`; expiry resets the
/// chip. There is no callback -- a watchdog that could notify you before
/// firing would defeat its purpose as a last-resort recovery mechanism.
pub trait Watchdog {
    fn set_period_ms(&self, period_ms: u32);
    fn feed(&self);
    fn disable(&self);
}
