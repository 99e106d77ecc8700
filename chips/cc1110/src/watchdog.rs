// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! The CC1110's watchdog timer (WDCTL), used by the bootloader's ~1 s
//! reset-on-stall guard and the application's `REBOOT` command.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

register_bitfields![u8,
    pub WDCTL [
        EN OFFSET(3) NUMBITS(1) [],
        MODE OFFSET(2) NUMBITS(1) [
            Watchdog = 0,
            Timer = 1,
        ],
        INT OFFSET(0) NUMBITS(2) [
            Period1s = 0b11,
            Period250ms = 0b10,
            Period62ms = 0b01,
            Period16ms = 0b00,
        ],
    ],
];

register_structs! {
    pub Cc1110WatchdogRegisters {
        (0x000 => wdctl: ReadWrite<u8, WDCTL::Register>),
        (0x001 => @END),
    }
}

use comms_kernel::hil::watchdog::Watchdog;

/// Wraps the WDCTL special-function register. `regs` is a raw pointer
/// to the register rather than a `StaticRef` so this type stays
/// constructible in `#[cfg(test)]` against a plain `Cc1110WatchdogRegisters`
/// value on the stack.
pub struct Cc1110Watchdog {
    regs: *const Cc1110WatchdogRegisters,
}

impl Cc1110Watchdog {
    /// # Safety
    /// `regs` must point at the chip's real WDCTL register for the
    /// lifetime of this value.
    pub const unsafe fn new(regs: *const Cc1110WatchdogRegisters) -> Self {
        Cc1110Watchdog { regs }
    }

    fn regs(&self) -> &Cc1110WatchdogRegisters {
        unsafe { &*self.regs }
    }
}

impl Watchdog for Cc1110Watchdog {
    fn set_period_ms(&self, period_ms: u32) {
        let interval = if period_ms >= 1000 {
            WDCTL::INT::Period1s
        } else if period_ms >= 250 {
            WDCTL::INT::Period250ms
        } else if period_ms >= 62 {
            WDCTL::INT::Period62ms
        } else {
            WDCTL::INT::Period16ms
        };
        self.regs().wdctl.write(WDCTL::EN::SET + WDCTL::MODE::Watchdog + interval);
    }

    fn feed(&self) {
        // Clearing then resetting WDCTL.EN reloads the countdown; this
        // is the chip's documented "kick" sequence. `modify` preserves
        // the interval bits already configured by `set_period_ms`.
        self.regs().wdctl.modify(WDCTL::EN::CLEAR);
        self.regs().wdctl.modify(WDCTL::EN::SET);
    }

    fn disable(&self) {
        self.regs().wdctl.modify(WDCTL::EN::CLEAR);
    }
}

// Safety: `regs` points at MMIO, not at Rust-aliased memory; access is
// single-threaded cooperative per `comms_cells`' concurrency model.
unsafe impl Sync for Cc1110Watchdog {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_regs() -> Cc1110WatchdogRegisters {
        Cc1110WatchdogRegisters { wdctl: ReadWrite::new(0) }
    }

    #[test]
    fn set_period_enables_with_matching_interval_field() {
        let regs = test_regs();
        let wdt = unsafe { Cc1110Watchdog::new(&regs) };
        wdt.set_period_ms(1000);
        assert!(regs.wdctl.is_set(WDCTL::EN));
        assert_eq!(regs.wdctl.read(WDCTL::INT), 0b11);
    }

    #[test]
    fn disable_clears_enable_bit() {
        let regs = test_regs();
        let wdt = unsafe { Cc1110Watchdog::new(&regs) };
        wdt.set_period_ms(1000);
        wdt.disable();
        assert!(!regs.wdctl.is_set(WDCTL::EN));
    }
}
