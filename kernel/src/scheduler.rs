// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! The main-loop driver: one call to `Scheduler::poll` is one iteration of
//! the single-threaded cooperative loop, in the fixed order the original
//! firmware's `main()` loop uses. Everything that can be interrupted by an
//! ISR goes through `comms_cells` rather than being touched here twice --
//! see the crate-level docs for the concurrency model this relies on.

use crate::hil::gpio::{GpioPin, PinState};
use crate::hil::watchdog::Watchdog;

/// One inbound source the scheduler polls each iteration, in priority
/// order. A source returns `true` if it had work to do this poll (used
/// only for test assertions; the scheduler always polls every source
/// regardless).
pub trait PollSource {
    fn poll(&self) -> bool;
}

/// Reboot scheduling state, set by the `REBOOT` command handler and
/// consumed here. `postpone_seconds` of `0` means "immediately"; the
/// dispatcher is responsible for capping the requested delay at
/// `AUTO_REBOOT_MAX` before constructing this.
#[derive(Copy, Clone, Debug)]
pub struct ScheduledReboot {
    pub fire_at_uptime: u32,
}

/// A narrow view of `Scheduler::schedule_reboot` that does not depend on
/// the `Watchdog`/`GpioPin` type parameters, so the command dispatcher
/// can hold a `&dyn RebootScheduler` rather than being generic over the
/// whole scheduler.
pub trait RebootScheduler {
    fn schedule_reboot(&self, postpone_seconds: u32);
}

/// Ties every interface together for one main-loop iteration. Generic
/// over the concrete `Watchdog` and antenna-deployment `GpioPin` so board
/// crates can monomorphize rather than pay for a vtable on the hottest
/// path in the firmware.
pub struct Scheduler<'a, W: Watchdog, G: GpioPin> {
    watchdog: &'a W,
    antenna_deploy_pin: &'a G,
    uart_source: &'a dyn PollSource,
    spi_source: &'a dyn PollSource,
    rf_source: &'a dyn PollSource,
    reboot: core::cell::Cell<Option<ScheduledReboot>>,
    uptime_seconds: core::cell::Cell<u32>,
}

impl<'a, W: Watchdog, G: GpioPin> Scheduler<'a, W, G> {
    pub fn new(
        watchdog: &'a W,
        antenna_deploy_pin: &'a G,
        uart_source: &'a dyn PollSource,
        spi_source: &'a dyn PollSource,
        rf_source: &'a dyn PollSource,
    ) -> Self {
        Scheduler {
            watchdog,
            antenna_deploy_pin,
            uart_source,
            spi_source,
            rf_source,
            reboot: core::cell::Cell::new(None),
            uptime_seconds: core::cell::Cell::new(0),
        }
    }

    pub fn schedule_reboot(&self, postpone_seconds: u32) {
        let fire_at = self.uptime_seconds.get().saturating_add(postpone_seconds);
        self.reboot.set(Some(ScheduledReboot { fire_at_uptime: fire_at }));
    }

    pub fn reboot_pending(&self) -> Option<ScheduledReboot> {
        self.reboot.get()
    }

    /// Advances the uptime counter. Called once per second by whatever
    /// timer tick the board wires up; kept separate from `poll` because
    /// the main loop runs far more often than once a second.
    pub fn tick_second(&self) {
        self.uptime_seconds.set(self.uptime_seconds.get().wrapping_add(1));
    }

    pub fn uptime_seconds(&self) -> u32 {
        self.uptime_seconds.get()
    }

    /// Runs exactly one iteration of the fixed-order main loop. Returns
    /// `true` if a reboot should be triggered by the caller this
    /// iteration (step 7: the scheduler itself has no way to reset the
    /// chip -- that is the board's `Watchdog` plus a forced short
    /// period, or a direct reset call the board crate supplies).
    pub fn poll(&self) -> bool {
        // 1. Clear the hardware watchdog.
        self.watchdog.feed();

        // 2. Handle scheduled events (RTC-triggered, deferred reboot) is
        // folded into step 7 below; there is no other RTC-triggered event
        // in this firmware today.

        // 3-5. Poll UART1, SPI, RF in that fixed priority order.
        self.uart_source.poll();
        self.spi_source.poll();
        self.rf_source.poll();

        // 6. Handle antenna-deployment GPIO (edge-triggered by the board;
        // here we only sample level, matching a board that latches the
        // deployment event itself).
        let _ = self.antenna_deploy_pin.read();

        // 7. Fire a scheduled reboot once its time has come.
        if let Some(pending) = self.reboot.get() {
            if self.uptime_seconds.get() >= pending.fire_at_uptime {
                return true;
            }
        }

        false
    }
}

impl<'a, W: Watchdog, G: GpioPin> RebootScheduler for Scheduler<'a, W, G> {
    fn schedule_reboot(&self, postpone_seconds: u32) {
        Scheduler::schedule_reboot(self, postpone_seconds);
    }
}

struct NullPin;
impl GpioPin for NullPin {
    fn read(&self) -> PinState {
        PinState::Low
    }
    fn set(&self, _state: PinState) {}
}
