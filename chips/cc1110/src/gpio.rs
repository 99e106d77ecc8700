// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! One CC1110 GPIO pin, read/write only -- no interrupt configuration,
//! pull-up/down, or drive-strength control. Those are per-board wiring
//! decisions (which physical pin is the antenna-deployment strap, which
//! is the bootloader force-update strap) out of this chip crate's
//! scope; this type only has to honor `hil::gpio::GpioPin`.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

register_bitfields![u8,
    pub PIN [
        VALUE OFFSET(0) NUMBITS(1) [],
    ],
];

register_structs! {
    pub Cc1110PortRegisters {
        (0x000 => pin: ReadWrite<u8, PIN::Register>),
        (0x001 => @END),
    }
}

use comms_kernel::hil::gpio::{GpioPin, PinState};

pub struct Cc1110Gpio {
    regs: *const Cc1110PortRegisters,
}

impl Cc1110Gpio {
    /// # Safety
    /// `regs` must point at the chip's real port-data register, with
    /// this bit already configured as the desired direction, for the
    /// lifetime of this value.
    pub const unsafe fn new(regs: *const Cc1110PortRegisters) -> Self {
        Cc1110Gpio { regs }
    }

    fn regs(&self) -> &Cc1110PortRegisters {
        unsafe { &*self.regs }
    }
}

impl GpioPin for Cc1110Gpio {
    fn read(&self) -> PinState {
        if self.regs().pin.is_set(PIN::VALUE) {
            PinState::High
        } else {
            PinState::Low
        }
    }

    fn set(&self, state: PinState) {
        match state {
            PinState::High => self.regs().pin.modify(PIN::VALUE::SET),
            PinState::Low => self.regs().pin.modify(PIN::VALUE::CLEAR),
        }
    }
}

// Safety: `regs` points at MMIO, not at Rust-aliased memory; access is
// single-threaded cooperative per `comms_cells`' concurrency model.
unsafe impl Sync for Cc1110Gpio {}
