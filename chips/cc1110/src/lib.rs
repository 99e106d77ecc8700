// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! CC1110 chip glue: the thin seam between `comms_kernel::hil` traits
//! and this chip's peripherals. On-chip register layouts (the DMA
//! controller, the radio co-processor's own configuration space, the
//! AES co-processor, low-level UART baud/flow-control setup) are out of
//! this codebase's scope by design -- the board crate only needs this
//! crate to honor the `hil` contracts, not to reproduce a full register
//! reference. Where a trait needs a register this crate does model
//! (watchdog, GPIO), it is a real `tock_registers` MMIO struct; where it
//! doesn't (radio, flash, UART, SPI), the implementation is a minimal
//! placeholder a real port replaces with its own driver.

#![no_std]

pub mod gpio;
pub mod watchdog;

use comms_kernel::hil::flash::{Flash, FlashClient, FlashError, PAGE_LEN};
use comms_kernel::hil::radio::{Radio, RadioClient, RadioMode};
use comms_kernel::hil::radio_regs::{RadioRegisters, RadioTelem};
use comms_kernel::hil::rtc::Rtc;
use comms_kernel::ErrorCode;
use core::cell::Cell;

pub use gpio::Cc1110Gpio;
pub use watchdog::Cc1110Watchdog;

/// A free-running seconds counter, advanced by whichever timer tick the
/// board wires to `tick_second` -- matches `hil::rtc::Rtc`'s "is_set
/// distinguishes epoch from never-set" contract without modeling the
/// chip's actual sleep-timer/RTC peripheral.
pub struct SoftRtc {
    seconds: Cell<u32>,
    set: Cell<bool>,
}

impl SoftRtc {
    pub const fn new() -> Self {
        SoftRtc { seconds: Cell::new(0), set: Cell::new(false) }
    }
}

impl Default for SoftRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl Rtc for SoftRtc {
    fn get_time(&self) -> u32 {
        self.seconds.get()
    }
    fn set_time(&self, seconds: u32) {
        self.seconds.set(seconds);
        self.set.set(true);
    }
    fn is_set(&self) -> bool {
        self.set.get()
    }
}

// Safety: single-threaded cooperative firmware, one instance per board
// (see `comms_cells`' module docs for the concurrency model this and
// every other peripheral singleton below relies on).
unsafe impl Sync for SoftRtc {}

/// Opaque radio-register mover backing `GET/SET/RESET_RADIOTELEM`. The
/// register layout itself is a non-goal; this stores whatever blob it
/// is handed and hands it back, exactly the behavior the command
/// dispatcher requires.
pub struct Cc1110RadioRegisters {
    telem: Cell<RadioTelem>,
}

impl Cc1110RadioRegisters {
    pub const fn new() -> Self {
        Cc1110RadioRegisters { telem: Cell::new(RadioTelem::zeroed()) }
    }
}

impl Default for Cc1110RadioRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioRegisters for Cc1110RadioRegisters {
    fn snapshot(&self) -> RadioTelem {
        self.telem.get()
    }
    fn apply(&self, telem: &RadioTelem) {
        self.telem.set(*telem);
    }
    fn reset_to_default(&self) {
        self.telem.set(RadioTelem::zeroed());
    }
}

unsafe impl Sync for Cc1110RadioRegisters {}

/// Program-flash access. `FLASH_WRITE_PAGE_SIZE=128` and the 1024-byte
/// erase granularity match the original `flash_constants.h`; the unlock
/// sequence and DMA-driven write itself are chip detail out of scope
/// here, so this type is a placeholder a real port backs with the
/// chip's flash controller.
pub struct Cc1110Flash {
    client: Cell<Option<&'static dyn FlashClient>>,
}

impl Cc1110Flash {
    pub const fn new() -> Self {
        Cc1110Flash { client: Cell::new(None) }
    }
}

impl Default for Cc1110Flash {
    fn default() -> Self {
        Self::new()
    }
}

impl Flash for Cc1110Flash {
    fn set_client(&self, client: &'static dyn FlashClient) {
        self.client.set(Some(client));
    }

    fn write_page(&self, page: u32, _data: &'static mut [u8; PAGE_LEN]) -> Result<(), ErrorCode> {
        if let Some(client) = self.client.get() {
            client.write_page_done(page, Err(FlashError::Unknown));
        }
        Err(ErrorCode::Fail)
    }

    fn erase_application_region(&self) -> Result<(), ErrorCode> {
        if let Some(client) = self.client.get() {
            client.erase_done(Err(FlashError::Unknown));
        }
        Err(ErrorCode::Fail)
    }
}

unsafe impl Sync for Cc1110Flash {}

/// RF transceiver control. The half-duplex FSM the `Radio` trait
/// describes (§4.4) lives here in a real port; the radio co-processor's
/// own register interface is out of scope, so this type only proves the
/// trait is wireable -- every operation reports `Off` until a real
/// driver replaces it.
pub struct Cc1110Radio {
    client: Cell<Option<&'static dyn RadioClient>>,
}

impl Cc1110Radio {
    pub const fn new() -> Self {
        Cc1110Radio { client: Cell::new(None) }
    }
}

impl Default for Cc1110Radio {
    fn default() -> Self {
        Self::new()
    }
}

impl Radio for Cc1110Radio {
    fn set_client(&self, client: &'static dyn RadioClient) {
        self.client.set(Some(client));
    }

    fn mode(&self) -> RadioMode {
        RadioMode::Idle
    }

    fn start_receiving(&self) -> Result<(), ErrorCode> {
        Err(ErrorCode::Off)
    }

    fn send_packet(
        &self,
        buf: &'static mut [u8],
        _len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        Err((ErrorCode::Off, buf))
    }

    fn send_packet_at(
        &self,
        buf: &'static mut [u8],
        _len: usize,
        _trigger_time: u32,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        Err((ErrorCode::Off, buf))
    }

    fn now(&self) -> u32 {
        0
    }
}

unsafe impl Sync for Cc1110Radio {}

/// UART1 byte transmit/receive. Baud-rate and flow-control setup are a
/// non-goal here; this type exists so the board crate has something to
/// hand `comms_capsules_core::serial_framer::SerialFramer` bytes from,
/// replaced by a real interrupt-driven driver in a full port.
pub struct Cc1110Uart {
    transmit_client: Cell<Option<&'static dyn comms_kernel::hil::uart::TransmitClient>>,
    receive_client: Cell<Option<&'static dyn comms_kernel::hil::uart::ReceiveClient>>,
}

impl Cc1110Uart {
    pub const fn new() -> Self {
        Cc1110Uart { transmit_client: Cell::new(None), receive_client: Cell::new(None) }
    }

    /// Feeds one byte from the RX ISR to whatever client is registered.
    /// A real port calls this from the actual UART RX interrupt handler.
    pub fn deliver_received_byte(&self, byte: u8) {
        if let Some(client) = self.receive_client.get() {
            client.received_byte(byte);
        }
    }
}

impl Default for Cc1110Uart {
    fn default() -> Self {
        Self::new()
    }
}

impl comms_kernel::hil::uart::Transmit for Cc1110Uart {
    fn set_transmit_client(&self, client: &'static dyn comms_kernel::hil::uart::TransmitClient) {
        self.transmit_client.set(Some(client));
    }

    fn transmit_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        _tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        Err((ErrorCode::Off, tx_buffer))
    }
}

impl comms_kernel::hil::uart::Receive for Cc1110Uart {
    fn set_receive_client(&self, client: &'static dyn comms_kernel::hil::uart::ReceiveClient) {
        self.receive_client.set(Some(client));
    }

    fn start_receive(&self) -> Result<(), ErrorCode> {
        Err(ErrorCode::Off)
    }

    fn stop_receive(&self) -> Result<(), ErrorCode> {
        Err(ErrorCode::Off)
    }
}

unsafe impl Sync for Cc1110Uart {}

/// SPI peripheral-mode byte transfer to the OBC local bus. Same
/// placeholder status as `Cc1110Uart` -- the controller-driven clocking
/// this depends on is chip detail out of scope here.
pub struct Cc1110Spi {
    client: Cell<Option<&'static dyn comms_kernel::hil::spi::SpiClient>>,
}

impl Cc1110Spi {
    pub const fn new() -> Self {
        Cc1110Spi { client: Cell::new(None) }
    }

    pub fn deliver_received_byte(&self, byte: u8) {
        if let Some(client) = self.client.get() {
            client.received_byte(byte);
        }
    }
}

impl Default for Cc1110Spi {
    fn default() -> Self {
        Self::new()
    }
}

impl comms_kernel::hil::spi::SpiPeripheral for Cc1110Spi {
    fn set_client(&self, client: &'static dyn comms_kernel::hil::spi::SpiClient) {
        self.client.set(Some(client));
    }

    fn enable(&self) -> Result<(), ErrorCode> {
        Err(ErrorCode::Off)
    }

    fn disable(&self) {}

    fn put_reply_byte(&self, _byte: u8) {}
}

unsafe impl Sync for Cc1110Spi {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_rtc_is_unset_until_first_set_time() {
        let rtc = SoftRtc::new();
        assert!(!rtc.is_set());
        rtc.set_time(12345);
        assert!(rtc.is_set());
        assert_eq!(rtc.get_time(), 12345);
    }

    #[test]
    fn radio_registers_round_trip_and_reset() {
        let regs = Cc1110RadioRegisters::new();
        let mut telem = RadioTelem::zeroed();
        telem.0[0] = 0x42;
        regs.apply(&telem);
        assert_eq!(regs.snapshot(), telem);
        regs.reset_to_default();
        assert_eq!(regs.snapshot(), RadioTelem::zeroed());
    }
}
