// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Board wiring for the CC1110-based flight unit: ties the UART/SPI
//! local-bus links, the RF link, and the fixed-order scheduler to the
//! `chips/cc1110` peripherals and runs the main loop. Register-level
//! bring-up (clocks, DMA, interrupt enable, UART baud/flow-control,
//! ADC) is chip reference detail out of this codebase's scope, the same
//! non-goal `secure-boot`'s `comms-boot` board leaves to `unimplemented!`
//! in its own `_start` -- what this file proves instead is that the
//! capsule graph built in `capsules/core`, `capsules/extra`, and
//! `comms_kernel::scheduler` wires up into a runnable application.

#![no_std]
#![no_main]

use panic_halt as _;

use core::cell::RefCell;
use core::hint::spin_loop;

use comms_kernel::hil::aes_ecb::AesEcb;
use comms_kernel::hil::radio::{Radio, RadioMode};
use comms_kernel::hil::spi::{SpiClient, SpiPeripheral};
use comms_kernel::hil::uart::{Receive, ReceiveClient, Transmit};
use comms_kernel::hil::watchdog::Watchdog;
use comms_kernel::hwid::HwId;
use comms_kernel::packet::{CommandHeader, CRC_LEN, HEADER_LEN, MAC_LEN, MAX_LOCAL_PACKET_LEN, MAX_LOCAL_PAYLOAD_LEN, TIMESTAMP_LEN};
use comms_kernel::scheduler::{PollSource, Scheduler};
use comms_kernel::telemetry::Telemetry;

use comms_capsules_core::serial_framer::SerialFramer;
use comms_capsules_core::soft_aes::SoftAesEcb;
use comms_capsules_extra::authenticator::KeyTable;
use comms_capsules_extra::command_dispatcher::{opcode, CallsignStore, DispatchContext, MainKeys};
use comms_capsules_extra::local_link::LocalLink;
use comms_capsules_extra::radio_link::{RadioLink, RxOutcome, TxMode, RANGING_REPLY_LATENCY_TICKS};
use comms_capsules_extra::router::Interface;

use comms_chip_cc1110::gpio::Cc1110PortRegisters;
use comms_chip_cc1110::watchdog::Cc1110WatchdogRegisters;
use comms_chip_cc1110::{Cc1110Gpio, Cc1110Radio, Cc1110RadioRegisters, Cc1110Spi, Cc1110Uart, Cc1110Watchdog, SoftRtc};

/// Stand-in for a flash read at the HWID provisioning region (`0x03fe`
/// in the bootloader's own memory map, §6 of the wire format this board
/// shares with it). On-chip flash layout is a non-goal here, so a real
/// port reads this once at boot instead of hardcoding it.
const SELF_HWID: HwId = 0x7005;

/// Stand-in for the three flash-provisioned keys (GS1, GS2, signing),
/// same non-goal as `SELF_HWID`.
const MAIN_KEYS: MainKeys = [[0u8; 16]; 3];

/// Placeholder register addresses -- the real CC1110 memory map is
/// on-chip reference detail out of scope here, same as every other
/// MMIO address in `chips/cc1110`'s own tests.
const WATCHDOG_REGS_ADDR: *const Cc1110WatchdogRegisters = 0xdf00 as *const Cc1110WatchdogRegisters;
const ANTENNA_DEPLOY_REGS_ADDR: *const Cc1110PortRegisters = 0xfe00 as *const Cc1110PortRegisters;

static WATCHDOG: Cc1110Watchdog = unsafe { Cc1110Watchdog::new(WATCHDOG_REGS_ADDR) };
static ANTENNA_DEPLOY_PIN: Cc1110Gpio = unsafe { Cc1110Gpio::new(ANTENNA_DEPLOY_REGS_ADDR) };
static RADIO: Cc1110Radio = Cc1110Radio::new();
static RADIO_REGS: Cc1110RadioRegisters = Cc1110RadioRegisters::new();
static RTC: SoftRtc = SoftRtc::new();
static UART: Cc1110Uart = Cc1110Uart::new();
static SPI: Cc1110Spi = Cc1110Spi::new();

/// A `RefCell` usable from a `static`: sound under the single-threaded
/// cooperative main-loop-plus-run-to-completion-ISRs model `comms_cells`'
/// module docs establish -- the same justification backing every
/// `unsafe impl Sync` added to the chip crate's peripheral types.
struct BoardCell<T>(RefCell<T>);

impl<T> BoardCell<T> {
    const fn new(value: T) -> Self {
        BoardCell(RefCell::new(value))
    }
}

unsafe impl<T> Sync for BoardCell<T> {}

/// Everything the command dispatcher and the two local-bus framers need
/// that is not itself a peripheral singleton.
struct BoardState {
    key_table: BoardCell<KeyTable>,
    authent_enabled: BoardCell<bool>,
    callsign: BoardCell<CallsignStore>,
    rx_enabled: BoardCell<bool>,
    telemetry: BoardCell<Telemetry>,
    uart_framer: BoardCell<SerialFramer<2>>,
    spi_framer: BoardCell<SerialFramer<2>>,
}

static STATE: BoardState = BoardState {
    key_table: BoardCell::new(KeyTable::empty()),
    authent_enabled: BoardCell::new(true),
    callsign: BoardCell::new(CallsignStore::empty()),
    rx_enabled: BoardCell::new(true),
    telemetry: BoardCell::new(Telemetry::new()),
    uart_framer: BoardCell::new(SerialFramer::new()),
    spi_framer: BoardCell::new(SerialFramer::new()),
};

// The capsules below borrow `'static` references to the peripherals and
// to `CIPHER_STORAGE` above, so they cannot be built as plain `static`
// initializers; this crate has no `static_init!` macro (that comes from
// the full upstream Tock kernel, out of scope here), so each is built
// once at boot into its own `static mut` slot and read back through an
// accessor that asserts it has been initialized.
static mut CIPHER_STORAGE: SoftAesEcb = SoftAesEcb::new();
static mut RADIO_LINK_STORAGE: Option<RadioLink<'static>> = None;
static mut UART_LINK_STORAGE: Option<LocalLink> = None;
static mut SPI_LINK_STORAGE: Option<LocalLink> = None;
static mut SCHEDULER_STORAGE: Option<Scheduler<'static, Cc1110Watchdog, Cc1110Gpio>> = None;

fn radio_link() -> &'static RadioLink<'static> {
    unsafe { RADIO_LINK_STORAGE.as_ref().unwrap() }
}

fn uart_link() -> &'static LocalLink {
    unsafe { UART_LINK_STORAGE.as_ref().unwrap() }
}

fn spi_link() -> &'static LocalLink {
    unsafe { SPI_LINK_STORAGE.as_ref().unwrap() }
}

fn scheduler() -> &'static Scheduler<'static, Cc1110Watchdog, Cc1110Gpio> {
    unsafe { SCHEDULER_STORAGE.as_ref().unwrap() }
}

struct UartRxClient;
impl ReceiveClient for UartRxClient {
    fn received_byte(&self, byte: u8) {
        STATE.uart_framer.0.borrow_mut().process_byte(byte);
    }
}
static UART_RX_CLIENT: UartRxClient = UartRxClient;

struct SpiRxClient;
impl SpiClient for SpiRxClient {
    fn received_byte(&self, byte: u8) {
        STATE.spi_framer.0.borrow_mut().process_byte(byte);
    }
}
static SPI_RX_CLIENT: SpiRxClient = SpiRxClient;

static UART_SOURCE: UartSource = UartSource;
static SPI_SOURCE: SpiSource = SpiSource;
static RF_SOURCE: RfSource = RfSource;

/// Scratch buffers for outbound forwarded/replied frames. One per
/// interface rather than shared, since a frame forwarded onward (e.g.
/// RF -> UART) and a reply already in flight on the arrival interface
/// must not alias each other's storage.
static mut FWD_UART_BUF: [u8; MAX_LOCAL_PACKET_LEN] = [0u8; MAX_LOCAL_PACKET_LEN];
const FWD_RF_BUF_LEN: usize = 1 + HEADER_LEN + MAX_LOCAL_PAYLOAD_LEN + TIMESTAMP_LEN + MAC_LEN + CRC_LEN;
static mut FWD_RF_BUF: [u8; FWD_RF_BUF_LEN] = [0u8; FWD_RF_BUF_LEN];

/// # Safety
/// Must be called exactly once, before the main loop starts and before
/// any peripheral ISR can fire.
unsafe fn board_init() {
    let cipher: &'static mut dyn AesEcb = &mut CIPHER_STORAGE;
    RADIO_LINK_STORAGE = Some(RadioLink::new(&RADIO, cipher, &RTC, SELF_HWID));
    UART_LINK_STORAGE = Some(LocalLink::new(SELF_HWID));
    SPI_LINK_STORAGE = Some(LocalLink::new(SELF_HWID));

    UART.set_receive_client(&UART_RX_CLIENT);
    SPI.set_client(&SPI_RX_CLIENT);
    RADIO.set_client(radio_link());

    SCHEDULER_STORAGE = Some(Scheduler::new(&WATCHDOG, &ANTENNA_DEPLOY_PIN, &UART_SOURCE, &SPI_SOURCE, &RF_SOURCE));

    WATCHDOG.set_period_ms(1000);
    let _ = radio_link().start();
    let _ = UART.start_receive();
    let _ = SPI.enable();
}

/// Refreshes the live fields of `STATE.telemetry` (uptime, radio mode)
/// from current board state before a dispatch call snapshots it --
/// `UPDATE_TELEM`'s own handler (`command_dispatcher::dispatch`) only
/// ACKs having done so, since the ADC/radio-status read is this board
/// crate's job. There is no ADC peripheral modeled here, so
/// `Telemetry::adc` stays at its last-written value.
fn refresh_live_telemetry() {
    let mut telemetry = STATE.telemetry.0.borrow_mut();
    telemetry.uptime_seconds = scheduler().uptime_seconds();
    let mode = RADIO.mode();
    telemetry.rx_mode = (mode == RadioMode::Rx) as u8;
    telemetry.tx_mode = (mode == RadioMode::Tx) as u8;
}

/// Builds a `DispatchContext` borrowing every piece of `STATE`, hands it
/// (plus a fresh mutable telemetry copy) to `f`, and writes the possibly
/// updated telemetry back. `ctx.telemetry` and the mutable telemetry `f`
/// receives are deliberately two distinct `Telemetry` values (mirroring
/// every `radio_link`/`local_link` test): `DispatchContext` borrows one
/// immutably for `GET_TELEM` while the packet-processing call needs a
/// second, mutable one for its own counters, and the two cannot alias
/// the same `RefCell` borrow at once.
fn with_dispatch<R>(f: impl FnOnce(&mut DispatchContext, &mut Telemetry) -> R) -> R {
    refresh_live_telemetry();

    let mut key_table = STATE.key_table.0.borrow_mut();
    let mut authent_enabled = STATE.authent_enabled.0.borrow_mut();
    let mut callsign = STATE.callsign.0.borrow_mut();
    let mut rx_enabled = STATE.rx_enabled.0.borrow_mut();
    let ctx_telemetry = *STATE.telemetry.0.borrow();
    let mut working_telemetry = ctx_telemetry;

    let result = {
        let mut ctx = DispatchContext {
            self_hwid: SELF_HWID,
            rtc: &RTC,
            telemetry: &ctx_telemetry,
            key_table: &mut *key_table,
            authent_enabled: &mut *authent_enabled,
            callsign: &mut *callsign,
            radio_regs: &RADIO_REGS,
            main_keys: &MAIN_KEYS,
            reboot: scheduler(),
            rx_enabled: &mut *rx_enabled,
        };
        f(&mut ctx, &mut working_telemetry)
    };

    *STATE.telemetry.0.borrow_mut() = working_telemetry;
    result
}

/// Same two-instance telemetry handling as `with_dispatch`, for the
/// forwarding/reply paths that need the key table and `authent_enabled`
/// read-only but still record a sent packet.
fn with_keys_and_telemetry<R>(f: impl FnOnce(&KeyTable, bool, &mut Telemetry) -> R) -> R {
    let key_table = STATE.key_table.0.borrow();
    let authent_enabled = *STATE.authent_enabled.0.borrow();
    let snapshot = *STATE.telemetry.0.borrow();
    let mut working = snapshot;
    let result = f(&key_table, authent_enabled, &mut working);
    *STATE.telemetry.0.borrow_mut() = working;
    result
}

fn note_rx(f: impl FnOnce(&mut Telemetry)) {
    let mut telemetry = STATE.telemetry.0.borrow_mut();
    f(&mut telemetry);
}

fn send_over_rf(header: &CommandHeader, payload: &[u8], tx_mode: TxMode, trigger: Option<u32>) {
    with_keys_and_telemetry(|keys, authent_enabled, telemetry| {
        let buf: &'static mut [u8] = unsafe { &mut FWD_RF_BUF };
        buf[1 + HEADER_LEN..1 + HEADER_LEN + payload.len()].copy_from_slice(payload);
        let _ = radio_link().send_reply(buf, header, payload.len(), keys, authent_enabled, tx_mode, trigger, telemetry);
    });
}

/// Sends a reply the command dispatcher (or the ranging special case in
/// `radio_link::process_frame`) produced, over RF. A `RANGING_ACK` is
/// the one reply that must go out via the precise-timing path instead
/// of the ordinary one (spec: "TX strobe issued by the precise-timing
/// timer, not immediately").
fn send_rf_reply(header: &CommandHeader, payload: &[u8]) {
    if header.opcode == opcode::RANGING_ACK {
        let trigger = Some(RADIO.now().wrapping_add(RANGING_REPLY_LATENCY_TICKS));
        send_over_rf(header, payload, TxMode::Ranging, trigger);
    } else {
        send_over_rf(header, payload, TxMode::Normal, None);
    }
}

fn send_local_reply(iface: Interface, header: &CommandHeader, payload: &[u8]) {
    match iface {
        Interface::Uart => unsafe {
            if let Some(n) = uart_link().build_reply_frame(header, payload, &mut FWD_UART_BUF) {
                let buf: &'static mut [u8] = &mut FWD_UART_BUF;
                let _ = UART.transmit_buffer(buf, n);
            }
        },
        Interface::Spi => {
            let mut out = [0u8; MAX_LOCAL_PACKET_LEN];
            if let Some(n) = spi_link().build_reply_frame(header, payload, &mut out) {
                for &b in &out[..n] {
                    SPI.put_reply_byte(b);
                }
            }
        }
        Interface::Rf | Interface::Invalid => {}
    }
}

/// Forwards a packet named by `RxOutcome::Forward` onward to the
/// interface the router chose. Never a ranging reply -- ranging is a
/// self-addressed request, not something any destination forwards.
fn forward_packet(iface: Interface, header: &CommandHeader, payload: &[u8]) {
    match iface {
        Interface::Uart => send_local_reply(Interface::Uart, header, payload),
        Interface::Spi => send_local_reply(Interface::Spi, header, payload),
        Interface::Rf => send_over_rf(header, payload, TxMode::Normal, None),
        Interface::Invalid => {}
    }
}

/// Shared by `UartSource` and `SpiSource`: decode, route, and either
/// reply on `iface` or forward elsewhere. `frame` is header+payload with
/// no length byte, matching what `SerialFramer::take_ready_frame` hands
/// back.
fn handle_local_frame(link: &LocalLink, iface: Interface, frame: &[u8]) {
    let mut reply_out = [0u8; MAX_LOCAL_PAYLOAD_LEN];
    let (outcome, reply) = with_dispatch(|ctx, telemetry| link.process_frame(frame, telemetry, ctx, &mut reply_out));
    match outcome {
        RxOutcome::Handled => {
            if let Some(reply) = reply {
                send_local_reply(iface, &reply.header, &reply_out[..reply.payload_len]);
            }
        }
        RxOutcome::Forward(target) => {
            if frame.len() >= HEADER_LEN {
                if let Some(header) = CommandHeader::decode(&frame[..HEADER_LEN]) {
                    forward_packet(target, &header, &frame[HEADER_LEN..]);
                }
            }
        }
        RxOutcome::Dropped => {}
    }
}

struct UartSource;
impl PollSource for UartSource {
    fn poll(&self) -> bool {
        let mut buf = [0u8; MAX_LOCAL_PACKET_LEN];
        let n = {
            let mut framer = STATE.uart_framer.0.borrow_mut();
            match framer.take_ready_frame(&mut buf) {
                Some(n) => n,
                None => return false,
            }
        };
        note_rx(|t| t.uart1_rx_count = t.uart1_rx_count.wrapping_add(1));
        handle_local_frame(uart_link(), Interface::Uart, &buf[..n]);
        true
    }
}

struct SpiSource;
impl PollSource for SpiSource {
    fn poll(&self) -> bool {
        let mut buf = [0u8; MAX_LOCAL_PACKET_LEN];
        let n = {
            let mut framer = STATE.spi_framer.0.borrow_mut();
            match framer.take_ready_frame(&mut buf) {
                Some(n) => n,
                None => return false,
            }
        };
        note_rx(|t| t.spi_rx_count = t.spi_rx_count.wrapping_add(1));
        handle_local_frame(spi_link(), Interface::Spi, &buf[..n]);
        true
    }
}

struct RfSource;
impl PollSource for RfSource {
    fn poll(&self) -> bool {
        let (buf, len, quality) = match radio_link().take_rx_frame() {
            Some(v) => v,
            None => return false,
        };
        note_rx(|t| {
            t.last_rssi = quality.rssi;
            t.last_lqi = quality.lqi;
            t.last_freqest = quality.freqest;
        });

        let mut reply_out = [0u8; MAX_LOCAL_PAYLOAD_LEN];
        let (outcome, reply) =
            with_dispatch(|ctx, telemetry| radio_link().process_frame(&buf[..len], telemetry, ctx, &mut reply_out));
        match outcome {
            RxOutcome::Handled => {
                if let Some(reply) = reply {
                    send_rf_reply(&reply.header, &reply_out[..reply.payload_len]);
                }
            }
            RxOutcome::Forward(target) => {
                let footer_len = TIMESTAMP_LEN + MAC_LEN + CRC_LEN;
                if len >= 1 + HEADER_LEN + footer_len {
                    if let Some(header) = CommandHeader::decode(&buf[1..1 + HEADER_LEN]) {
                        let payload_end = len - footer_len;
                        forward_packet(target, &header, &buf[1 + HEADER_LEN..payload_end]);
                    }
                }
            }
            RxOutcome::Dropped => {}
        }

        let _ = radio_link().start();
        true
    }
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    unsafe {
        board_init();
    }

    // A real port drives `scheduler().tick_second()` from a 1 Hz timer
    // ISR; no timer peripheral is modeled in this chip crate, so uptime
    // only advances when something else calls it -- out of scope by the
    // same non-goal as the rest of this board's register bring-up.
    loop {
        if scheduler().poll() {
            // Reboot requested: stop kicking the watchdog and let the
            // hardware reset fire, the same handoff `comms-boot`'s own
            // soft-timeout path uses.
            loop {
                spin_loop();
            }
        }
    }
}
