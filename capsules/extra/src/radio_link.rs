// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Half-duplex RF packet TX/RX, tying together the CRC-16 and
//! CBC-MAC/timestamp authenticator, the router, and the command
//! dispatcher for the radio interface. Grounded on
//! `comms-firmware/.../radio.c`'s `radio_listen`/`radio_send_packet` and
//! their ISR contract (§4.4), with the `hil::radio::Radio` trait standing
//! in for the DMA/strobe sequencing those functions perform on real
//! hardware.
//!
//! `RadioLink` is a `RadioClient`: `receive_done`/`send_done` run in
//! interrupt context (per the teacher's convention, the ISR itself just
//! forwards here) and only ever hand a buffer into a `MapCell`/`Cell`, per
//! `comms_cells`' ISR/mainline handoff discipline -- the actual CRC check,
//! authentication, routing, and dispatch happen later, from `poll`, in
//! mainline context.

use comms_cells::MapCell;
use core::cell::{Cell, RefCell};

use comms_kernel::hil::aes_ecb::AesEcb;
use comms_kernel::hil::radio::{LinkQuality, Radio, RadioClient, RadioMode};
use comms_kernel::hil::rtc::Rtc;
use comms_kernel::hwid::HwId;
use comms_kernel::packet::{CommandHeader, CRC_LEN, HEADER_LEN, MAC_LEN, TIMESTAMP_LEN};
use comms_kernel::scheduler::PollSource;
use comms_kernel::telemetry::Telemetry;
use comms_kernel::ErrorCode;

use crate::authenticator::{self, KeyTable};
use crate::command_dispatcher::{self, DispatchContext};
use crate::router::{self, RouteDecision};

/// Lower-bitrate radio configuration used only for a `RANGING_ACK` reply,
/// selected by the dispatcher's ranging special case rather than the
/// ordinary reply path.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TxMode {
    Normal,
    Ranging,
}

/// Payload of a `RANGING_ACK` reply: a fixed two-byte ack type/version,
/// not meant to carry any other information -- the ranging measurement
/// itself comes from the precise TX strobe timing, not the payload.
pub const RANGING_ACK_TYPE: u8 = 0x01;
pub const RANGING_ACK_PROTOCOL_VERSION: u8 = 0x01;

/// Radio-local ticks between a `RANGING` request being recognized and its
/// `RANGING_ACK` reply's TX strobe -- the fixed, timer-gated reply
/// latency the ranging protocol needs for a useful time-of-flight
/// measurement. The exact value is a radio-timing calibration constant
/// out of this codebase's scope; callers add this to `Radio::now()` to
/// get `send_reply`'s `precise_trigger_time`.
pub const RANGING_REPLY_LATENCY_TICKS: u32 = 1000;

struct RxFrame {
    buf: &'static mut [u8],
    len: usize,
    quality: LinkQuality,
}

/// Outcome of processing one received RF frame, for forwarding decisions
/// the board wires to the other interfaces. `Handled` means a reply (if
/// any) was already queued for transmission by this module.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxOutcome {
    Handled,
    Forward(router::Interface),
    Dropped,
}

/// The RF link's half-duplex driver. Generic over nothing -- it holds
/// trait objects, matching `authenticator`'s and `command_dispatcher`'s
/// borrow-everything style, since there is exactly one radio per board.
pub struct RadioLink<'a> {
    radio: &'a dyn Radio,
    cipher: RefCell<&'a mut dyn AesEcb>,
    rtc: &'a dyn Rtc,
    self_hwid: HwId,

    rx_frame: MapCell<RxFrame>,
    tx_underway: Cell<bool>,
    send_result: Cell<Option<Result<(), ErrorCode>>>,
}

impl<'a> RadioLink<'a> {
    pub fn new(radio: &'a dyn Radio, cipher: &'a mut dyn AesEcb, rtc: &'a dyn Rtc, self_hwid: HwId) -> Self {
        RadioLink {
            radio,
            cipher: RefCell::new(cipher),
            rtc,
            self_hwid,
            rx_frame: MapCell::empty(),
            tx_underway: Cell::new(false),
            send_result: Cell::new(None),
        }
    }

    pub fn start(&self) -> Result<(), ErrorCode> {
        self.radio.start_receiving()
    }

    pub fn is_tx_underway(&self) -> bool {
        self.tx_underway.get()
    }

    /// Hands the most recently received frame (if any) to the caller,
    /// consuming it. Mirrors `serial_framer::SerialFramer::take_ready_frame`'s
    /// role for the other interfaces, except the RF path hands back the
    /// raw DMA buffer rather than copying into caller-owned storage, since
    /// the buffer is `'static` and freely movable.
    pub fn take_rx_frame(&self) -> Option<(&'static mut [u8], usize, LinkQuality)> {
        self.rx_frame.take().map(|f| (f.buf, f.len, f.quality))
    }

    /// Authenticates and CRC-checks one received RF frame and routes it.
    /// `buf` is the full on-wire frame `[len, header, payload, ts, mac,
    /// crc]`. Returns the routing outcome so the caller (`poll`) knows
    /// whether to re-arm receive or hand the raw bytes to the forwarding
    /// interface named by `RxOutcome::Forward`; when the outcome is
    /// `Handled`, the accompanying `Reply` (if any) is what `send_reply`
    /// needs to actually transmit the response.
    pub fn process_frame(
        &self,
        buf: &[u8],
        telemetry: &mut Telemetry,
        dispatch_ctx: &mut DispatchContext,
        reply_out: &mut [u8],
    ) -> (RxOutcome, Option<command_dispatcher::Reply>) {
        let pkt_len = match buf.first() {
            Some(&b) => b as usize,
            None => {
                telemetry.note_rejected_other();
                return (RxOutcome::Dropped, None);
            }
        };
        let total = 1 + pkt_len;
        if buf.len() < total || total < 1 + HEADER_LEN + TIMESTAMP_LEN + MAC_LEN + CRC_LEN {
            telemetry.note_rejected_other();
            return (RxOutcome::Dropped, None);
        }

        let crc_covered = total - CRC_LEN;
        let expected_crc = u16::from_le_bytes([buf[crc_covered], buf[crc_covered + 1]]);
        if !comms_capsules_core::crc16::verify(&buf[..crc_covered], expected_crc) {
            telemetry.note_rejected_checksum();
            return (RxOutcome::Dropped, None);
        }

        let authent_enabled = *dispatch_ctx.authent_enabled;
        let mut cipher = self.cipher.borrow_mut();
        if !authenticator::check_packet_authent(
            &buf[..crc_covered],
            self.self_hwid,
            &*dispatch_ctx.key_table,
            &mut **cipher,
            self.rtc,
            authent_enabled,
        ) {
            telemetry.note_rejected_authent();
            return (RxOutcome::Dropped, None);
        }
        drop(cipher);

        let header = match CommandHeader::decode(&buf[1..1 + HEADER_LEN]) {
            Some(h) => h,
            None => {
                telemetry.note_rejected_other();
                return (RxOutcome::Dropped, None);
            }
        };

        telemetry.note_good();

        match router::route(header.source, header.destination, self.self_hwid) {
            RouteDecision::Drop => (RxOutcome::Dropped, None),
            RouteDecision::Forward(iface) => (RxOutcome::Forward(iface), None),
            RouteDecision::Handle => {
                let payload_end = total - TIMESTAMP_LEN - MAC_LEN - CRC_LEN;
                let payload = &buf[1 + HEADER_LEN..payload_end];

                // RANGING never reaches the command dispatcher: its reply
                // must go out over the precise-timing TX path
                // (`send_reply`'s `TxMode::Ranging`), which only the
                // caller (holding the radio's `now()`) can schedule.
                if header.opcode == command_dispatcher::opcode::RANGING {
                    let reply_header =
                        CommandHeader::reply_to(&header, self.self_hwid, command_dispatcher::opcode::RANGING_ACK);
                    reply_out[0] = RANGING_ACK_TYPE;
                    reply_out[1] = RANGING_ACK_PROTOCOL_VERSION;
                    telemetry.note_good();
                    return (
                        RxOutcome::Handled,
                        Some(command_dispatcher::Reply { header: reply_header, payload_len: 2 }),
                    );
                }

                let reply = command_dispatcher::dispatch(&header, payload, dispatch_ctx, reply_out);
                (RxOutcome::Handled, reply)
            }
        }
    }

    /// Builds and queues a reply frame for transmission: fills in the
    /// header+payload, appends timestamp+MAC via the authenticator, CRC,
    /// and hands the whole buffer to `hil::Radio::send_packet` (or
    /// `send_packet_at` for a ranging reply). `buf` must already hold
    /// `[0, header(7), payload..]` starting at index 1; this fills the
    /// length byte and appends the footer in place.
    pub fn send_reply(
        &self,
        buf: &'static mut [u8],
        header: &CommandHeader,
        payload_len: usize,
        key_table: &KeyTable,
        authent_enabled: bool,
        tx_mode: TxMode,
        precise_trigger_time: Option<u32>,
        telemetry: &mut Telemetry,
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        let pkt_len = HEADER_LEN + payload_len + TIMESTAMP_LEN + MAC_LEN + CRC_LEN;
        if 1 + pkt_len > buf.len() {
            return Err((ErrorCode::Size, buf));
        }
        buf[0] = pkt_len as u8;
        if header.encode(&mut buf[1..1 + HEADER_LEN]).is_none() {
            return Err((ErrorCode::Inval, buf));
        }

        let mac_end = 1 + pkt_len - MAC_LEN - CRC_LEN;
        for b in &mut buf[mac_end..mac_end + MAC_LEN + CRC_LEN] {
            *b = 0;
        }

        let mut cipher = self.cipher.borrow_mut();
        let ok = authenticator::add_packet_authent(
            &mut buf[..mac_end + MAC_LEN],
            header.destination,
            self.self_hwid,
            key_table,
            &mut **cipher,
            self.rtc,
            authent_enabled,
        );
        drop(cipher);
        if !ok {
            return Err((ErrorCode::Fail, buf));
        }

        let crc_covered = 1 + pkt_len - CRC_LEN;
        let crc = comms_capsules_core::crc16::checksum(&buf[..crc_covered]);
        buf[crc_covered..crc_covered + CRC_LEN].copy_from_slice(&crc.to_le_bytes());

        self.tx_underway.set(true);
        telemetry.note_sent();

        let total = 1 + pkt_len;
        match tx_mode {
            TxMode::Normal => self.radio.send_packet(buf, total),
            TxMode::Ranging => {
                let trigger = precise_trigger_time.unwrap_or_else(|| self.radio.now());
                self.radio.send_packet_at(buf, total, trigger)
            }
        }
    }
}

impl<'a> RadioClient for RadioLink<'a> {
    fn receive_done(&self, buf: &'static mut [u8], len: usize, quality: LinkQuality) {
        self.rx_frame.replace(RxFrame { buf, len, quality });
    }

    fn send_done(&self, buf: &'static mut [u8], result: Result<(), ErrorCode>) {
        self.tx_underway.set(false);
        self.send_result.set(Some(result));
        // The buffer itself is the caller's to reclaim; this capsule only
        // tracks the half-duplex flag, matching the original ISR's "must
        // not mutate the TX/RX buffers" contract.
        let _ = buf;
    }

    fn carrier_busy(&self, _buf: &'static mut [u8]) {
        // Caller (send_reply's caller) owns retry policy; this is surfaced
        // only via `send_result` staying `None` for this attempt.
    }
}

impl<'a> PollSource for RadioLink<'a> {
    /// Returns `true` if an RF frame was present this poll (processing
    /// itself -- dispatch, forwarding, re-arm -- is driven by the board
    /// via `take_rx_frame`, since only the board has the other
    /// interfaces' send paths to forward onto).
    fn poll(&self) -> bool {
        self.rx_frame.map(|_| ()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comms_capsules_core::soft_aes::SoftAesEcb;
    use core::cell::Cell as StdCell;

    struct FixedRtc {
        seconds: StdCell<u32>,
        set: bool,
    }
    impl Rtc for FixedRtc {
        fn get_time(&self) -> u32 {
            self.seconds.get()
        }
        fn set_time(&self, seconds: u32) {
            self.seconds.set(seconds);
        }
        fn is_set(&self) -> bool {
            self.set
        }
    }

    struct NullRadio {
        mode: StdCell<RadioMode>,
    }
    impl Radio for NullRadio {
        fn set_client(&self, _client: &'static dyn RadioClient) {}
        fn mode(&self) -> RadioMode {
            self.mode.get()
        }
        fn start_receiving(&self) -> Result<(), ErrorCode> {
            self.mode.set(RadioMode::Rx);
            Ok(())
        }
        fn send_packet(&self, buf: &'static mut [u8], _len: usize) -> Result<(), (ErrorCode, &'static mut [u8])> {
            self.mode.set(RadioMode::Tx);
            let _ = buf;
            Ok(())
        }
        fn send_packet_at(
            &self,
            buf: &'static mut [u8],
            len: usize,
            _trigger_time: u32,
        ) -> Result<(), (ErrorCode, &'static mut [u8])> {
            self.send_packet(buf, len)
        }
        fn now(&self) -> u32 {
            0
        }
    }

    fn build_rf_frame(
        dest: HwId,
        src: HwId,
        opcode: u8,
        payload: &[u8],
        self_hwid: HwId,
        key: [u8; 16],
        timestamp: u32,
    ) -> ([u8; 64], usize) {
        let header = CommandHeader { sequence_and_reply: 3, destination: dest, source: src, opcode };
        let pkt_len = HEADER_LEN + payload.len() + TIMESTAMP_LEN + MAC_LEN + CRC_LEN;
        let total = 1 + pkt_len;
        let mut buf = [0u8; 64];
        buf[0] = pkt_len as u8;
        header.encode(&mut buf[1..1 + HEADER_LEN]).unwrap();
        buf[1 + HEADER_LEN..1 + HEADER_LEN + payload.len()].copy_from_slice(payload);

        let mut keys = KeyTable::empty();
        keys.set_gs1_key(key);
        let mut cipher = SoftAesEcb::new();
        let rtc = FixedRtc { seconds: StdCell::new(timestamp), set: true };
        let mac_end = 1 + pkt_len - MAC_LEN - CRC_LEN;
        authenticator::add_packet_authent(&mut buf[..mac_end + MAC_LEN], dest, self_hwid, &keys, &mut cipher, &rtc, true);

        let crc_covered = 1 + pkt_len - CRC_LEN;
        let crc = comms_capsules_core::crc16::checksum(&buf[..crc_covered]);
        buf[crc_covered..crc_covered + CRC_LEN].copy_from_slice(&crc.to_le_bytes());

        (buf, total)
    }

    #[test]
    fn crc_mismatch_is_rejected_before_authentication() {
        let radio = NullRadio { mode: StdCell::new(RadioMode::Rx) };
        let mut cipher = SoftAesEcb::new();
        let rtc = FixedRtc { seconds: StdCell::new(100), set: true };
        let link = RadioLink::new(&radio, &mut cipher, &rtc, 0x7005);

        let mut keys = KeyTable::empty();
        keys.set_gs1_key([0x42u8; 16]);
        let (mut buf, total) = build_rf_frame(0x7005, 0x8000, 0x10, &[], 0x7005, [0x42u8; 16], 100);
        buf[total - 1] ^= 0x01;

        let mut telemetry = Telemetry::new();
        let dispatch_telemetry = Telemetry::new();
        let mut authent = true;
        let mut callsign = crate::command_dispatcher::CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: crate::command_dispatcher::MainKeys = [[0u8; 16]; 3];
        let reboot = NullReboot;
        let mut rx_enabled = true;
        let mut dctx = DispatchContext {
            self_hwid: 0x7005,
            rtc: &rtc,
            telemetry: &dispatch_telemetry,
            key_table: &mut keys,
            authent_enabled: &mut authent,
            callsign: &mut callsign,
            radio_regs: &radio_regs,
            main_keys: &main_keys,
            reboot: &reboot,
            rx_enabled: &mut rx_enabled,
        };
        let mut reply_out = [0u8; 32];
        let (outcome, _) = link.process_frame(&buf[..total], &mut telemetry, &mut dctx, &mut reply_out);
        assert_eq!(outcome, RxOutcome::Dropped);
        assert_eq!(telemetry.packets_rejected_checksum, 1);
    }

    #[test]
    fn valid_self_addressed_frame_is_handled() {
        let radio = NullRadio { mode: StdCell::new(RadioMode::Rx) };
        let mut cipher = SoftAesEcb::new();
        let rtc = FixedRtc { seconds: StdCell::new(100), set: true };
        let link = RadioLink::new(&radio, &mut cipher, &rtc, 0x7005);

        let mut keys = KeyTable::empty();
        keys.set_gs1_key([0x42u8; 16]);
        let (buf, total) = build_rf_frame(0x7005, 0x8000, 0x10, &[], 0x7005, [0x42u8; 16], 100);

        let mut telemetry = Telemetry::new();
        let dispatch_telemetry = Telemetry::new();
        let mut authent = true;
        let mut callsign = crate::command_dispatcher::CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: crate::command_dispatcher::MainKeys = [[0u8; 16]; 3];
        let reboot = NullReboot;
        let mut rx_enabled = true;
        let mut dctx = DispatchContext {
            self_hwid: 0x7005,
            rtc: &rtc,
            telemetry: &dispatch_telemetry,
            key_table: &mut keys,
            authent_enabled: &mut authent,
            callsign: &mut callsign,
            radio_regs: &radio_regs,
            main_keys: &main_keys,
            reboot: &reboot,
            rx_enabled: &mut rx_enabled,
        };
        let mut reply_out = [0u8; 32];
        let (outcome, reply) =
            link.process_frame(&buf[..total], &mut telemetry, &mut dctx, &mut reply_out);
        assert_eq!(outcome, RxOutcome::Handled);
        let reply = reply.unwrap();
        assert_eq!(reply.payload_len, 0);
        assert_eq!(reply.header.opcode, crate::command_dispatcher::opcode::ACK);
        assert_eq!(telemetry.packets_good, 1);
    }

    #[test]
    fn foreign_destination_forwards_per_routing_table() {
        let radio = NullRadio { mode: StdCell::new(RadioMode::Rx) };
        let mut cipher = SoftAesEcb::new();
        let rtc = FixedRtc { seconds: StdCell::new(100), set: true };
        let link = RadioLink::new(&radio, &mut cipher, &rtc, 0xffff);

        // OBC (0x7000) sending to GS1 (0x8000): OBC has no key slot, so
        // disable authentication to exercise routing in isolation.
        let header = CommandHeader { sequence_and_reply: 1, destination: 0x8000, source: 0x7000, opcode: 0x10 };
        let pkt_len = HEADER_LEN + TIMESTAMP_LEN + MAC_LEN + CRC_LEN;
        let total = 1 + pkt_len;
        let mut buf = [0u8; 32];
        buf[0] = pkt_len as u8;
        header.encode(&mut buf[1..1 + HEADER_LEN]).unwrap();
        let crc_covered = total - CRC_LEN;
        let crc = comms_capsules_core::crc16::checksum(&buf[..crc_covered]);
        buf[crc_covered..crc_covered + CRC_LEN].copy_from_slice(&crc.to_le_bytes());

        let mut telemetry = Telemetry::new();
        let dispatch_telemetry = Telemetry::new();
        let mut authent = false;
        let mut callsign = crate::command_dispatcher::CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: crate::command_dispatcher::MainKeys = [[0u8; 16]; 3];
        let reboot = NullReboot;
        let mut rx_enabled = true;
        let mut dctx = DispatchContext {
            self_hwid: 0xffff,
            rtc: &rtc,
            telemetry: &dispatch_telemetry,
            key_table: &mut KeyTable::empty(),
            authent_enabled: &mut authent,
            callsign: &mut callsign,
            radio_regs: &radio_regs,
            main_keys: &main_keys,
            reboot: &reboot,
            rx_enabled: &mut rx_enabled,
        };
        let mut reply_out = [0u8; 32];
        let (outcome, _) = link.process_frame(&buf[..total], &mut telemetry, &mut dctx, &mut reply_out);
        assert_eq!(outcome, RxOutcome::Forward(router::Interface::Spi));
    }

    #[test]
    fn ranging_request_is_intercepted_before_dispatch() {
        let radio = NullRadio { mode: StdCell::new(RadioMode::Rx) };
        let mut cipher = SoftAesEcb::new();
        let rtc = FixedRtc { seconds: StdCell::new(100), set: true };
        let link = RadioLink::new(&radio, &mut cipher, &rtc, 0x7005);

        let (buf, total) =
            build_rf_frame(0x7005, 0x8000, crate::command_dispatcher::opcode::RANGING, &[], 0x7005, [0x42u8; 16], 100);

        let mut telemetry = Telemetry::new();
        let dispatch_telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        keys.set_gs1_key([0x42u8; 16]);
        let mut authent = true;
        let mut callsign = crate::command_dispatcher::CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: crate::command_dispatcher::MainKeys = [[0u8; 16]; 3];
        let reboot = NullReboot;
        let mut rx_enabled = true;
        let mut dctx = DispatchContext {
            self_hwid: 0x7005,
            rtc: &rtc,
            telemetry: &dispatch_telemetry,
            key_table: &mut keys,
            authent_enabled: &mut authent,
            callsign: &mut callsign,
            radio_regs: &radio_regs,
            main_keys: &main_keys,
            reboot: &reboot,
            rx_enabled: &mut rx_enabled,
        };
        let mut reply_out = [0u8; 32];
        let (outcome, reply) =
            link.process_frame(&buf[..total], &mut telemetry, &mut dctx, &mut reply_out);
        assert_eq!(outcome, RxOutcome::Handled);
        let reply = reply.unwrap();
        assert_eq!(reply.header.opcode, crate::command_dispatcher::opcode::RANGING_ACK);
        assert_eq!(reply.payload_len, 2);
        assert_eq!(&reply_out[..2], &[RANGING_ACK_TYPE, RANGING_ACK_PROTOCOL_VERSION]);
    }

    struct NullRadioRegs;
    impl comms_kernel::hil::radio_regs::RadioRegisters for NullRadioRegs {
        fn snapshot(&self) -> comms_kernel::hil::radio_regs::RadioTelem {
            comms_kernel::hil::radio_regs::RadioTelem::zeroed()
        }
        fn apply(&self, _telem: &comms_kernel::hil::radio_regs::RadioTelem) {}
        fn reset_to_default(&self) {}
    }

    struct NullReboot;
    impl comms_kernel::scheduler::RebootScheduler for NullReboot {
        fn schedule_reboot(&self, _postpone_seconds: u32) {}
    }
}
