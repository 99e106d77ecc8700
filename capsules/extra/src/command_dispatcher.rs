// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Opcode-indexed command dispatcher: turns a decoded inbound
//! `CommandHeader` + payload into a reply header + payload. Grounded on
//! `comms-firmware/.../cmd_sys/commands.c`'s `commands_handle_command`
//! (the common opcodes) and `alea-fsw/.../cmd_sys/commands.c`'s
//! `custom_commands` (the radiotelem opcodes), transcribed switch-arm by
//! switch-arm rather than re-derived from the prose summary in spec.md
//! §4.8.

use comms_kernel::hil::radio_regs::RadioRegisters;
use comms_kernel::hil::rtc::Rtc;
use comms_kernel::hwid::HwId;
use comms_kernel::packet::CommandHeader;
use comms_kernel::scheduler::RebootScheduler;
use comms_kernel::telemetry::Telemetry;

use crate::authenticator::KeyTable;

pub mod opcode {
    pub const ACK: u8 = 0x10;
    pub const NACK: u8 = 0xff;
    pub const REBOOT: u8 = 0x12;
    pub const GET_TIME: u8 = 0x13;
    pub const SET_TIME: u8 = 0x14;
    pub const RANGING: u8 = 0x15;
    pub const RANGING_ACK: u8 = 0x16;
    pub const GET_TELEM: u8 = 0x17;
    pub const TELEM: u8 = 0x18;
    pub const GET_CALLSIGN: u8 = 0x19;
    pub const SET_CALLSIGN: u8 = 0x1a;
    pub const CALLSIGN: u8 = 0x1b;
    pub const START: u8 = 0x1e;
    pub const REBOOTING: u8 = 0x1f;
    pub const GET_RADIOTELEM: u8 = 0x21;
    pub const RADIOTELEM: u8 = 0x22;
    pub const SET_RADIOTELEM: u8 = 0x23;
    pub const RESET_RADIOTELEM: u8 = 0x24;
    pub const SET_RX_ENABLED: u8 = 0x2a;
    pub const FORWARD_READY: u8 = 0x31;
    pub const GET_AUTHENT: u8 = 0x40;
    pub const AUTHENT_STATUS: u8 = 0x41;
    pub const SET_AUTHENT: u8 = 0x42;
    pub const GET_ARO_KEY: u8 = 0x43;
    pub const ARO_KEY: u8 = 0x44;
    pub const SET_ARO_KEY: u8 = 0x45;
    pub const GET_MAIN_KEY: u8 = 0x50;
    pub const MAIN_KEY: u8 = 0x51;
    pub const UPDATE_TELEM: u8 = 0x58;
    pub const SEND_TEST_DATA: u8 = 0x59;
    pub const OBC_DATA: u8 = 0x60;
}

/// Seconds a `REBOOT` postpone value may request before it is NACKed
/// instead of scheduled; matches the original firmware's
/// `AUTO_REBOOT_MAX`.
pub const AUTO_REBOOT_MAX_SECONDS: u32 = 604_800;

/// Fixed-size callsign buffer, zero-padded on write, read back verbatim.
pub const CALLSIGN_LEN: usize = 8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallsignStore([u8; CALLSIGN_LEN]);

impl CallsignStore {
    pub const fn empty() -> Self {
        CallsignStore([0u8; CALLSIGN_LEN])
    }

    pub fn set(&mut self, data: &[u8]) {
        self.0 = [0u8; CALLSIGN_LEN];
        let n = data.len().min(CALLSIGN_LEN);
        self.0[..n].copy_from_slice(&data[..n]);
    }

    pub fn get(&self) -> &[u8; CALLSIGN_LEN] {
        &self.0
    }
}

impl Default for CallsignStore {
    fn default() -> Self {
        Self::empty()
    }
}

/// The two ground-station signing keys plus the signature-verification
/// key, read-only at runtime (provisioned alongside the bootloader's own
/// copies). Indexed by `GET_MAIN_KEY`'s selector: 0 = GS1, 1 = GS2, 2 =
/// signing key.
pub type MainKeys = [[u8; 16]; 3];

/// Everything a single `dispatch` call needs besides the request itself.
/// Borrowed, not owned: the board wires these to the real RTC, telemetry
/// record, key table, etc.
pub struct DispatchContext<'a> {
    pub self_hwid: HwId,
    pub rtc: &'a dyn Rtc,
    pub telemetry: &'a Telemetry,
    pub key_table: &'a mut KeyTable,
    pub authent_enabled: &'a mut bool,
    pub callsign: &'a mut CallsignStore,
    pub radio_regs: &'a dyn RadioRegisters,
    pub main_keys: &'a MainKeys,
    pub reboot: &'a dyn RebootScheduler,
    pub rx_enabled: &'a mut bool,
}

/// A reply produced by `dispatch`: header plus however much of `out` the
/// handler filled in. `None` payload length means "do not send a reply at
/// all" (reply-bit-set inbound, the ranging special case that mutes the
/// ordinary response path).
pub struct Reply {
    pub header: CommandHeader,
    pub payload_len: usize,
}

/// Dispatches one decoded request. `payload` is the request's data past
/// the header; `out` is scratch space the handler may fill starting at
/// index 0, sized at least `comms_kernel::packet::MAX_LOCAL_PAYLOAD_LEN`.
/// Returns `None` if the request must be silently dropped (reply bit
/// already set -- COMMS never expects a response to its own requests).
pub fn dispatch(request: &CommandHeader, payload: &[u8], ctx: &mut DispatchContext, out: &mut [u8]) -> Option<Reply> {
    if request.reply_bit_set() {
        return None;
    }

    let mut reply_header = CommandHeader::reply_to(request, ctx.self_hwid, opcode::NACK);
    let mut payload_len = 0usize;

    match request.opcode {
        opcode::ACK => {
            reply_header.opcode = opcode::ACK;
        }
        opcode::NACK => {
            reply_header.opcode = opcode::NACK;
        }
        opcode::REBOOT => {
            if payload.is_empty() {
                // No postpone field: reboot unconditionally and immediately.
                reply_header.opcode = opcode::ACK;
                ctx.reboot.schedule_reboot(0);
            } else if payload.len() >= 4 {
                let postpone = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                if postpone <= AUTO_REBOOT_MAX_SECONDS {
                    reply_header.opcode = opcode::ACK;
                    ctx.reboot.schedule_reboot(postpone);
                } else {
                    reply_header.opcode = opcode::NACK;
                }
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::GET_TIME => {
            if ctx.rtc.is_set() {
                reply_header.opcode = opcode::SET_TIME;
                let bytes = ctx.rtc.get_time().to_le_bytes();
                out[..4].copy_from_slice(&bytes);
                payload_len = 4;
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::SET_TIME => {
            if payload.len() >= 4 {
                let seconds = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
                ctx.rtc.set_time(seconds);
                reply_header.opcode = opcode::ACK;
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::GET_TELEM => {
            if let Some(n) = ctx.telemetry.encode(out) {
                reply_header.opcode = opcode::TELEM;
                payload_len = n;
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::SET_RX_ENABLED => {
            *ctx.rx_enabled = payload.first().copied().unwrap_or(0) != 0;
            reply_header.opcode = opcode::ACK;
        }
        opcode::SET_CALLSIGN => {
            ctx.callsign.set(payload);
            reply_header.opcode = opcode::ACK;
        }
        opcode::GET_CALLSIGN => {
            let callsign = ctx.callsign.get();
            out[..CALLSIGN_LEN].copy_from_slice(callsign);
            reply_header.opcode = opcode::CALLSIGN;
            payload_len = CALLSIGN_LEN;
        }
        opcode::GET_AUTHENT => {
            out[0] = *ctx.authent_enabled as u8;
            reply_header.opcode = opcode::AUTHENT_STATUS;
            payload_len = 1;
        }
        opcode::SET_AUTHENT => {
            *ctx.authent_enabled = payload.first().copied().unwrap_or(0) != 0;
            reply_header.opcode = opcode::ACK;
        }
        opcode::GET_ARO_KEY => {
            if let Some(key) = ctx.key_table.aro_key() {
                out[..16].copy_from_slice(&key);
                reply_header.opcode = opcode::ARO_KEY;
                payload_len = 16;
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::SET_ARO_KEY => {
            if payload.len() >= 16 {
                let mut key = [0u8; 16];
                key.copy_from_slice(&payload[..16]);
                ctx.key_table.set_aro_key(key);
                reply_header.opcode = opcode::ACK;
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::GET_MAIN_KEY => {
            match payload.first().copied() {
                Some(selector) if (selector as usize) < ctx.main_keys.len() => {
                    out[..16].copy_from_slice(&ctx.main_keys[selector as usize]);
                    reply_header.opcode = opcode::MAIN_KEY;
                    payload_len = 16;
                }
                _ => {
                    reply_header.opcode = opcode::NACK;
                }
            }
        }
        opcode::UPDATE_TELEM => {
            // Refreshing the live telemetry snapshot from ADC/radio
            // status registers is chip glue the board crate performs
            // before handing `ctx.telemetry` to dispatch; this opcode
            // just ACKs having done so.
            reply_header.opcode = opcode::ACK;
        }
        opcode::SEND_TEST_DATA => {
            let n = payload.first().copied().unwrap_or(0) as usize;
            if n <= out.len() {
                if n > 0 {
                    out[0] = n as u8;
                    for b in &mut out[1..n] {
                        *b = 0;
                    }
                }
                reply_header.opcode = opcode::SEND_TEST_DATA;
                payload_len = n;
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::GET_RADIOTELEM => {
            let telem = ctx.radio_regs.snapshot();
            out[..telem.0.len()].copy_from_slice(&telem.0);
            reply_header.opcode = opcode::RADIOTELEM;
            payload_len = telem.0.len();
        }
        opcode::SET_RADIOTELEM => {
            use comms_kernel::hil::radio_regs::{RadioTelem, RADIOTELEM_LEN};
            if payload.len() >= RADIOTELEM_LEN {
                let mut bytes = [0u8; RADIOTELEM_LEN];
                bytes.copy_from_slice(&payload[..RADIOTELEM_LEN]);
                ctx.radio_regs.apply(&RadioTelem(bytes));
                reply_header.opcode = opcode::ACK;
            } else {
                reply_header.opcode = opcode::NACK;
            }
        }
        opcode::RESET_RADIOTELEM => {
            ctx.radio_regs.reset_to_default();
            reply_header.opcode = opcode::ACK;
        }
        _ => {
            // Unknown opcode (including RANGING, which `radio_link`
            // intercepts before this dispatcher ever sees it, since its
            // reply must go out over the precise-timing path instead of
            // the ordinary one): fall through to the default NACK already
            // set in `reply_header`.
        }
    }

    Some(Reply { header: reply_header, payload_len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::KeyTable;
    use core::cell::Cell;

    struct FixedRtc {
        seconds: Cell<u32>,
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

    struct NullRadioRegs;
    impl RadioRegisters for NullRadioRegs {
        fn snapshot(&self) -> comms_kernel::hil::radio_regs::RadioTelem {
            comms_kernel::hil::radio_regs::RadioTelem::zeroed()
        }
        fn apply(&self, _telem: &comms_kernel::hil::radio_regs::RadioTelem) {}
        fn reset_to_default(&self) {}
    }

    struct RecordingReboot {
        postponed: Cell<Option<u32>>,
    }
    impl RebootScheduler for RecordingReboot {
        fn schedule_reboot(&self, postpone_seconds: u32) {
            self.postponed.set(Some(postpone_seconds));
        }
    }

    fn request(opcode: u8) -> CommandHeader {
        CommandHeader {
            sequence_and_reply: 42,
            destination: 0x7005,
            source: 0x7000,
            opcode,
        }
    }

    fn new_ctx<'a>(
        rtc: &'a FixedRtc,
        telemetry: &'a Telemetry,
        key_table: &'a mut KeyTable,
        authent_enabled: &'a mut bool,
        callsign: &'a mut CallsignStore,
        radio_regs: &'a NullRadioRegs,
        main_keys: &'a MainKeys,
        reboot: &'a RecordingReboot,
        rx_enabled: &'a mut bool,
    ) -> DispatchContext<'a> {
        DispatchContext {
            self_hwid: 0x7005,
            rtc,
            telemetry,
            key_table,
            authent_enabled,
            callsign,
            radio_regs,
            main_keys,
            reboot,
            rx_enabled,
        }
    }

    #[test]
    fn reply_bit_set_on_inbound_is_dropped() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::ACK).with_reply_bit();
        let mut out = [0u8; 64];
        assert!(dispatch(&req, &[], &mut ctx, &mut out).is_none());
    }

    #[test]
    fn unknown_opcode_nacks() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(0x99);
        let mut out = [0u8; 64];
        let reply = dispatch(&req, &[], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::NACK);
        assert_eq!(reply.header.destination, 0x7000);
        assert_eq!(reply.header.source, 0x7005);
        assert!(reply.header.reply_bit_set());
    }

    #[test]
    fn bare_reboot_fires_immediately() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::REBOOT);
        let mut out = [0u8; 64];
        let reply = dispatch(&req, &[], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::ACK);
        assert_eq!(reboot.postponed.get(), Some(0));
    }

    #[test]
    fn reboot_postpone_within_cap_is_scheduled() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::REBOOT);
        let payload = 60u32.to_le_bytes();
        let mut out = [0u8; 64];
        let reply = dispatch(&req, &payload, &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::ACK);
        assert_eq!(reboot.postponed.get(), Some(60));
    }

    #[test]
    fn reboot_postpone_beyond_cap_is_nacked() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::REBOOT);
        let payload = (AUTO_REBOOT_MAX_SECONDS + 1).to_le_bytes();
        let mut out = [0u8; 64];
        let reply = dispatch(&req, &payload, &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::NACK);
        assert_eq!(reboot.postponed.get(), None);
    }

    #[test]
    fn get_time_nacks_when_rtc_unset() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::GET_TIME);
        let mut out = [0u8; 64];
        let reply = dispatch(&req, &[], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::NACK);
    }

    #[test]
    fn get_time_replies_with_set_time_opcode_when_rtc_set() {
        let rtc = FixedRtc { seconds: Cell::new(12345), set: true };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::GET_TIME);
        let mut out = [0u8; 64];
        let reply = dispatch(&req, &[], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::SET_TIME);
        assert_eq!(reply.payload_len, 4);
        assert_eq!(u32::from_le_bytes([out[0], out[1], out[2], out[3]]), 12345);
    }

    #[test]
    fn callsign_round_trips_and_zero_pads() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let set_req = request(opcode::SET_CALLSIGN);
        let mut out = [0u8; 64];
        let reply = dispatch(&set_req, b"KJ6Z", &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::ACK);

        let get_req = request(opcode::GET_CALLSIGN);
        let reply = dispatch(&get_req, &[], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::CALLSIGN);
        assert_eq!(&out[..CALLSIGN_LEN], b"KJ6Z\0\0\0\0");
    }

    #[test]
    fn get_main_key_rejects_selector_outside_zero_to_two() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0x11u8; 16], [0x22u8; 16], [0x33u8; 16]];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::GET_MAIN_KEY);
        let mut out = [0u8; 64];
        let reply = dispatch(&req, &[2], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::MAIN_KEY);
        assert_eq!(&out[..16], &[0x33u8; 16]);

        let reply = dispatch(&req, &[3], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::NACK);
    }

    #[test]
    fn send_test_data_echoes_length_and_nacks_oversize() {
        let rtc = FixedRtc { seconds: Cell::new(0), set: false };
        let telemetry = Telemetry::new();
        let mut keys = KeyTable::empty();
        let mut authent = true;
        let mut callsign = CallsignStore::empty();
        let radio_regs = NullRadioRegs;
        let main_keys: MainKeys = [[0u8; 16]; 3];
        let reboot = RecordingReboot { postponed: Cell::new(None) };
        let mut rx_enabled = true;
        let mut ctx = new_ctx(
            &rtc, &telemetry, &mut keys, &mut authent, &mut callsign, &radio_regs, &main_keys, &reboot, &mut rx_enabled,
        );

        let req = request(opcode::SEND_TEST_DATA);
        let mut out = [0u8; 4];
        let reply = dispatch(&req, &[4], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::SEND_TEST_DATA);
        assert_eq!(reply.payload_len, 4);
        assert_eq!(out[0], 4);

        let reply = dispatch(&req, &[5], &mut ctx, &mut out).unwrap();
        assert_eq!(reply.header.opcode, opcode::NACK);
    }
}
