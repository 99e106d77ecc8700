// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! The local-bus (UART or SPI) half of packet handling: decode a framed
//! `LocalPacket`, route it, and either dispatch it or hand it back to
//! the caller to forward. Shared by both interfaces since neither one
//! adds anything the other doesn't -- a local packet carries no CRC or
//! authenticator tag of its own (`packet::LocalPacket`'s doc: "local-bus
//! packets are trusted by construction").

use comms_kernel::hwid::HwId;
use comms_kernel::packet::{CommandHeader, HEADER_LEN};
use comms_kernel::telemetry::Telemetry;

use crate::command_dispatcher::{self, DispatchContext, Reply};
use crate::radio_link::RxOutcome;
use crate::router::{self, RouteDecision};

pub struct LocalLink {
    self_hwid: HwId,
}

impl LocalLink {
    pub fn new(self_hwid: HwId) -> Self {
        LocalLink { self_hwid }
    }

    /// Decodes and routes one frame already pulled out of a
    /// `SerialFramer` slot (`buf` is header + payload, no length byte --
    /// the framer already consumed it). Mirrors
    /// `radio_link::RadioLink::process_frame`'s three-way outcome, minus
    /// the CRC/authenticator steps this interface has none of.
    pub fn process_frame(
        &self,
        buf: &[u8],
        telemetry: &mut Telemetry,
        dispatch_ctx: &mut DispatchContext,
        reply_out: &mut [u8],
    ) -> (RxOutcome, Option<Reply>) {
        if buf.len() < HEADER_LEN {
            telemetry.note_rejected_other();
            return (RxOutcome::Dropped, None);
        }
        let header = match CommandHeader::decode(&buf[..HEADER_LEN]) {
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
                let payload = &buf[HEADER_LEN..];
                let reply = command_dispatcher::dispatch(&header, payload, dispatch_ctx, reply_out);
                (RxOutcome::Handled, reply)
            }
        }
    }

    /// Frames a reply for transmission: length byte, header, payload.
    /// Returns the total frame length, or `None` if it would not fit in
    /// `out` or exceeds the local packet size limit.
    pub fn build_reply_frame(&self, header: &CommandHeader, payload: &[u8], out: &mut [u8]) -> Option<usize> {
        use comms_kernel::packet::LocalPacket;
        let framed = LocalPacket { header: *header, payload };
        let length_byte = framed.length_byte()?;
        let total = 1 + length_byte as usize;
        if out.len() < total {
            return None;
        }
        out[0] = length_byte;
        header.encode(&mut out[1..1 + HEADER_LEN])?;
        out[1 + HEADER_LEN..total].copy_from_slice(payload);
        Some(total)
    }
}
