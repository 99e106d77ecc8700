// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Wire packet shapes shared by every interface: the common header every
//! packet (UART, SPI, or RF) carries, and the two framings built on top of
//! it.

use crate::hwid::HwId;

/// Header size in bytes: sequence+reply-bit (2) + destination (2) +
/// source (2) + opcode (1).
pub const HEADER_LEN: usize = 7;

/// Largest payload a local packet can carry (length byte counts
/// everything after itself, and the on-wire max is 234 bytes: 1 length +
/// 7 header + 226 data).
pub const MAX_LOCAL_PAYLOAD_LEN: usize = 226;

pub const MAX_LOCAL_PACKET_LEN: usize = 1 + HEADER_LEN + MAX_LOCAL_PAYLOAD_LEN;

/// Appended to an RF packet's header+payload: a 32-bit timestamp, a
/// 16-byte CBC-MAC, and a 16-bit CRC.
pub const TIMESTAMP_LEN: usize = 4;
pub const MAC_LEN: usize = 16;
pub const CRC_LEN: usize = 2;

/// The header every packet on every interface carries, before payload.
/// Field order matches the wire layout: sequence-and-reply-bit,
/// destination, source, opcode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommandHeader {
    /// Top bit is the reply flag; the low 15 bits are the sequence
    /// number. Commands with the reply bit set arriving at COMMS are
    /// discarded -- COMMS never expects a response to its own requests.
    pub sequence_and_reply: u16,
    pub destination: HwId,
    pub source: HwId,
    pub opcode: u8,
}

const REPLY_BIT: u16 = 0x8000;

impl CommandHeader {
    pub const ENCODED_LEN: usize = HEADER_LEN;

    pub fn sequence(&self) -> u16 {
        self.sequence_and_reply & !REPLY_BIT
    }

    pub fn reply_bit_set(&self) -> bool {
        self.sequence_and_reply & REPLY_BIT != 0
    }

    pub fn with_reply_bit(mut self) -> Self {
        self.sequence_and_reply |= REPLY_BIT;
        self
    }

    pub fn encode(&self, out: &mut [u8]) -> Option<usize> {
        if out.len() < Self::ENCODED_LEN {
            return None;
        }
        out[0..2].copy_from_slice(&self.sequence_and_reply.to_le_bytes());
        out[2..4].copy_from_slice(&self.destination.to_le_bytes());
        out[4..6].copy_from_slice(&self.source.to_le_bytes());
        out[6] = self.opcode;
        Some(Self::ENCODED_LEN)
    }

    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::ENCODED_LEN {
            return None;
        }
        Some(CommandHeader {
            sequence_and_reply: u16::from_le_bytes([buf[0], buf[1]]),
            destination: u16::from_le_bytes([buf[2], buf[3]]),
            source: u16::from_le_bytes([buf[4], buf[5]]),
            opcode: buf[6],
        })
    }

    /// Builds the reply header a dispatcher starts from: request's
    /// sequence with the reply bit set, source and destination swapped,
    /// opcode defaulted to NACK by the caller.
    pub fn reply_to(request: &CommandHeader, self_hwid: HwId, opcode: u8) -> CommandHeader {
        CommandHeader {
            sequence_and_reply: request.sequence_and_reply | REPLY_BIT,
            destination: request.source,
            source: self_hwid,
            opcode,
        }
    }
}

/// A packet as it travels over UART or SPI: header plus payload, framed by
/// the serial framer's sync prefix and length byte (see
/// `comms_capsules_core::serial_framer`). No CRC and no authenticator tag
/// of its own -- local-bus packets are trusted by construction.
pub struct LocalPacket<'a> {
    pub header: CommandHeader,
    pub payload: &'a [u8],
}

impl<'a> LocalPacket<'a> {
    /// The length byte value this packet would be framed with: everything
    /// after the length byte itself.
    pub fn length_byte(&self) -> Option<u8> {
        let total = HEADER_LEN + self.payload.len();
        if total > MAX_LOCAL_PAYLOAD_LEN + HEADER_LEN {
            None
        } else {
            Some(total as u8)
        }
    }
}

/// A packet as it travels over the RF link: header, payload, a 32-bit
/// timestamp, a 16-byte CBC-MAC, and an outermost CRC-16. Only `RfPacket`
/// crosses the authentication and CRC boundary described in the
/// authenticator and router modules.
pub struct RfPacket<'a> {
    pub header: CommandHeader,
    pub payload: &'a [u8],
    pub timestamp: u32,
    pub mac: [u8; MAC_LEN],
    pub crc: u16,
}
