// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Health telemetry counters, transcribed field-for-field from the flight
//! firmware's `telemetry_t` struct so that `GET_TELEM` replies keep the
//! layout ground stations already parse.

/// Running counters and last-sample radio metrics, updated by the
/// scheduler and interface drivers as packets move through the system.
#[derive(Copy, Clone, Debug, Default)]
pub struct Telemetry {
    pub uptime_seconds: u32,

    pub spi_rx_count: u32,
    pub uart1_rx_count: u32,

    /// 0 = RX, 1 = TX, matches the radio FSM's public state.
    pub rx_mode: u8,
    pub tx_mode: u8,

    pub adc: [u16; 4],

    pub last_rssi: i16,
    pub last_lqi: u8,
    pub last_freqest: i8,

    pub packets_sent: u32,
    pub cs_count: u32,
    pub packets_good: u32,
    pub packets_rejected_checksum: u32,
    pub packets_rejected_authent: u32,
    pub packets_rejected_other: u32,

    /// Packets dropped for lack of a free RX slot in the serial framer's
    /// slot pool (see the Open Question decision in the serial framer's
    /// module docs).
    pub dropped_no_slot: u32,

    pub custom0: u32,
    pub custom1: u32,
}

impl Telemetry {
    pub const fn new() -> Self {
        Telemetry {
            uptime_seconds: 0,
            spi_rx_count: 0,
            uart1_rx_count: 0,
            rx_mode: 0,
            tx_mode: 0,
            adc: [0; 4],
            last_rssi: 0,
            last_lqi: 0,
            last_freqest: 0,
            packets_sent: 0,
            cs_count: 0,
            packets_good: 0,
            packets_rejected_checksum: 0,
            packets_rejected_authent: 0,
            packets_rejected_other: 0,
            dropped_no_slot: 0,
            custom0: 0,
            custom1: 0,
        }
    }

    pub const ENCODED_LEN: usize = 4 + 4 + 4 + 1 + 1 + 8 + 2 + 1 + 1 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 4 + 4;

    /// Serializes in `telemetry_t` field order, little-endian, for the
    /// `GET_TELEM` reply payload.
    pub fn encode(&self, out: &mut [u8]) -> Option<usize> {
        if out.len() < Self::ENCODED_LEN {
            return None;
        }
        let mut i = 0;
        macro_rules! put {
            ($bytes:expr) => {{
                let b = $bytes;
                out[i..i + b.len()].copy_from_slice(&b);
                i += b.len();
            }};
        }
        put!(self.uptime_seconds.to_le_bytes());
        put!(self.spi_rx_count.to_le_bytes());
        put!(self.uart1_rx_count.to_le_bytes());
        out[i] = self.rx_mode;
        i += 1;
        out[i] = self.tx_mode;
        i += 1;
        for sample in &self.adc {
            put!(sample.to_le_bytes());
        }
        put!(self.last_rssi.to_le_bytes());
        out[i] = self.last_lqi;
        i += 1;
        out[i] = self.last_freqest as u8;
        i += 1;
        put!(self.packets_sent.to_le_bytes());
        put!(self.cs_count.to_le_bytes());
        put!(self.packets_good.to_le_bytes());
        put!(self.packets_rejected_checksum.to_le_bytes());
        put!(self.packets_rejected_authent.to_le_bytes());
        put!(self.packets_rejected_other.to_le_bytes());
        put!(self.dropped_no_slot.to_le_bytes());
        put!(self.custom0.to_le_bytes());
        put!(self.custom1.to_le_bytes());
        Some(i)
    }

    pub fn note_rejected_checksum(&mut self) {
        self.packets_rejected_checksum = self.packets_rejected_checksum.wrapping_add(1);
    }

    pub fn note_rejected_authent(&mut self) {
        self.packets_rejected_authent = self.packets_rejected_authent.wrapping_add(1);
    }

    pub fn note_rejected_other(&mut self) {
        self.packets_rejected_other = self.packets_rejected_other.wrapping_add(1);
    }

    pub fn note_good(&mut self) {
        self.packets_good = self.packets_good.wrapping_add(1);
    }

    pub fn note_sent(&mut self) {
        self.packets_sent = self.packets_sent.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_telemetry_is_all_zero() {
        let t = Telemetry::new();
        assert_eq!(t.packets_good, 0);
        assert_eq!(t.adc, [0; 4]);
    }

    #[test]
    fn encode_fills_exact_length() {
        let t = Telemetry::new();
        let mut buf = [0xffu8; Telemetry::ENCODED_LEN];
        let n = t.encode(&mut buf).unwrap();
        assert_eq!(n, Telemetry::ENCODED_LEN);
    }

    #[test]
    fn encode_rejects_short_buffer() {
        let t = Telemetry::new();
        let mut buf = [0u8; 4];
        assert!(t.encode(&mut buf).is_none());
    }

    #[test]
    fn counters_saturate_by_wrapping_not_panicking() {
        let mut t = Telemetry::new();
        t.packets_good = u32::MAX;
        t.note_good();
        assert_eq!(t.packets_good, 0);
    }
}
