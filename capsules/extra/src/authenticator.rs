// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Per-packet CBC-MAC authentication and timestamp freshness check for RF
//! traffic, grounded on `authent.c`'s `check_packet_authent` /
//! `add_packet_authent`. Operates directly on the on-wire byte buffer
//! (length byte through CRC) the same way the original does, rather than
//! on a decoded struct, since the MAC covers a specific contiguous byte
//! range of that buffer.

use comms_capsules_core::cbc_mac;
use comms_kernel::hil::aes_ecb::AesEcb;
use comms_kernel::hil::rtc::Rtc;
use comms_kernel::hwid::{dest_from_hwid, Destination, HwId, NUM_DESTS};
use comms_kernel::packet::{CommandHeader, CRC_LEN, HEADER_LEN, MAC_LEN, TIMESTAMP_LEN};

/// Source window the authenticator accepts a timestamp within, once the
/// RTC is set: `current_seconds <= timestamp + window`. A packet may be
/// arbitrarily far in the future (the window is asymmetric) but not more
/// than `window` seconds old.
pub const TIMESTAMP_VALID_WINDOW_SECONDS: u32 = 5;

/// Per-destination AES-128 keys. `Obc`, `Comms`, and `LocalDebug` have no
/// slot (`None`): a source in one of these logical destinations never
/// has its traffic authenticated, and as a transmit destination, a
/// packet addressed there takes the local, non-RF path instead. The Aro
/// slot is the only one writable at runtime (`set_aro_key`), matching
/// "the ARO key lives in RAM and is set via an authenticated command
/// from OBC".
pub struct KeyTable {
    keys: [Option<[u8; 16]>; NUM_DESTS],
}

impl KeyTable {
    pub const fn empty() -> Self {
        KeyTable { keys: [None; NUM_DESTS] }
    }

    pub fn set_gs1_key(&mut self, key: [u8; 16]) {
        self.keys[Destination::Gs1.table_index().unwrap()] = Some(key);
    }

    pub fn set_gs2_key(&mut self, key: [u8; 16]) {
        self.keys[Destination::Gs2.table_index().unwrap()] = Some(key);
    }

    pub fn set_aro_key(&mut self, key: [u8; 16]) {
        self.keys[Destination::Aro.table_index().unwrap()] = Some(key);
    }

    pub fn aro_key(&self) -> Option<[u8; 16]> {
        self.keys[Destination::Aro.table_index().unwrap()]
    }

    pub fn key_for(&self, dest: Destination) -> Option<[u8; 16]> {
        dest.table_index().and_then(|i| self.keys[i])
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::empty()
    }
}

/// Splits an RF buffer `[length_byte, header(7), payload..., timestamp(4),
/// mac(16), crc(2)]` into the MAC-covered prefix and the MAC field
/// itself. `pkt_len` is the value of the length byte (bytes after it).
fn mac_covered_len(pkt_len: usize) -> Option<usize> {
    let footer_len = TIMESTAMP_LEN + MAC_LEN + CRC_LEN;
    if pkt_len < HEADER_LEN + footer_len {
        return None;
    }
    // Everything up to (not including) the MAC field: length byte +
    // header + payload + timestamp.
    Some(1 + pkt_len - MAC_LEN - CRC_LEN)
}

/// Verifies the CBC-MAC and timestamp of an inbound RF packet.
/// `buf` is `[length_byte, header, payload, timestamp, mac, crc]`; `buf[0]`
/// is the length byte and `pkt_len = buf[0] as usize`.
pub fn check_packet_authent(
    buf: &[u8],
    self_hwid: HwId,
    key_table: &KeyTable,
    cipher: &mut dyn AesEcb,
    rtc: &dyn Rtc,
    authent_enabled: bool,
) -> bool {
    let pkt_len = match buf.first() {
        Some(&b) => b as usize,
        None => return false,
    };
    let mac_end = match mac_covered_len(pkt_len) {
        Some(v) => v,
        None => return false,
    };
    if buf.len() < mac_end + MAC_LEN {
        return false;
    }

    let header = match CommandHeader::decode(&buf[1..1 + HEADER_LEN]) {
        Some(h) => h,
        None => return false,
    };

    let src = dest_from_hwid(header.source, self_hwid);
    if src == Destination::Invalid {
        return false;
    }
    if src == Destination::Aro {
        let dst = dest_from_hwid(header.destination, self_hwid);
        if dst != Destination::Obc {
            return false;
        }
    }

    let key = match key_table.key_for(src) {
        Some(k) => k,
        None => return false,
    };

    if !authent_enabled {
        return true;
    }

    let mac = cbc_mac::compute(cipher, &key, &buf[..mac_end]);
    let received_mac = &buf[mac_end..mac_end + MAC_LEN];
    if !cbc_mac::constant_time_eq(&mac, received_mac) {
        return false;
    }

    if rtc.is_set() {
        let timestamp = u32::from_be_bytes(buf[mac_end - TIMESTAMP_LEN..mac_end].try_into().unwrap());
        if rtc.get_time() > timestamp.saturating_add(TIMESTAMP_VALID_WINDOW_SECONDS) {
            return false;
        }
    }

    true
}

/// Appends timestamp and CBC-MAC to an outbound RF packet buffer already
/// holding `[length_byte, header, payload, <4 zero timestamp bytes>, <16
/// zero mac bytes>, <2 zero crc bytes>]`. Returns `false` (and leaves the
/// buffer unmodified beyond what was already there) if the destination
/// has no key -- the caller must not transmit in that case.
pub fn add_packet_authent(
    buf: &mut [u8],
    dest_hwid: HwId,
    self_hwid: HwId,
    key_table: &KeyTable,
    cipher: &mut dyn AesEcb,
    rtc: &dyn Rtc,
    authent_enabled: bool,
) -> bool {
    let pkt_len = match buf.first() {
        Some(&b) => b as usize,
        None => return false,
    };
    let mac_end = match mac_covered_len(pkt_len) {
        Some(v) => v,
        None => return false,
    };
    if buf.len() < mac_end + MAC_LEN {
        return false;
    }

    let dest = dest_from_hwid(dest_hwid, self_hwid);
    if dest == Destination::Invalid {
        return false;
    }
    let key = match key_table.key_for(dest) {
        Some(k) => k,
        None => return false,
    };

    if !authent_enabled {
        for b in &mut buf[mac_end - TIMESTAMP_LEN..mac_end + MAC_LEN] {
            *b = 0;
        }
        return true;
    }

    let timestamp: u32 = if rtc.is_set() { rtc.get_time() } else { 0 };
    buf[mac_end - TIMESTAMP_LEN..mac_end].copy_from_slice(&timestamp.to_be_bytes());

    let mac = cbc_mac::compute(cipher, &key, &buf[..mac_end]);
    buf[mac_end..mac_end + MAC_LEN].copy_from_slice(&mac);

    true
}
