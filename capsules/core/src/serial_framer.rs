// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! The byte-stream framer shared by UART and SPI: a two-byte sync
//! prefix, a length byte, then `length` bytes of local-packet payload.
//! Receive is the four-state machine `wait_for_start0 -> wait_for_start1
//! -> wait_for_length -> receive_data -> wait_for_start0`.
//!
//! The RX slot pool size is a const generic (`SLOTS`) rather than the
//! fixed single slot the original firmware used: a board with more SRAM
//! to spare can absorb bursts of frames without a producer (RF forward,
//! multiple quick local commands) stalling on a single in-use slot. A
//! full pool drops the inbound frame and counts it separately from a CRC
//! or auth rejection (see `Telemetry::dropped_no_slot`), since the frame
//! itself was never even validated, let alone rejected for content.

use comms_kernel::packet::MAX_LOCAL_PACKET_LEN;

pub const ESP_START_BYTE_0: u8 = 0x7e;
pub const ESP_START_BYTE_1: u8 = 0x1e;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RxState {
    WaitForStart0,
    WaitForStart1,
    WaitForLength,
    ReceiveData { expected_len: u8, received: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SlotState {
    Empty,
    Filling { len: u8, received: u8 },
    Ready { len: u8 },
}

#[derive(Copy, Clone)]
struct Slot {
    state: SlotState,
    buf: [u8; MAX_LOCAL_PACKET_LEN],
}

impl Slot {
    const fn new() -> Self {
        Slot {
            state: SlotState::Empty,
            buf: [0u8; MAX_LOCAL_PACKET_LEN],
        }
    }
}

/// A local-bus receive framer with a pool of `SLOTS` in-flight buffers.
/// `process_byte` is intended to be called from the UART/SPI RX ISR, one
/// byte at a time; it only ever writes into a slot's own buffer and
/// advances small state words, honoring the "ISR must not mutate shared
/// buffers beyond appending" rule that applies to every interface here.
pub struct SerialFramer<const SLOTS: usize> {
    rx_state: RxState,
    active_slot: Option<usize>,
    slots: [Slot; SLOTS],
    dropped_no_slot: u32,
    frames_ready: u32,
}

impl<const SLOTS: usize> SerialFramer<SLOTS> {
    pub const fn new() -> Self {
        SerialFramer {
            rx_state: RxState::WaitForStart0,
            active_slot: None,
            slots: [Slot::new(); SLOTS],
            dropped_no_slot: 0,
            frames_ready: 0,
        }
    }

    pub fn dropped_no_slot(&self) -> u32 {
        self.dropped_no_slot
    }

    fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|s| s.state == SlotState::Empty)
    }

    /// Feeds one received byte through the framer's state machine.
    pub fn process_byte(&mut self, byte: u8) {
        match self.rx_state {
            RxState::WaitForStart0 => {
                if byte == ESP_START_BYTE_0 {
                    self.rx_state = RxState::WaitForStart1;
                }
            }
            RxState::WaitForStart1 => {
                if byte == ESP_START_BYTE_1 {
                    self.rx_state = RxState::WaitForLength;
                } else if byte == ESP_START_BYTE_0 {
                    // one-byte resync: stay here
                } else {
                    self.rx_state = RxState::WaitForStart0;
                }
            }
            RxState::WaitForLength => {
                let max_len = (MAX_LOCAL_PACKET_LEN - 1) as u8;
                if byte == 0 || byte > max_len {
                    self.rx_state = RxState::WaitForStart1;
                    return;
                }
                match self.find_free_slot() {
                    Some(idx) => {
                        self.slots[idx].state = SlotState::Filling { len: byte, received: 0 };
                        self.active_slot = Some(idx);
                        self.rx_state = RxState::ReceiveData {
                            expected_len: byte,
                            received: 0,
                        };
                    }
                    None => {
                        self.dropped_no_slot = self.dropped_no_slot.wrapping_add(1);
                        self.rx_state = RxState::WaitForStart0;
                    }
                }
            }
            RxState::ReceiveData { expected_len, received } => {
                let idx = match self.active_slot {
                    Some(idx) => idx,
                    None => {
                        // Should not happen; fail closed.
                        self.rx_state = RxState::WaitForStart0;
                        return;
                    }
                };
                self.slots[idx].buf[received as usize] = byte;
                let received = received + 1;
                if received >= expected_len {
                    self.slots[idx].state = SlotState::Ready { len: expected_len };
                    self.frames_ready = self.frames_ready.wrapping_add(1);
                    self.active_slot = None;
                    self.rx_state = RxState::WaitForStart0;
                } else {
                    self.rx_state = RxState::ReceiveData { expected_len, received };
                }
            }
        }
    }

    /// Pulls the next ready frame, if any, copying it into `out` and
    /// clearing the slot. Returns the number of bytes copied.
    pub fn take_ready_frame(&mut self, out: &mut [u8]) -> Option<usize> {
        for slot in self.slots.iter_mut() {
            if let SlotState::Ready { len } = slot.state {
                let len = len as usize;
                if out.len() < len {
                    return None;
                }
                out[..len].copy_from_slice(&slot.buf[..len]);
                slot.state = SlotState::Empty;
                return Some(len);
            }
        }
        None
    }

    pub fn has_ready_frame(&self) -> bool {
        self.slots.iter().any(|s| matches!(s.state, SlotState::Ready { .. }))
    }
}

impl<const SLOTS: usize> Default for SerialFramer<SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<const SLOTS: usize>(framer: &mut SerialFramer<SLOTS>, bytes: &[u8]) {
        for &b in bytes {
            framer.process_byte(b);
        }
    }

    #[test]
    fn accepts_a_well_formed_frame() {
        let mut framer: SerialFramer<1> = SerialFramer::new();
        feed(&mut framer, &[ESP_START_BYTE_0, ESP_START_BYTE_1, 3, 0xaa, 0xbb, 0xcc]);
        assert!(framer.has_ready_frame());
        let mut out = [0u8; 8];
        let n = framer.take_ready_frame(&mut out).unwrap();
        assert_eq!(&out[..n], &[0xaa, 0xbb, 0xcc]);
        assert!(!framer.has_ready_frame());
    }

    #[test]
    fn start0_in_wait_for_start1_resyncs_without_reset() {
        let mut framer: SerialFramer<1> = SerialFramer::new();
        feed(
            &mut framer,
            &[ESP_START_BYTE_0, ESP_START_BYTE_0, ESP_START_BYTE_1, 1, 0x42],
        );
        assert!(framer.has_ready_frame());
    }

    #[test]
    fn zero_length_is_treated_as_bad_sync() {
        let mut framer: SerialFramer<1> = SerialFramer::new();
        feed(&mut framer, &[ESP_START_BYTE_0, ESP_START_BYTE_1, 0]);
        assert!(!framer.has_ready_frame());
        // Framer should be back in wait_for_start1, so a fresh start1+len+data works.
        feed(&mut framer, &[ESP_START_BYTE_1, 1, 0x55]);
        assert!(framer.has_ready_frame());
    }

    #[test]
    fn oversize_length_is_rejected() {
        let mut framer: SerialFramer<1> = SerialFramer::new();
        feed(&mut framer, &[ESP_START_BYTE_0, ESP_START_BYTE_1, 0xff]);
        assert!(!framer.has_ready_frame());
    }

    #[test]
    fn full_slot_pool_drops_and_counts() {
        let mut framer: SerialFramer<1> = SerialFramer::new();
        feed(&mut framer, &[ESP_START_BYTE_0, ESP_START_BYTE_1, 2, 0x01]);
        // Slot is mid-fill (Filling), not Empty, so a second frame's length
        // byte finds no free slot.
        feed(&mut framer, &[ESP_START_BYTE_0, ESP_START_BYTE_1, 1]);
        assert_eq!(framer.dropped_no_slot(), 1);
    }

    #[test]
    fn multi_slot_pool_absorbs_a_second_frame_while_first_unconsumed() {
        let mut framer: SerialFramer<2> = SerialFramer::new();
        feed(&mut framer, &[ESP_START_BYTE_0, ESP_START_BYTE_1, 1, 0x01]);
        feed(&mut framer, &[ESP_START_BYTE_0, ESP_START_BYTE_1, 1, 0x02]);
        assert_eq!(framer.dropped_no_slot(), 0);
        let mut out = [0u8; 4];
        let n1 = framer.take_ready_frame(&mut out).unwrap();
        assert_eq!(out[0..n1], [0x01]);
        let n2 = framer.take_ready_frame(&mut out).unwrap();
        assert_eq!(out[0..n2], [0x02]);
    }
}
