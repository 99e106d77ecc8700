// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Byte-oriented UART transmit/receive, the interface the OBC local-bus
//! link and the ground-debug console both run over. Grounded on the
//! teacher's `hil::uart::{Transmit, Receive}` split -- kept as two traits
//! here too, since the debug console only ever transmits.

use crate::ErrorCode;

pub trait TransmitClient {
    /// `tx_buffer` is handed back so the caller can reuse or refill it.
    fn transmitted_buffer(&self, tx_buffer: &'static mut [u8], tx_len: usize, result: Result<(), ErrorCode>);
}

pub trait Transmit {
    fn set_transmit_client(&self, client: &'static dyn TransmitClient);

    /// Starts sending `tx_len` bytes of `tx_buffer`. Completion arrives
    /// via `TransmitClient::transmitted_buffer`, from the UART's TX-done
    /// ISR.
    fn transmit_buffer(
        &self,
        tx_buffer: &'static mut [u8],
        tx_len: usize,
    ) -> Result<(), (ErrorCode, &'static mut [u8])>;
}

pub trait ReceiveClient {
    /// Called once per received byte, from the UART's RX ISR. Returning
    /// control immediately back to the ISR is required: no buffer
    /// mutation besides appending this byte, no blocking call.
    fn received_byte(&self, byte: u8);
}

pub trait Receive {
    fn set_receive_client(&self, client: &'static dyn ReceiveClient);
    fn start_receive(&self) -> Result<(), ErrorCode>;
    fn stop_receive(&self) -> Result<(), ErrorCode>;
}
