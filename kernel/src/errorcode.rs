// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Internal fallible-operation error type.
//!
//! This is distinct from the wire-visible error taxonomy (CRC/auth/other
//! rejection counters, command NACKs): `ErrorCode` is how one Rust module
//! tells another "this call did not do what you asked", the same role the
//! teacher's `kernel::ErrorCode` plays for e.g. `AesDriver::perform_crypt`
//! returning `Result<(), (ErrorCode, ..)>`.

/// Standard errors returned by `hil` trait methods.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// The resource is in use by someone else right now.
    Busy,
    /// Argument was out of the accepted range (e.g. write length, page
    /// index, selector value).
    Inval,
    /// The operation failed for a reason besides busy/inval (flash
    /// program/erase failure, DMA abort).
    Fail,
    /// No buffer available to complete the operation.
    NoMem,
    /// The underlying peripheral is powered down / not initialized.
    Off,
    /// Requested size does not match what the operation can move.
    Size,
}

pub type Result<T> = core::result::Result<T, ErrorCode>;
