// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Program-flash access: page writes and region erase, the two operations
//! the bootloader's command loop performs. Grounded on the original
//! firmware's `flash.h` error taxonomy and the teacher's callback-based
//! `hil::flash::HasClient`.

use crate::ErrorCode;

pub const PAGE_LEN: usize = 128;

/// Specific failure reasons a flash write/erase can report, matching the
/// bootloader's `FLASH_WRITE_ERR_*` constants rather than the generic
/// `ErrorCode` set (a careful caller distinguishes "page is
/// write-protected" from "bad address").
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlashError {
    Protected,
    BadAddress,
    Unknown,
}

impl From<FlashError> for ErrorCode {
    fn from(e: FlashError) -> ErrorCode {
        match e {
            FlashError::Protected => ErrorCode::Fail,
            FlashError::BadAddress => ErrorCode::Inval,
            FlashError::Unknown => ErrorCode::Fail,
        }
    }
}

pub trait FlashClient {
    fn write_page_done(&self, page: u32, result: Result<(), FlashError>);
    fn erase_done(&self, result: Result<(), FlashError>);
}

/// Program-flash driver. Implementations own the chip-specific unlock
/// sequence and page geometry; callers deal only in page indices.
pub trait Flash {
    fn set_client(&self, client: &'static dyn FlashClient);

    /// Programs one page. `data` must be exactly `PAGE_LEN` bytes;
    /// completion arrives via `FlashClient::write_page_done`.
    fn write_page(&self, page: u32, data: &'static mut [u8; PAGE_LEN]) -> Result<(), ErrorCode>;

    /// Erases the application flash region. Completion arrives via
    /// `FlashClient::erase_done`.
    fn erase_application_region(&self) -> Result<(), ErrorCode>;
}
