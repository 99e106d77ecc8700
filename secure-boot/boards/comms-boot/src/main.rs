// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Power-on entry point: disable interrupts, start the watchdog, bring
//! up clock/DMA/UART/SPI/radio, enable interrupts, then hand the byte
//! stream to `secure_boot_common::updater::Updater` until it validates
//! an image or the soft timeout expires (§4.9). Register-level chip
//! detail is out of scope here -- `Mcu` below is the thin seam a real
//! board support package would fill in; this board only needs to prove
//! the updater state machine is wired up correctly.

#![no_std]
#![no_main]

use panic_halt as _;

use secure_boot_common::updater::{Updater, UpdaterExit, UpdaterPlatform, PAGE_LEN, WRITE_PAGE};
use secure_boot_common::{KeySet, APP_REGION_LEN, BLOCK_LEN, KEY_LEN, MAX_KEYS};

const SIGNATURE_KEY_REGION: usize = 0x03cc;
const HWID_REGION: usize = 0x03fe;
const APP_CODE_START: usize = 0x0400;
const APP_SIGNATURE_START: usize = 0x6bf0;

/// The chip-specific hooks this bootloader needs and nothing more:
/// flash program/erase, a watchdog kick, and raw byte I/O on the local
/// link. A real board support package backs each of these with the
/// chip's actual peripheral registers; deliberately left unimplemented
/// here since that register layout is out of this codebase's scope.
trait Mcu {
    fn feed_watchdog(&mut self);
    fn erase_app_flash(&mut self) -> bool;
    fn write_flash_page(&mut self, byte_offset: usize, data: &[u8; PAGE_LEN]) -> bool;
    fn read_flash(&self, byte_offset: usize, len: usize) -> &[u8];
    fn recv_byte(&mut self) -> Option<u8>;
    fn send_byte(&mut self, byte: u8);
    /// Transfers control to the application's reset vector. Never
    /// returns on real hardware.
    fn jump_to_application(&mut self) -> !;
}

struct Platform<'a, M: Mcu> {
    mcu: &'a mut M,
    keyset: KeySet,
}

impl<'a, M: Mcu> UpdaterPlatform for Platform<'a, M> {
    fn feed_watchdog(&mut self) {
        self.mcu.feed_watchdog();
    }

    fn erase_app_region(&mut self) -> bool {
        self.mcu.erase_app_flash()
    }

    fn write_page(&mut self, page: u8, data: &[u8; PAGE_LEN]) -> bool {
        let offset = APP_CODE_START + page as usize * PAGE_LEN;
        self.mcu.write_flash_page(offset, data)
    }

    fn app_region(&self) -> &[u8; APP_REGION_LEN] {
        let slice = self.mcu.read_flash(APP_CODE_START, APP_REGION_LEN);
        slice.try_into().expect("flash read returns a fixed-size window")
    }

    fn app_signature(&self) -> &[u8; BLOCK_LEN] {
        let slice = self.mcu.read_flash(APP_SIGNATURE_START, BLOCK_LEN);
        slice.try_into().expect("flash read returns a fixed-size window")
    }

    fn keyset(&self) -> &KeySet {
        &self.keyset
    }
}

/// Reads the up-to-`MAX_KEYS` signature keys out of the provisioning
/// region. A key is "populated" if it is not all-zero -- provisioning
/// writes zero to unused slots, matching the application's own
/// `KeyTable::empty` convention.
fn load_keyset<M: Mcu>(mcu: &M) -> KeySet {
    let mut keys = [[0u8; KEY_LEN]; MAX_KEYS];
    let mut populated = [false; MAX_KEYS];
    for i in 0..MAX_KEYS {
        let slice = mcu.read_flash(SIGNATURE_KEY_REGION + i * KEY_LEN, KEY_LEN);
        keys[i].copy_from_slice(slice);
        populated[i] = keys[i] != [0u8; KEY_LEN];
    }
    KeySet::new(keys, populated)
}

/// A minimal framer for the updater's own on-wire protocol: one opcode
/// byte, then for `WRITE_PAGE` a page index byte and (unless it is the
/// end-of-image marker) 128 payload bytes. No sync prefix -- the
/// bootloader protocol is simpler than the application's local-bus
/// framing by design, since it never has to share the wire with
/// anything else.
fn read_command<M: Mcu>(mcu: &mut M, buf: &mut [u8; 1 + PAGE_LEN]) -> Option<(u8, usize)> {
    let opcode = mcu.recv_byte()?;
    if opcode != WRITE_PAGE {
        return Some((opcode, 0));
    }
    let page = loop {
        if let Some(b) = mcu.recv_byte() {
            break b;
        }
    };
    buf[0] = page;
    if page == 255 {
        return Some((opcode, 1));
    }
    for slot in buf[1..1 + PAGE_LEN].iter_mut() {
        *slot = loop {
            if let Some(b) = mcu.recv_byte() {
                break b;
            }
        };
    }
    Some((opcode, 1 + PAGE_LEN))
}

fn run_updater<M: Mcu>(mcu: &mut M) -> ! {
    let keyset = load_keyset(mcu);
    let mut platform = Platform { mcu, keyset };
    let mut updater = Updater::new(&mut platform);
    let mut cmd_buf = [0u8; 1 + PAGE_LEN];
    let mut reply_buf = [0u8; 2];

    loop {
        match read_command(platform.mcu, &mut cmd_buf) {
            None => {
                if updater.tick_idle() == Some(UpdaterExit::TimedOut) {
                    // Soft timeout with no ground contact: stop kicking
                    // the watchdog and let the hardware reset bring us
                    // back to the top of this function.
                    loop {
                        core::hint::spin_loop();
                    }
                }
            }
            Some((opcode, len)) => {
                let (reply_len, exit) = updater.handle_command(opcode, &cmd_buf[..len], &mut reply_buf);
                for &b in &reply_buf[..reply_len] {
                    platform.mcu.send_byte(b);
                }
                if exit == Some(UpdaterExit::BootApp) {
                    platform.mcu.jump_to_application();
                }
            }
        }
    }
}

#[no_mangle]
pub extern "C" fn _start() -> ! {
    // 1. Disable interrupts, start the watchdog (~1 s period), bring up
    //    clock/DMA/UART/SPI/radio, then enable interrupts. The concrete
    //    register sequence lives in the chip support crate, out of
    //    scope here.
    unimplemented!("board bring-up is chip-specific and supplied by the target's support crate")
}
