// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright COMMS Flight Firmware Contributors 2026.

//! Minimal `debug!` logging path, grounded on the teacher's
//! `kernel::debug`/`IoWrite` convention (see `boards/nordic/nrf52840dk`'s
//! use of `debug!("Error loading processes!")` and
//! `boards/qemu_rv32_virt/src/io.rs`'s panic-print path) rather than an
//! external logging facade: there is no heap, no timestamp source
//! guaranteed to be set, and at most one console (UART1 local-debug) to
//! write to, so the ambient logging stack is this small macro plus a
//! board-supplied `IoWrite`.

use core::cell::Cell;
use core::fmt::Write;

use comms_cells::OptionalCell;

/// A sink for formatted debug output. Boards implement this over whichever
/// console UART they expose; `write` returns the number of bytes actually
/// accepted (mirrors the teacher's `debug::IoWrite`).
pub trait IoWrite {
    fn write(&mut self, buf: &[u8]) -> usize;
}

struct NullWriter;
impl IoWrite for NullWriter {
    fn write(&mut self, _buf: &[u8]) -> usize {
        0
    }
}

/// Global pointer to the board's debug console, set once at boot via
/// `set_debug_writer`. `'static` because it outlives the scheduler loop.
static DEBUG_WRITER: OptionalCell<&'static dyn DebugSink> = OptionalCell::empty();

/// Object-safe wrapper so `dyn` works across the `Write`/`IoWrite` split.
pub trait DebugSink {
    fn write_str(&self, s: &str);
}

pub fn set_debug_writer(writer: &'static dyn DebugSink) {
    DEBUG_WRITER.set(writer);
}

/// Used by `debug!` — not part of the public API.
#[doc(hidden)]
pub fn _debug_write_fmt(args: core::fmt::Arguments) {
    struct Adapter<'a>(&'a dyn DebugSink);
    impl Write for Adapter<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            self.0.write_str(s);
            Ok(())
        }
    }
    DEBUG_WRITER.map(|sink| {
        let mut adapter = Adapter(*sink);
        let _ = adapter.write_fmt(args);
        let _ = adapter.write_str("\r\n");
    });
}

/// Prints a line to the board's debug console if one has been registered;
/// silently discarded otherwise (never panics, never blocks).
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::debug::_debug_write_fmt(format_args!($($arg)*))
    };
}

/// Tracks whether any debug output has been emitted yet this boot, mostly
/// useful in host tests to assert a code path actually logged.
pub struct CallCounter {
    count: Cell<u32>,
}

impl CallCounter {
    pub const fn new() -> Self {
        CallCounter { count: Cell::new(0) }
    }

    pub fn bump(&self) {
        self.count.set(self.count.get().wrapping_add(1));
    }

    pub fn get(&self) -> u32 {
        self.count.get()
    }
}
