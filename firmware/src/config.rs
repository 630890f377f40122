//! Board constants. Everything is fixed at build time.

pub use v06c_kbd_protocol::matrix::pins::*;

#[cfg(all(feature = "wide-frame", feature = "narrow-exchange"))]
compile_error!("enable exactly one of the `wide-frame` and `narrow-exchange` features");

#[cfg(not(any(feature = "wide-frame", feature = "narrow-exchange")))]
compile_error!("enable one of the `wide-frame` or `narrow-exchange` features");

/// SPI0, slave side.
pub const SPI_MOSI: u32 = 16;
pub const SPI_CS: u32 = 17;
pub const SPI_SCK: u32 = 18;
pub const SPI_MISO: u32 = 19;

/// Crystal on the board.
pub const XOSC_HZ: u32 = 12_000_000;

/// Time for the host and the debug probe to come up before the banner.
pub const STARTUP_SETTLE_US: u32 = 4_000_000;

/// Transactions captured per dump.
pub const DIAGNOSTIC_CAPACITY: usize = 64;

/// Core 1 stack, in words.
pub const CORE1_STACK_WORDS: usize = 4096;
