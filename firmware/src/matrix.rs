//! Matrix I/O for the bridge board.
//!
//! Rows, columns, modifiers and the indicator all sit on GPIO bank 0, so the
//! whole input side is one read of `SIO.GPIO_IN` and every output change is
//! one atomic set/clear/xor write.
//!
//! Pin mapping:
//!   Rows (inputs, pull-down):       GPIO0-7
//!   Columns (outputs, 12 mA, high): GPIO8-15
//!   СС, УС, РУС/ЛАТ (inputs):       GPIO20-22
//!   СБРОС, ВВОД (inputs):           GPIO27, GPIO28
//!   РУС indicator (output, high):   GPIO26

use rp2040_hal::pac;
use v06c_kbd_protocol::matrix::{column_levels, indicator_level, selected_columns};
use v06c_kbd_protocol::{MatrixIo, MatrixSample};

use crate::config::*;

/// IO_BANK0 function select values.
pub const FUNCSEL_SPI: u8 = 1;
pub const FUNCSEL_SIO: u8 = 5;

// PADS_BANK0 GPIO register bits.
const PAD_IE: u32 = 1 << 6;
const PAD_DRIVE_4MA: u32 = 1 << 4;
const PAD_DRIVE_12MA: u32 = 3 << 4;
const PAD_PDE: u32 = 1 << 2;
const PAD_SCHMITT: u32 = 1 << 1;

/// Reset value of a pad: input enabled, 4 mA, pull-down.
const PAD_DEFAULT: u32 = PAD_IE | PAD_DRIVE_4MA | PAD_PDE | PAD_SCHMITT;
const PAD_COLUMN: u32 = PAD_IE | PAD_DRIVE_12MA | PAD_PDE | PAD_SCHMITT;

fn set_function(io: &pac::IO_BANK0, pin: u32, funcsel: u8) {
    io.gpio(pin as usize)
        .gpio_ctrl()
        .write(|w| unsafe { w.funcsel().bits(funcsel) });
}

fn set_pad(pads: &pac::PADS_BANK0, pin: u32, bits: u32) {
    pads.gpio(pin as usize).write(|w| unsafe { w.bits(bits) });
}

/// Bring up the GPIO bank and put every pin in its working state.
///
/// Columns start high (nothing selected) and the indicator starts dark.
/// The SPI data-out pin is left to [`crate::spi`].
pub fn init_gpio(
    io: &pac::IO_BANK0,
    pads: &pac::PADS_BANK0,
    sio: &pac::SIO,
    resets: &mut pac::RESETS,
) {
    resets
        .reset()
        .modify(|_, w| w.io_bank0().clear_bit().pads_bank0().clear_bit());
    loop {
        let done = resets.reset_done().read();
        if done.io_bank0().bit_is_set() && done.pads_bank0().bit_is_set() {
            break;
        }
    }

    let outputs = COLUMN_MASK | INDICATOR_MASK;
    let inputs = ROW_MASK | MODIFIER_MASK;

    // Latch the idle levels before any driver turns on.
    sio.gpio_out_set().write(|w| unsafe { w.bits(outputs) });
    sio.gpio_oe_clr().write(|w| unsafe { w.bits(inputs) });
    sio.gpio_oe_set().write(|w| unsafe { w.bits(outputs) });

    for pin in 0..30 {
        let mask = 1 << pin;
        if mask & inputs != 0 {
            set_pad(pads, pin, PAD_DEFAULT);
            set_function(io, pin, FUNCSEL_SIO);
        } else if mask & COLUMN_MASK != 0 {
            set_pad(pads, pin, PAD_COLUMN);
            set_function(io, pin, FUNCSEL_SIO);
        } else if mask & INDICATOR_MASK != 0 {
            set_function(io, pin, FUNCSEL_SIO);
        }
    }

    for pin in [SPI_MOSI, SPI_CS, SPI_SCK] {
        set_function(io, pin, FUNCSEL_SPI);
    }
}

/// The matrix as seen through the single-cycle IO block.
///
/// Holds no state: the output latch is the state.
#[derive(Default)]
pub struct SioMatrix {
    _private: (),
}

impl SioMatrix {
    /// Only call after [`init_gpio`].
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn sio(&self) -> &pac::sio::RegisterBlock {
        // SAFETY: the SIO GPIO registers used here are either read-only or
        // atomic set/clear/xor aliases, and only the exchange core drives
        // these pins.
        unsafe { &*pac::SIO::ptr() }
    }

    fn output_latch(&self) -> u32 {
        self.sio().gpio_out().read().bits()
    }
}

impl MatrixIo for SioMatrix {
    fn sample(&mut self) -> MatrixSample {
        MatrixSample::from_levels(self.sio().gpio_in().read().bits())
    }

    fn drive_columns(&mut self, selected: u8) {
        let levels = u32::from(column_levels(selected)) << COLUMN_LSB;
        let flip = (self.output_latch() ^ levels) & COLUMN_MASK;
        self.sio().gpio_out_xor().write(|w| unsafe { w.bits(flip) });
    }

    fn drive_indicator(&mut self, on: bool) {
        if indicator_level(on) {
            self.sio().gpio_out_set().write(|w| unsafe { w.bits(INDICATOR_MASK) });
        } else {
            self.sio().gpio_out_clr().write(|w| unsafe { w.bits(INDICATOR_MASK) });
        }
    }

    fn columns(&self) -> u8 {
        selected_columns(((self.output_latch() & COLUMN_MASK) >> COLUMN_LSB) as u8)
    }

    fn indicator(&self) -> bool {
        self.output_latch() & INDICATOR_MASK == 0
    }
}
