//! PL022 (SPI0) in slave mode, driven at register level.
//!
//! The HAL's SPI driver only does master mode, and the workaround needs to
//! reset the block and swap word sizes at will anyway.

use rp2040_hal::pac;
use v06c_kbd_protocol::port::{clock_divisors, ClockPhase, ClockPolarity};
use v06c_kbd_protocol::{PeripheralState, SlavePort};

use crate::config::SPI_CS;

/// SPI0 with the reset controller it needs to restart itself.
pub struct Pl022Slave {
    spi: pac::SPI0,
    resets: pac::RESETS,
    peri_hz: u32,
}

impl Pl022Slave {
    /// Takes the block as is; nothing happens until the first `configure`.
    pub fn new(spi: pac::SPI0, resets: pac::RESETS, peri_hz: u32) -> Self {
        Self {
            spi,
            resets,
            peri_hz,
        }
    }
}

impl SlavePort for Pl022Slave {
    fn configure(&mut self, state: &PeripheralState) {
        // A reset cycle is the only way to empty both FIFOs and drop a
        // half-shifted word.
        self.resets.reset().modify(|_, w| w.spi0().set_bit());
        self.resets.reset().modify(|_, w| w.spi0().clear_bit());
        while self.resets.reset_done().read().spi0().bit_is_clear() {}

        let divisors = clock_divisors(self.peri_hz, state.baud_rate);
        self.spi
            .sspcpsr()
            .write(|w| unsafe { w.cpsdvsr().bits(divisors.prescale) });
        self.spi.sspcr0().write(|w| unsafe {
            w.scr()
                .bits(divisors.serial_clock_rate())
                .dss()
                .bits(state.word_bits() - 1)
                .frf()
                .bits(0)
                .spo()
                .bit(state.polarity == ClockPolarity::IdleHigh)
                .sph()
                .bit(state.phase == ClockPhase::SecondEdge)
        });

        // Slave mode can only be picked while the port is disabled.
        self.spi.sspcr1().write(|w| w.ms().set_bit());
        self.spi.sspcr1().modify(|_, w| w.sse().set_bit());
    }

    fn prime(&mut self, word: u16) {
        self.spi.sspdr().write(|w| unsafe { w.data().bits(word) });
    }

    fn receive(&mut self) -> u16 {
        while self.spi.sspsr().read().rne().bit_is_clear() {
            core::hint::spin_loop();
        }
        self.spi.sspdr().read().data().bits()
    }

    fn select_level(&self) -> bool {
        // SAFETY: read-only register.
        let levels = unsafe { (*pac::SIO::ptr()).gpio_in().read().bits() };
        levels & (1 << SPI_CS) != 0
    }
}

#[cfg(feature = "wide-frame")]
pub use select_edge::enable_select_edges;

/// Hands the data-out pin to the PL022 only while select is asserted.
///
/// The edge interrupt belongs to core 1, the exchange core. Core 0 spends its
/// time in defmt, whose critical sections mask interrupts for a whole log
/// frame, long enough to miss a select-to-clock window.
#[cfg(feature = "wide-frame")]
mod select_edge {
    use rp2040_hal::pac::{self, interrupt};
    use v06c_kbd_protocol::select::{edge_response, event_bits, register_index, DataLine, SELECT_EDGES};

    use crate::config::{SPI_CS, SPI_MISO};
    use crate::matrix::{FUNCSEL_SIO, FUNCSEL_SPI};

    fn io_bank0() -> &'static pac::io_bank0::RegisterBlock {
        // SAFETY: after start-up only this module writes IO_BANK0, and only
        // from core 1.
        unsafe { &*pac::IO_BANK0::ptr() }
    }

    fn route(io: &pac::io_bank0::RegisterBlock, line: DataLine) {
        let funcsel = match line {
            DataLine::Armed => FUNCSEL_SPI,
            DataLine::Idle => FUNCSEL_SIO,
        };
        io.gpio(SPI_MISO as usize)
            .gpio_ctrl()
            .write(|w| unsafe { w.funcsel().bits(funcsel) });
    }

    /// Park the data-out pin and route both select edges to the calling core.
    ///
    /// Must run on core 1: the enable and status registers used are core 1's,
    /// and the NVIC unmasked is the caller's own.
    pub fn enable_select_edges() {
        let io = io_bank0();
        route(io, DataLine::Idle);

        let index = register_index(SPI_CS);
        let bits = event_bits(SELECT_EDGES, SPI_CS);
        io.intr(index).write(|w| unsafe { w.bits(bits) });
        io.proc1_inte(index)
            .modify(|r, w| unsafe { w.bits(r.bits() | bits) });

        // SAFETY: the handler touches nothing but the two pins above.
        unsafe { pac::NVIC::unmask(pac::Interrupt::IO_IRQ_BANK0) };
    }

    #[interrupt]
    fn IO_IRQ_BANK0() {
        let io = io_bank0();
        let index = register_index(SPI_CS);

        if let Some((line, ack)) = edge_response(io.proc1_ints(index).read().bits(), SPI_CS) {
            route(io, line);
            io.intr(index).write(|w| unsafe { w.bits(ack) });
        }
    }
}
