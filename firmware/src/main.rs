//! v06c keyboard bridge firmware for the RP2040.
//!
//! Core 1 runs the exchange loop and nothing else: sample the matrix, serve
//! one SPI slave transaction, apply the command, record it. It also takes
//! the select-edge interrupt (wide framing only). Core 0 dumps the
//! diagnostic ring over defmt once it fills.

#![no_std]
#![no_main]

mod config;
mod console;
mod matrix;
mod spi;

use defmt_rtt as _;
use panic_probe as _;

use rp2040_hal::multicore::{Multicore, Stack};
use rp2040_hal::{pac, Clock, Sio, Watchdog};
use v06c_kbd_protocol::{DiagnosticRing, ExchangeLoop};

#[cfg(feature = "narrow-exchange")]
use v06c_kbd_protocol::NarrowExchange;
#[cfg(feature = "wide-frame")]
use v06c_kbd_protocol::WideFramed;

use config::{CORE1_STACK_WORDS, DIAGNOSTIC_CAPACITY};
use console::DefmtConsole;
use matrix::SioMatrix;
use spi::Pl022Slave;

#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

static mut CORE1_STACK: Stack<CORE1_STACK_WORDS> = Stack::new();

#[cfg(feature = "wide-frame")]
fn strategy(port: Pl022Slave) -> WideFramed<Pl022Slave> {
    WideFramed::new(port)
}

#[cfg(feature = "narrow-exchange")]
fn strategy(port: Pl022Slave) -> NarrowExchange<Pl022Slave> {
    NarrowExchange::new(port)
}

/// Stop here for good; the probe still has the log.
fn park() -> ! {
    loop {
        cortex_m::asm::wfi();
    }
}

#[rp2040_hal::entry]
fn main() -> ! {
    let (Some(mut pac), Some(core)) = (pac::Peripherals::take(), pac::CorePeripherals::take())
    else {
        defmt::error!("peripherals already taken");
        park();
    };

    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    let Ok(clocks) = rp2040_hal::clocks::init_clocks_and_plls(
        config::XOSC_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        defmt::error!("clock init failed");
        park();
    };

    let mut delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());
    delay.delay_us(config::STARTUP_SETTLE_US);
    defmt::info!("v06c-mini-keyboard");

    matrix::init_gpio(&pac.IO_BANK0, &pac.PADS_BANK0, &pac.SIO, &mut pac.RESETS);

    #[cfg(feature = "narrow-exchange")]
    pac.IO_BANK0
        .gpio(config::SPI_MISO as usize)
        .gpio_ctrl()
        .write(|w| unsafe { w.funcsel().bits(matrix::FUNCSEL_SPI) });

    let Some(ring) = cortex_m::singleton!(: DiagnosticRing<DIAGNOSTIC_CAPACITY> = DiagnosticRing::new())
    else {
        defmt::error!("diagnostic ring already taken");
        park();
    };
    let (recorder, mut reader) = ring.split();

    let port = Pl022Slave::new(pac.SPI0, pac.RESETS, clocks.peripheral_clock.freq().to_Hz());

    let mut sio = Sio::new(pac.SIO);
    let mut mc = Multicore::new(&mut pac.PSM, &mut pac.PPB, &mut sio.fifo);
    let cores = mc.cores();
    // SAFETY: the stack is handed out exactly once, here.
    let stack = unsafe { &mut CORE1_STACK.mem };
    let spawned = cores[1].spawn(stack, move || {
        #[cfg(feature = "wide-frame")]
        spi::enable_select_edges();

        let mut exchange = ExchangeLoop::new(strategy(port), SioMatrix::new(), recorder);
        exchange.run(|byte| defmt::warn!("last_cmd={=u8:x}, reset", byte))
    });
    if spawned.is_err() {
        defmt::error!("core 1 did not start");
        park();
    }

    let mut console = DefmtConsole;
    loop {
        if reader.poll(&mut console) && cfg!(feature = "rearm-diagnostics") {
            reader.rearm();
        }
    }
}
