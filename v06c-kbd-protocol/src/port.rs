//! Slave peripheral configuration and the raw port seam.

/// How a transaction is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Framing {
    /// One 16-bit word per select assertion, mode 0.
    WideFramed,
    /// Up to three 8-bit words per select assertion, mode 3.
    NarrowExchange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    IdleLow,
    IdleHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPhase {
    /// Sample on the first clock edge.
    FirstEdge,
    /// Sample on the second clock edge.
    SecondEdge,
}

/// Everything the slave peripheral is configured with.
///
/// Only ever replaced wholesale, by a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeripheralState {
    pub framing: Framing,
    /// Nominal bit rate. A slave follows the master's clock, but the
    /// peripheral's own clock still has to run well above it.
    pub baud_rate: u32,
    pub polarity: ClockPolarity,
    pub phase: ClockPhase,
}

impl PeripheralState {
    pub const DEFAULT_BAUD: u32 = 1_000_000;

    pub const fn wide_framed() -> Self {
        Self {
            framing: Framing::WideFramed,
            baud_rate: Self::DEFAULT_BAUD,
            polarity: ClockPolarity::IdleLow,
            phase: ClockPhase::FirstEdge,
        }
    }

    /// Mode 3 is the only mode in which the PL022 keeps exchanging words
    /// while select stays low; in mode 0 it stops after the first one.
    pub const fn narrow_exchange() -> Self {
        Self {
            framing: Framing::NarrowExchange,
            baud_rate: Self::DEFAULT_BAUD,
            polarity: ClockPolarity::IdleHigh,
            phase: ClockPhase::SecondEdge,
        }
    }

    pub const fn word_bits(&self) -> u8 {
        match self.framing {
            Framing::WideFramed => 16,
            Framing::NarrowExchange => 8,
        }
    }

    /// SPI mode number, 0..=3.
    pub const fn mode(&self) -> u8 {
        let cpol = matches!(self.polarity, ClockPolarity::IdleHigh) as u8;
        let cpha = matches!(self.phase, ClockPhase::SecondEdge) as u8;
        (cpol << 1) | cpha
    }
}

/// Raw access to a synchronous serial slave.
pub trait SlavePort {
    /// Reset the peripheral and bring it up with `state`. Anything sitting in
    /// its FIFOs is lost.
    fn configure(&mut self, state: &PeripheralState);

    /// Queue a word for the next exchange.
    fn prime(&mut self, word: u16);

    /// Wait for the next received word.
    ///
    /// Busy-polls with no timeout: a host that asserts select and never
    /// clocks a full word stalls the caller.
    fn receive(&mut self) -> u16;

    /// Electrical level of the select line, `false` while asserted.
    fn select_level(&self) -> bool;
}

/// PL022 clock divider pair: bit rate = clk_peri / (prescale * postdiv).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockDivisors {
    /// Even, 2..=254.
    pub prescale: u8,
    /// 1..=256.
    pub postdiv: u16,
}

impl ClockDivisors {
    /// Value for the serial clock rate field, `postdiv - 1`.
    pub const fn serial_clock_rate(&self) -> u8 {
        (self.postdiv - 1) as u8
    }

    pub const fn baud_rate(&self, peri_hz: u32) -> u32 {
        peri_hz / (self.prescale as u32 * self.postdiv as u32)
    }
}

/// Pick the divider pair for `baud`, same search as the Pico SDK: smallest
/// prescale that leaves headroom, then the largest post-divide that still
/// runs at or above the requested rate. Out-of-range requests clamp.
pub const fn clock_divisors(peri_hz: u32, baud: u32) -> ClockDivisors {
    let peri = peri_hz as u64;
    let baud = if baud == 0 { 1 } else { baud as u64 };

    let mut prescale: u64 = 2;
    while prescale < 254 && peri >= (prescale + 2) * 256 * baud {
        prescale += 2;
    }

    let mut postdiv: u64 = 256;
    while postdiv > 1 && peri / (prescale * (postdiv - 1)) <= baud {
        postdiv -= 1;
    }

    ClockDivisors {
        prescale: prescale as u8,
        postdiv: postdiv as u16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLK_PERI: u32 = 125_000_000;

    #[test]
    fn initial_states() {
        let wide = PeripheralState::wide_framed();
        assert_eq!(wide.word_bits(), 16);
        assert_eq!(wide.mode(), 0);

        let narrow = PeripheralState::narrow_exchange();
        assert_eq!(narrow.word_bits(), 8);
        assert_eq!(narrow.mode(), 3);
    }

    #[test]
    fn divisors_for_one_megahertz() {
        let div = clock_divisors(CLK_PERI, 1_000_000);
        assert_eq!(div, ClockDivisors { prescale: 2, postdiv: 63 });
        assert_eq!(div.serial_clock_rate(), 62);
        assert_eq!(div.baud_rate(CLK_PERI), 992_063);
    }

    #[test]
    fn divisors_for_six_megahertz() {
        let div = clock_divisors(CLK_PERI, 6_000_000);
        assert_eq!(div, ClockDivisors { prescale: 2, postdiv: 11 });
    }

    #[test]
    fn divisors_clamp_at_the_slow_end() {
        let div = clock_divisors(CLK_PERI, 1_000);
        assert_eq!(div, ClockDivisors { prescale: 254, postdiv: 256 });
        assert_eq!(div.serial_clock_rate(), 255);
    }

    #[test]
    fn divisors_clamp_at_the_fast_end() {
        let div = clock_divisors(CLK_PERI, CLK_PERI);
        assert_eq!(div, ClockDivisors { prescale: 2, postdiv: 1 });
    }
}
