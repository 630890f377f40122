//! Select-edge routing of the slave data-out line.
//!
//! The RP2040's PL022 drives its data-out pin whenever the pin is muxed to
//! the peripheral, select or not, and it only produces valid data once a
//! word is armed. Under wide framing the pin is therefore handed to the
//! peripheral on the falling edge of select and taken back on the rising
//! edge. The edge handler is the only writer of the pin's function select.
//! It has to win against the host's first clock edge, which only the host's
//! select-to-clock setup time guarantees, so it must run on a core that
//! never masks interrupts for long.

use bitflags::bitflags;

bitflags! {
    /// One pin's nibble from the RP2040 GPIO interrupt status registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PinEvents: u8 {
        const LEVEL_LOW = 1 << 0;
        const LEVEL_HIGH = 1 << 1;
        const EDGE_LOW = 1 << 2;
        const EDGE_HIGH = 1 << 3;
    }
}

/// Eight pins share one 32-bit status register.
pub const PINS_PER_REGISTER: u32 = 8;

/// Index of the status/enable/ack register that holds `pin`.
pub const fn register_index(pin: u32) -> usize {
    (pin / PINS_PER_REGISTER) as usize
}

/// Shift of `pin`'s nibble within its register.
pub const fn nibble_shift(pin: u32) -> u32 {
    4 * (pin % PINS_PER_REGISTER)
}

/// Pull `pin`'s events out of its status register.
pub const fn pin_events(status: u32, pin: u32) -> PinEvents {
    PinEvents::from_bits_truncate(((status >> nibble_shift(pin)) & 0xf) as u8)
}

/// Register bits for `events` on `pin`, for enabling or acknowledging.
pub const fn event_bits(events: PinEvents, pin: u32) -> u32 {
    (events.bits() as u32) << nibble_shift(pin)
}

/// Both select edges; the only events the handler enables.
pub const SELECT_EDGES: PinEvents = PinEvents::EDGE_LOW.union(PinEvents::EDGE_HIGH);

/// Decode one read of the handler's status register for the select `pin`:
/// where the data-out line goes and the bits to write back to acknowledge.
/// `None` when no select edge is pending.
pub fn edge_response(status: u32, pin: u32) -> Option<(DataLine, u32)> {
    let events = pin_events(status, pin) & SELECT_EDGES;
    let line = DataLine::for_events(events)?;
    Some((line, event_bits(events, pin)))
}

/// Who owns the data-out pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataLine {
    /// Plain GPIO with the output disabled; the bus is left alone.
    Idle,
    /// Muxed to the SPI peripheral for the duration of a transaction.
    Armed,
}

impl DataLine {
    /// Where the pin should go after `events` on the select line, if
    /// anywhere. A falling edge wins when both edges are latched.
    pub fn for_events(events: PinEvents) -> Option<Self> {
        if events.contains(PinEvents::EDGE_LOW) {
            Some(DataLine::Armed)
        } else if events.contains(PinEvents::EDGE_HIGH) {
            Some(DataLine::Idle)
        } else {
            None
        }
    }

    pub fn next(self, events: PinEvents) -> Self {
        Self::for_events(events).unwrap_or(self)
    }
}
