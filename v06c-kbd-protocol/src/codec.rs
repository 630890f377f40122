//! Transaction codec: command bytes in, response words out.
//!
//! Everything here is pure. Bytes go over the wire MSB first, so in a 16-bit
//! frame the high byte is the one clocked first.

use crate::matrix::{MatrixSample, Modifiers};

pub const CMD_SELECT_COLUMNS: u8 = 0xe5;
pub const CMD_READ_ROWS: u8 = 0xe6;
pub const CMD_READ_MODIFIERS: u8 = 0xe7;
pub const CMD_SET_INDICATOR: u8 = 0xe8;

/// Bit of the set-indicator payload that carries the LED level (0 = lit).
pub const INDICATOR_BIT: u8 = 3;

/// What a command byte asks for, before its payload is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    SelectColumns,
    ReadRows,
    ReadModifiers,
    SetIndicator,
    /// Not a command. Seeing one means the link is out of sync.
    Unknown(u8),
}

impl Opcode {
    pub const fn decode(byte: u8) -> Self {
        match byte {
            CMD_SELECT_COLUMNS => Opcode::SelectColumns,
            CMD_READ_ROWS => Opcode::ReadRows,
            CMD_READ_MODIFIERS => Opcode::ReadModifiers,
            CMD_SET_INDICATOR => Opcode::SetIndicator,
            other => Opcode::Unknown(other),
        }
    }

    pub const fn byte(self) -> u8 {
        match self {
            Opcode::SelectColumns => CMD_SELECT_COLUMNS,
            Opcode::ReadRows => CMD_READ_ROWS,
            Opcode::ReadModifiers => CMD_READ_MODIFIERS,
            Opcode::SetIndicator => CMD_SET_INDICATOR,
            Opcode::Unknown(byte) => byte,
        }
    }

    /// Whether the host follows this command with a payload byte.
    pub const fn takes_payload(self) -> bool {
        matches!(self, Opcode::SelectColumns | Opcode::SetIndicator)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Opcode::SelectColumns => "select-columns",
            Opcode::ReadRows => "read-rows",
            Opcode::ReadModifiers => "read-modifiers",
            Opcode::SetIndicator => "set-indicator",
            Opcode::Unknown(_) => "unknown",
        }
    }
}

/// Map a command byte to its opcode. Total: every byte outside
/// `0xE5..=0xE8` is [`Opcode::Unknown`].
pub const fn decode_command(byte: u8) -> Opcode {
    Opcode::decode(byte)
}

/// A fully decoded host request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Columns to select, bit n = column n.
    SelectColumns(u8),
    ReadRows,
    ReadModifiers,
    /// `true` lights the indicator.
    SetIndicator(bool),
    Unknown(u8),
}

impl Command {
    /// Join a command byte with the payload byte that came with it.
    /// The payload is ignored for commands that do not take one.
    pub const fn decode(command: u8, payload: u8) -> Self {
        match Opcode::decode(command) {
            Opcode::SelectColumns => Command::SelectColumns(payload),
            Opcode::ReadRows => Command::ReadRows,
            Opcode::ReadModifiers => Command::ReadModifiers,
            Opcode::SetIndicator => Command::SetIndicator(payload & (1 << INDICATOR_BIT) == 0),
            Opcode::Unknown(byte) => Command::Unknown(byte),
        }
    }

    pub const fn opcode(self) -> Opcode {
        match self {
            Command::SelectColumns(_) => Opcode::SelectColumns,
            Command::ReadRows => Opcode::ReadRows,
            Command::ReadModifiers => Opcode::ReadModifiers,
            Command::SetIndicator(_) => Opcode::SetIndicator,
            Command::Unknown(byte) => Opcode::Unknown(byte),
        }
    }

    /// The payload byte a host sends for this command.
    pub const fn payload(self) -> u8 {
        match self {
            Command::SelectColumns(mask) => mask,
            Command::SetIndicator(true) => 0,
            Command::SetIndicator(false) => 1 << INDICATOR_BIT,
            _ => 0,
        }
    }

    pub const fn is_known(self) -> bool {
        !matches!(self, Command::Unknown(_))
    }
}

/// Pack a sample into the 16-bit response word: modifiers in the high byte,
/// rows in the low byte.
pub const fn encode_response(sample: MatrixSample) -> u16 {
    ((sample.modifiers.bits() as u16) << 8) | sample.rows as u16
}

/// Inverse of [`encode_response`], for the host side.
pub const fn decode_response(word: u16) -> MatrixSample {
    MatrixSample::new(word as u8, Modifiers::from_bits_truncate((word >> 8) as u8))
}

/// Split a received wide frame into `(command, payload)`. The command is the
/// first byte on the wire.
pub const fn split_received(word: u16) -> (u8, u8) {
    ((word >> 8) as u8, word as u8)
}

/// The 16-bit frame a host clocks out for `command` under wide framing.
pub const fn host_wide_frame(command: Command) -> u16 {
    ((command.opcode().byte() as u16) << 8) | command.payload() as u16
}

/// The bytes a host clocks out for `command` under narrow framing, and how
/// many of them belong to one select assertion.
pub const fn host_narrow_bytes(command: Command) -> ([u8; 3], usize) {
    match command {
        Command::Unknown(byte) => ([byte, 0, 0], 1),
        _ => ([command.opcode().byte(), command.payload(), 0], 3),
    }
}
