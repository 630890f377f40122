//! Two ways around the PL022's one-word-per-select limitation.
//!
//! The RP2040 SPI block in slave mode only reliably exchanges one word per
//! select assertion, but the protocol needs a command and a payload or
//! response in the same assertion. Pick one strategy per build:
//!
//! * [`WideFramed`]: one 16-bit mode 0 word carries everything. The response
//!   is primed before the command is known, so it always holds the current
//!   modifiers and rows. Needs the select-edge handler in [`crate::select`].
//! * [`NarrowExchange`]: up to three 8-bit mode 3 words: command, reply or
//!   payload, flush. Replies are sampled after decode, at the cost of the
//!   host leaving the device time between bytes.

use crate::codec::{decode_command, encode_response, split_received, Command, Opcode};
use crate::diag::DiagnosticEntry;
use crate::matrix::{MatrixIo, MatrixSample};
use crate::port::{PeripheralState, SlavePort};

/// Outcome of one select assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transaction {
    pub command: Command,
    /// Byte the host sent alongside the command, whether or not the command
    /// uses one.
    pub payload: u8,
    pub diag: DiagnosticEntry,
}

/// A slave port plus the framing that makes it speak the protocol.
pub trait Workaround {
    /// Configuration the peripheral is (re)initialised with.
    fn state(&self) -> &PeripheralState;

    /// Reconfigure the peripheral from scratch, dropping any half-received
    /// frame.
    fn reset(&mut self);

    /// Run one transaction. `primed` is the sample taken at the top of the
    /// loop; strategies that reply after decode sample `matrix` again.
    fn transaction<M: MatrixIo>(&mut self, primed: MatrixSample, matrix: &mut M) -> Transaction;
}

/// Single 16-bit frame per assertion.
pub struct WideFramed<P> {
    port: P,
    state: PeripheralState,
}

impl<P: SlavePort> WideFramed<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: PeripheralState::wide_framed(),
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }
}

impl<P: SlavePort> Workaround for WideFramed<P> {
    fn state(&self) -> &PeripheralState {
        &self.state
    }

    fn reset(&mut self) {
        self.port.configure(&self.state);
    }

    fn transaction<M: MatrixIo>(&mut self, primed: MatrixSample, _matrix: &mut M) -> Transaction {
        // The response has to sit in the TX FIFO before the first clock.
        self.port.prime(encode_response(primed));

        let received = self.port.receive();
        // Whether the host still held select once the word was in.
        let opened = self.port.select_level();

        let (command, payload) = split_received(received);
        let decoded = Command::decode(command, payload);
        let closed = self.port.select_level();

        Transaction {
            command: decoded,
            payload,
            diag: DiagnosticEntry::new([payload, command, opened as u8, closed as u8]),
        }
    }
}

/// Sent while the device has nothing to say.
pub const FILLER: u8 = 0x00;

/// Up to three 8-bit mode 3 exchanges per assertion.
pub struct NarrowExchange<P> {
    port: P,
    state: PeripheralState,
}

impl<P: SlavePort> NarrowExchange<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: PeripheralState::narrow_exchange(),
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        self.port.prime(byte as u16);
        self.port.receive() as u8
    }
}

impl<P: SlavePort> Workaround for NarrowExchange<P> {
    fn state(&self) -> &PeripheralState {
        &self.state
    }

    fn reset(&mut self) {
        self.port.configure(&self.state);
    }

    fn transaction<M: MatrixIo>(&mut self, _primed: MatrixSample, matrix: &mut M) -> Transaction {
        let command = self.exchange(FILLER);

        let reply = match decode_command(command) {
            // Leave the rest of the assertion to the reset.
            Opcode::Unknown(byte) => {
                let held = self.port.select_level();
                return Transaction {
                    command: Command::Unknown(byte),
                    payload: 0,
                    diag: DiagnosticEntry::new([byte, 0, 0, held as u8]),
                };
            }
            Opcode::ReadRows => matrix.sample().rows,
            Opcode::ReadModifiers => matrix.sample().modifiers.bits(),
            Opcode::SelectColumns | Opcode::SetIndicator => FILLER,
        };

        let payload = self.exchange(reply);
        // Drain the pipeline before the host releases select.
        let flush = self.exchange(FILLER);
        let held = self.port.select_level();

        Transaction {
            command: Command::decode(command, payload),
            payload,
            diag: DiagnosticEntry::new([command, payload, flush, held as u8]),
        }
    }
}
