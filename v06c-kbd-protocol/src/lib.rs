//! Wire protocol and transaction engine for the v06c keyboard bridge.
//!
//! The bridge sits between an 8×8 key matrix (plus five discrete modifier
//! lines and one indicator LED) and a host that talks to it as an SPI
//! master. Each select assertion carries one command:
//!
//! | Byte   | Command        | Payload / response                     |
//! |--------|----------------|----------------------------------------|
//! | `0xE5` | select columns | payload: column mask, 1 = selected     |
//! | `0xE6` | read rows      | response: row mask, 1 = active         |
//! | `0xE7` | read modifiers | response: [`Modifiers`] byte           |
//! | `0xE8` | set indicator  | payload: bit3 is the LED level, 0 = on |
//!
//! Anything else means the two ends have lost sync and the slave
//! peripheral gets reconfigured from scratch.
//!
//! This crate is `no_std` and touches no registers. It does carry the
//! board's RP2040 pin map ([`matrix::pins`]) and the decoding of RP2040
//! GPIO interrupt status words ([`select`]), but hardware itself is only
//! reached through two traits, [`MatrixIo`] and [`SlavePort`], so the whole
//! engine can run against scripted fakes on the host.

#![cfg_attr(not(test), no_std)]

pub mod codec;
pub mod diag;
pub mod exchange;
pub mod matrix;
pub mod port;
pub mod select;
pub mod workaround;

pub use codec::{decode_command, encode_response, Command, Opcode};
pub use diag::{DiagnosticEntry, DiagnosticReader, DiagnosticRecorder, DiagnosticRing, DiagnosticSink};
pub use exchange::{ExchangeLoop, LoopState, Outcome};
pub use matrix::{MatrixIo, MatrixSample, Modifiers};
pub use port::{Framing, PeripheralState, SlavePort};
pub use workaround::{NarrowExchange, Transaction, WideFramed, Workaround};
