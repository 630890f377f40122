//! Bench doubles: a host that replays a script and a board modelled at the
//! electrical level.

#![allow(dead_code)]

use std::collections::VecDeque;

use v06c_kbd_protocol::codec::{host_narrow_bytes, host_wide_frame};
use v06c_kbd_protocol::matrix::{column_levels, indicator_level, pins, selected_columns};
use v06c_kbd_protocol::{Command, MatrixIo, MatrixSample, PeripheralState, SlavePort};

/// Slave port whose host clocks out a fixed script of words.
pub struct ScriptedPort {
    incoming: VecDeque<u16>,
    /// Every word primed for transmission, in order.
    pub sent: Vec<u16>,
    /// Every configuration applied, in order.
    pub configured: Vec<PeripheralState>,
    /// Level reported for the select line.
    pub select: bool,
    /// Host lets go of select as soon as a word has been clocked.
    pub release_on_receive: bool,
}

impl ScriptedPort {
    pub fn new(words: impl IntoIterator<Item = u16>) -> Self {
        Self {
            incoming: words.into_iter().collect(),
            sent: Vec::new(),
            configured: Vec::new(),
            select: false,
            release_on_receive: false,
        }
    }

    pub fn remaining(&self) -> usize {
        self.incoming.len()
    }
}

impl SlavePort for ScriptedPort {
    fn configure(&mut self, state: &PeripheralState) {
        self.configured.push(*state);
    }

    fn prime(&mut self, word: u16) {
        self.sent.push(word);
    }

    fn receive(&mut self) -> u16 {
        let word = self.incoming.pop_front().expect("host script ran out");
        if self.release_on_receive {
            self.select = true;
        }
        word
    }

    fn select_level(&self) -> bool {
        self.select
    }
}

pub fn wide_script(commands: &[Command]) -> Vec<u16> {
    commands.iter().map(|&c| host_wide_frame(c)).collect()
}

pub fn narrow_script(commands: &[Command]) -> Vec<u16> {
    commands
        .iter()
        .flat_map(|&c| {
            let (bytes, len) = host_narrow_bytes(c);
            bytes.into_iter().take(len).map(u16::from)
        })
        .collect()
}

/// GPIO bank with rows and modifiers on the inputs and the output latch
/// tracked as electrical levels.
pub struct BenchMatrix {
    /// Input levels handed out by successive samples; the last one sticks.
    inputs: VecDeque<u32>,
    levels: u32,
    outputs: u32,
    pub samples: usize,
    pub indicator_edges: usize,
}

impl BenchMatrix {
    pub fn new(levels: u32) -> Self {
        Self {
            inputs: VecDeque::new(),
            levels,
            // Columns idle high, indicator dark.
            outputs: pins::COLUMN_MASK | pins::INDICATOR_MASK,
            samples: 0,
            indicator_edges: 0,
        }
    }

    pub fn with_rows(rows: u8) -> Self {
        Self::new(u32::from(rows) << pins::ROW_LSB)
    }

    /// Queue input levels for the next samples.
    pub fn then(mut self, levels: u32) -> Self {
        self.inputs.push_back(levels);
        self
    }

    /// Electrical level of the column pins, bit n = column n.
    pub fn column_pins(&self) -> u8 {
        ((self.outputs & pins::COLUMN_MASK) >> pins::COLUMN_LSB) as u8
    }

    pub fn indicator_pin(&self) -> bool {
        self.outputs & pins::INDICATOR_MASK != 0
    }
}

impl MatrixIo for BenchMatrix {
    fn sample(&mut self) -> MatrixSample {
        self.samples += 1;
        if let Some(next) = self.inputs.pop_front() {
            self.levels = next;
        }
        MatrixSample::from_levels(self.levels)
    }

    fn drive_columns(&mut self, selected: u8) {
        let levels = u32::from(column_levels(selected)) << pins::COLUMN_LSB;
        self.outputs = (self.outputs & !pins::COLUMN_MASK) | levels;
    }

    fn drive_indicator(&mut self, on: bool) {
        let level = indicator_level(on);
        if level != self.indicator_pin() {
            self.indicator_edges += 1;
        }
        if level {
            self.outputs |= pins::INDICATOR_MASK;
        } else {
            self.outputs &= !pins::INDICATOR_MASK;
        }
    }

    fn columns(&self) -> u8 {
        selected_columns(self.column_pins())
    }

    fn indicator(&self) -> bool {
        !self.indicator_pin()
    }
}
