//! The time-critical loop: one transaction per iteration, forever.

use crate::codec::Command;
use crate::diag::DiagnosticRecorder;
use crate::matrix::MatrixIo;
use crate::workaround::Workaround;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopState {
    Running,
    /// Reconfiguring the peripheral after a desync. Entered and left within
    /// one [`ExchangeLoop::step`], so callers only ever observe `Running`.
    Resetting,
}

/// What one iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    Dispatched(Command),
    /// Got this byte instead of a command and reset the peripheral.
    Resynced(u8),
}

/// Owns everything the exchange core touches.
pub struct ExchangeLoop<'a, W, M, const N: usize> {
    workaround: W,
    matrix: M,
    recorder: DiagnosticRecorder<'a, N>,
    state: LoopState,
    resets: u32,
}

impl<'a, W, M, const N: usize> ExchangeLoop<'a, W, M, N>
where
    W: Workaround,
    M: MatrixIo,
{
    /// Configures the peripheral once and starts out running.
    pub fn new(mut workaround: W, matrix: M, recorder: DiagnosticRecorder<'a, N>) -> Self {
        workaround.reset();
        Self {
            workaround,
            matrix,
            recorder,
            state: LoopState::Running,
            resets: 0,
        }
    }

    pub fn step(&mut self) -> Outcome {
        let sample = self.matrix.sample();
        let transaction = self.workaround.transaction(sample, &mut self.matrix);

        let outcome = match transaction.command {
            Command::SelectColumns(mask) => {
                self.matrix.drive_columns(mask);
                Outcome::Dispatched(transaction.command)
            }
            // The reply went out with the transaction.
            Command::ReadRows | Command::ReadModifiers => Outcome::Dispatched(transaction.command),
            Command::SetIndicator(on) => {
                self.matrix.drive_indicator(on);
                Outcome::Dispatched(transaction.command)
            }
            Command::Unknown(byte) => {
                self.state = LoopState::Resetting;
                self.resync();
                Outcome::Resynced(byte)
            }
        };

        // Best effort; a full ring just drops it.
        self.recorder.record(transaction.diag);
        outcome
    }

    /// Loop forever, handing every resync byte to `on_resync`.
    pub fn run(&mut self, mut on_resync: impl FnMut(u8)) -> ! {
        loop {
            if let Outcome::Resynced(byte) = self.step() {
                on_resync(byte);
            }
        }
    }

    fn resync(&mut self) {
        self.workaround.reset();
        self.resets = self.resets.wrapping_add(1);
        self.state = LoopState::Running;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Resets since start-up, not counting the initial configuration.
    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn matrix(&self) -> &M {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut M {
        &mut self.matrix
    }

    pub fn workaround(&self) -> &W {
        &self.workaround
    }
}
