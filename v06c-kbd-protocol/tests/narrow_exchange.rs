mod common;

use common::{narrow_script, BenchMatrix, ScriptedPort};
use v06c_kbd_protocol::matrix::pins;
use v06c_kbd_protocol::port::{ClockPhase, ClockPolarity};
use v06c_kbd_protocol::{
    Command, DiagnosticEntry, DiagnosticRing, ExchangeLoop, Framing, LoopState, MatrixIo, Modifiers,
    NarrowExchange, Outcome, PeripheralState, Workaround,
};

#[test]
fn read_rows_replies_with_a_fresh_sample() {
    let mut ring = DiagnosticRing::<16>::new();
    let (recorder, _reader) = ring.split();
    let matrix = BenchMatrix::with_rows(0x01).then(0x01).then(0x0a);
    let port = ScriptedPort::new(narrow_script(&[Command::ReadRows]));
    let mut exchange = ExchangeLoop::new(NarrowExchange::new(port), matrix, recorder);

    assert_eq!(exchange.step(), Outcome::Dispatched(Command::ReadRows));

    let port = exchange.workaround().port();
    assert_eq!(port.sent, vec![0x00, 0x0a, 0x00]);
    assert_eq!(port.remaining(), 0);
    assert_eq!(exchange.matrix().samples, 2);
}

#[test]
fn read_modifiers_replies_with_the_modifier_byte() {
    let mut ring = DiagnosticRing::<16>::new();
    let (recorder, _reader) = ring.split();
    let levels = (1 << pins::RUS_LAT) | (1 << pins::SBROS) | 0xff;
    let port = ScriptedPort::new(narrow_script(&[Command::ReadModifiers]));
    let mut exchange = ExchangeLoop::new(NarrowExchange::new(port), BenchMatrix::new(levels), recorder);

    exchange.step();

    let expected = (Modifiers::RUS_LAT | Modifiers::SBROS).bits();
    assert_eq!(exchange.workaround().port().sent[1], u16::from(expected));
}

#[test]
fn select_columns_takes_the_second_byte() {
    let mut ring = DiagnosticRing::<16>::new();
    let (recorder, _reader) = ring.split();
    let port = ScriptedPort::new(narrow_script(&[Command::SelectColumns(0b0000_0101)]));
    let mut exchange = ExchangeLoop::new(NarrowExchange::new(port), BenchMatrix::with_rows(0), recorder);

    assert_eq!(exchange.step(), Outcome::Dispatched(Command::SelectColumns(0b0000_0101)));
    assert_eq!(exchange.matrix().columns(), 0b0000_0101);
    assert_eq!(exchange.matrix().column_pins(), 0b1111_1010);
    // Nothing to report while taking a payload.
    assert_eq!(exchange.workaround().port().sent, vec![0x00, 0x00, 0x00]);
}

#[test]
fn indicator_follows_bit_three() {
    let mut ring = DiagnosticRing::<16>::new();
    let (recorder, _reader) = ring.split();
    let port = ScriptedPort::new([0xe8, 0xf7, 0x00, 0xe8, 0x08, 0x00]);
    let mut exchange = ExchangeLoop::new(NarrowExchange::new(port), BenchMatrix::with_rows(0), recorder);

    exchange.step();
    assert!(exchange.matrix().indicator());
    assert!(!exchange.matrix().indicator_pin());

    exchange.step();
    assert!(!exchange.matrix().indicator());
    assert!(exchange.matrix().indicator_pin());
    assert_eq!(exchange.matrix().indicator_edges, 2);
}

#[test]
fn unknown_command_consumes_one_exchange_then_recovers() {
    let mut ring = DiagnosticRing::<16>::new();
    let (recorder, _reader) = ring.split();
    let mut script = vec![0x5a];
    script.extend(narrow_script(&[Command::ReadRows]));
    let port = ScriptedPort::new(script);
    let mut exchange = ExchangeLoop::new(NarrowExchange::new(port), BenchMatrix::with_rows(0x33), recorder);

    assert_eq!(exchange.step(), Outcome::Resynced(0x5a));
    assert_eq!(exchange.workaround().port().sent.len(), 1);
    assert_eq!(exchange.workaround().port().configured.len(), 2);
    assert_eq!(exchange.resets(), 1);
    assert_eq!(exchange.state(), LoopState::Running);

    assert_eq!(exchange.step(), Outcome::Dispatched(Command::ReadRows));
    let port = exchange.workaround().port();
    assert_eq!(port.sent[1..], [0x00, 0x33, 0x00]);
    assert_eq!(port.configured.len(), 2);
}

#[test]
fn diagnostics_record_the_raw_bytes() {
    let mut ring = DiagnosticRing::<3>::new();
    let (recorder, mut reader) = ring.split();
    let mut script = narrow_script(&[Command::SelectColumns(0x80), Command::SetIndicator(false)]);
    script.push(0x99);
    let mut port = ScriptedPort::new(script);
    port.select = true;
    let mut exchange = ExchangeLoop::new(NarrowExchange::new(port), BenchMatrix::with_rows(0), recorder);

    for _ in 0..3 {
        exchange.step();
    }

    let entries = reader.take_full().expect("ring should be full");
    assert_eq!(
        entries,
        &[
            DiagnosticEntry::new([0xe5, 0x80, 0x00, 1]),
            DiagnosticEntry::new([0xe8, 0x08, 0x00, 1]),
            DiagnosticEntry::new([0x99, 0x00, 0x00, 1]),
        ]
    );
    assert_eq!(entries[1].command(Framing::NarrowExchange), Command::SetIndicator(false));
    assert!(!entries[2].select_held());
}

#[test]
fn narrow_strategy_configures_mode_three_eight_bit() {
    let mut narrow = NarrowExchange::new(ScriptedPort::new([]));
    narrow.reset();
    let state: PeripheralState = narrow.port().configured[0];
    assert_eq!(state.word_bits(), 8);
    assert_eq!(state.mode(), 3);
    assert_eq!(state.polarity, ClockPolarity::IdleHigh);
    assert_eq!(state.phase, ClockPhase::SecondEdge);
    assert_eq!(narrow.state().framing, Framing::NarrowExchange);
}
