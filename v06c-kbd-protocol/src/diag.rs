//! Fixed-capacity transaction capture.
//!
//! The exchange loop records four raw bytes per transaction until the ring
//! is full; another core notices, dumps the lot, and marks it drained.
//! Nothing is allocated and nothing is locked: the fill index only moves
//! forward under the writer and the reader only acts once it reads exactly
//! `N`, so the worst a stale read can do is delay the dump by a poll.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::codec::Command;
use crate::port::Framing;

/// Raw bytes of one transaction.
///
/// Wide framing: `[payload, command, select when the word completed,
/// select after decode]`.
/// Narrow framing: `[command, second rx, third rx, select after]`, with
/// `0x00` for exchanges that never happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiagnosticEntry(pub [u8; 4]);

impl DiagnosticEntry {
    pub const EMPTY: Self = Self([0; 4]);

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// The command this entry records.
    pub const fn command(&self, framing: Framing) -> Command {
        let [a, b, _, _] = self.0;
        match framing {
            Framing::WideFramed => Command::decode(b, a),
            Framing::NarrowExchange => Command::decode(a, b),
        }
    }

    /// Whether select was still asserted (low) when the transaction ended.
    pub const fn select_held(&self) -> bool {
        self.0[3] == 0
    }
}

/// Backing storage shared by a [`DiagnosticRecorder`] and a
/// [`DiagnosticReader`].
pub struct DiagnosticRing<const N: usize> {
    entries: UnsafeCell<[DiagnosticEntry; N]>,
    /// `0..N` filling, `N` full, `N + 1` drained.
    index: AtomicUsize,
}

// SAFETY: `split` hands out exactly one recorder and one reader. The recorder
// writes slot `i` only while the index is `i < N` and publishes it with a
// release store; the reader only looks at the slots after an acquire load
// returns `N`, after which the recorder never writes again until the reader
// itself rearms.
unsafe impl<const N: usize> Sync for DiagnosticRing<N> {}

impl<const N: usize> DiagnosticRing<N> {
    pub const fn new() -> Self {
        Self {
            entries: UnsafeCell::new([DiagnosticEntry::EMPTY; N]),
            index: AtomicUsize::new(0),
        }
    }

    /// Entries written in the current fill cycle.
    pub fn len(&self) -> usize {
        self.index.load(Ordering::Acquire).min(N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.index.load(Ordering::Acquire) == N
    }

    pub fn is_drained(&self) -> bool {
        self.index.load(Ordering::Acquire) > N
    }

    /// Split into the single writer and the single reader.
    pub fn split(&mut self) -> (DiagnosticRecorder<'_, N>, DiagnosticReader<'_, N>) {
        let ring = &*self;
        (DiagnosticRecorder { ring }, DiagnosticReader { ring })
    }
}

impl<const N: usize> Default for DiagnosticRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Writing half, owned by the exchange loop.
pub struct DiagnosticRecorder<'a, const N: usize> {
    ring: &'a DiagnosticRing<N>,
}

impl<'a, const N: usize> DiagnosticRecorder<'a, N> {
    /// Append an entry. Returns `false`, and drops the entry, once the ring
    /// is full and not yet rearmed.
    pub fn record(&mut self, entry: DiagnosticEntry) -> bool {
        let index = self.ring.index.load(Ordering::Acquire);
        if index >= N {
            return false;
        }

        // SAFETY: only this recorder writes, and the reader does not touch
        // slot `index` until the store below makes it visible.
        unsafe {
            (*self.ring.entries.get())[index] = entry;
        }
        self.ring.index.store(index + 1, Ordering::Release);
        true
    }

    pub fn ring(&self) -> &'a DiagnosticRing<N> {
        self.ring
    }
}

/// Where drained entries go.
pub trait DiagnosticSink {
    fn begin(&mut self, _count: usize) {}

    fn emit(&mut self, index: usize, entry: &DiagnosticEntry);

    fn end(&mut self) {}
}

/// Reading half, owned by the diagnostic context.
pub struct DiagnosticReader<'a, const N: usize> {
    ring: &'a DiagnosticRing<N>,
}

impl<'a, const N: usize> DiagnosticReader<'a, N> {
    /// If the ring is exactly full, mark it drained and return its entries.
    /// Returns `None` while filling and after the one drain of this cycle.
    pub fn take_full(&mut self) -> Option<&[DiagnosticEntry]> {
        if self.ring.index.load(Ordering::Acquire) != N {
            return None;
        }
        self.ring.index.store(N + 1, Ordering::Release);

        // SAFETY: the index is past `N`, so the recorder no longer writes.
        Some(unsafe { &*self.ring.entries.get() })
    }

    /// Emit everything to `sink` if the ring just filled up. Returns whether
    /// a dump happened.
    pub fn poll<S: DiagnosticSink>(&mut self, sink: &mut S) -> bool {
        let Some(entries) = self.take_full() else {
            return false;
        };

        sink.begin(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            sink.emit(index, entry);
        }
        sink.end();
        true
    }

    /// Start a new fill cycle after a drain. Does nothing before one.
    pub fn rearm(&mut self) {
        if self.ring.index.load(Ordering::Acquire) > N {
            self.ring.index.store(0, Ordering::Release);
        }
    }

    pub fn ring(&self) -> &'a DiagnosticRing<N> {
        self.ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect(Vec<(usize, DiagnosticEntry)>, usize);

    impl DiagnosticSink for Collect {
        fn begin(&mut self, _count: usize) {
            self.1 += 1;
        }

        fn emit(&mut self, index: usize, entry: &DiagnosticEntry) {
            self.0.push((index, *entry));
        }
    }

    fn entry(n: u8) -> DiagnosticEntry {
        DiagnosticEntry::new([n, 0xe6, 1, 1])
    }

    #[test]
    fn overflow_is_dropped() {
        let mut ring = DiagnosticRing::<8>::new();
        let (mut recorder, mut reader) = ring.split();

        let accepted = (0..18u8).filter(|&n| recorder.record(entry(n))).count();
        assert_eq!(accepted, 8);
        assert!(recorder.ring().is_full());

        let mut sink = Collect(Vec::new(), 0);
        assert!(reader.poll(&mut sink));
        assert!(!reader.poll(&mut sink));
        assert_eq!(sink.1, 1);
        assert_eq!(sink.0.len(), 8);
        for (i, (index, e)) in sink.0.iter().enumerate() {
            assert_eq!(*index, i);
            assert_eq!(*e, entry(i as u8));
        }
    }

    #[test]
    fn nothing_to_take_while_filling() {
        let mut ring = DiagnosticRing::<4>::new();
        let (mut recorder, mut reader) = ring.split();
        assert!(reader.take_full().is_none());
        recorder.record(entry(1));
        assert!(reader.take_full().is_none());
        assert_eq!(reader.ring().len(), 1);
    }

    #[test]
    fn drained_ring_stays_frozen_until_rearmed() {
        let mut ring = DiagnosticRing::<2>::new();
        let (mut recorder, mut reader) = ring.split();
        recorder.record(entry(1));
        recorder.record(entry(2));
        assert!(reader.take_full().is_some());
        assert!(recorder.ring().is_drained());
        assert!(!recorder.record(entry(3)));

        reader.rearm();
        assert!(recorder.ring().is_empty());
        assert!(recorder.record(entry(4)));
        assert!(recorder.record(entry(5)));
        assert_eq!(reader.take_full(), Some(&[entry(4), entry(5)][..]));
    }

    #[test]
    fn rearm_before_drain_keeps_entries() {
        let mut ring = DiagnosticRing::<2>::new();
        let (mut recorder, mut reader) = ring.split();
        recorder.record(entry(1));
        reader.rearm();
        assert_eq!(reader.ring().len(), 1);
    }

    #[test]
    fn entry_layouts() {
        let wide = DiagnosticEntry::new([0xc0, 0xe5, 1, 0]);
        assert_eq!(wide.command(Framing::WideFramed), Command::SelectColumns(0xc0));
        assert!(wide.select_held());

        let narrow = DiagnosticEntry::new([0xe8, 0x08, 0x00, 1]);
        assert_eq!(narrow.command(Framing::NarrowExchange), Command::SetIndicator(false));
        assert!(!narrow.select_held());
    }
}
