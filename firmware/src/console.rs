use v06c_kbd_protocol::{DiagnosticEntry, DiagnosticSink};

/// Prints captured transactions on the defmt channel, one line each, in the
/// form `v06c-kbd-cli decode` reads back.
pub struct DefmtConsole;

impl DiagnosticSink for DefmtConsole {
    fn begin(&mut self, count: usize) {
        defmt::println!("diag begin {=usize}", count);
    }

    fn emit(&mut self, _index: usize, entry: &DiagnosticEntry) {
        let [a, b, c, d] = entry.bytes();
        defmt::println!("diag {=u8:x} {=u8:x} {=u8:x} {=u8:x}", a, b, c, d);
    }

    fn end(&mut self) {
        defmt::println!("diag end");
    }
}
