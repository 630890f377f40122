use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use v06c_kbd_protocol::{Command, DiagnosticEntry, Framing};

/// One captured transaction and the log line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRecord {
    pub line: usize,
    pub entry: DiagnosticEntry,
}

/// Parse a captured console log into transaction records.
///
/// Accepts two line shapes:
/// - `diag xx xx xx xx`, anywhere in the line (defmt prefixes are fine)
/// - four bare hex bytes and nothing else
///
/// `diag begin N` / `diag end` bracket a dump and are checked against the
/// number of entries in between. Everything else is skipped.
pub fn parse_dump(input: &str) -> Result<Vec<DumpRecord>> {
    let mut records = Vec::new();
    // (line of `begin`, announced count, records before it)
    let mut open: Option<(usize, usize, usize)> = None;

    for (line_num, line) in input.lines().enumerate() {
        let line_num = line_num + 1;

        let Some(rest) = after_tag(line) else {
            if let Some(bytes) = bare_entry(line) {
                records.push(DumpRecord {
                    line: line_num,
                    entry: DiagnosticEntry::new(bytes),
                });
            }
            continue;
        };

        let mut words = rest.split_whitespace();
        match words.next() {
            Some("begin") => {
                if let Some((begin, _, _)) = open {
                    bail!("line {}: dump opened on line {} never ended", line_num, begin);
                }
                let count = words
                    .next()
                    .with_context(|| format!("line {}: missing entry count", line_num))?
                    .parse()
                    .with_context(|| format!("line {}: invalid entry count", line_num))?;
                open = Some((line_num, count, records.len()));
            }
            Some("end") => {
                let Some((begin, count, start)) = open.take() else {
                    bail!("line {}: `diag end` without `diag begin`", line_num);
                };
                let got = records.len() - start;
                if got != count {
                    bail!(
                        "line {}: dump opened on line {} announced {} entries, got {}",
                        line_num,
                        begin,
                        count,
                        got
                    );
                }
            }
            _ => {
                let bytes = parse_entry(rest)
                    .with_context(|| format!("line {}: malformed diag entry", line_num))?;
                records.push(DumpRecord {
                    line: line_num,
                    entry: DiagnosticEntry::new(bytes),
                });
            }
        }
    }

    if let Some((begin, _, _)) = open {
        bail!("line {}: dump never ended", begin);
    }

    Ok(records)
}

fn after_tag(line: &str) -> Option<&str> {
    let at = line.find("diag")?;
    let rest = &line[at + "diag".len()..];
    // `diagnostic` and friends are not ours.
    if rest.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(rest)
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || matches!(c, ',' | '[' | ']'))
        .filter(|t| !t.is_empty())
}

fn hex_byte(token: &str) -> Result<u8> {
    let digits = token.trim_start_matches("0x");
    if digits.is_empty() || digits.len() > 2 {
        bail!("`{}` is not a hex byte", token);
    }
    u8::from_str_radix(digits, 16).with_context(|| format!("`{}` is not a hex byte", token))
}

fn parse_entry(text: &str) -> Result<[u8; 4]> {
    let mut bytes = [0u8; 4];
    let mut count = 0;
    for token in tokens(text) {
        if count == bytes.len() {
            bail!("more than {} bytes", bytes.len());
        }
        bytes[count] = hex_byte(token)?;
        count += 1;
    }
    if count != bytes.len() {
        bail!("expected {} bytes, got {}", bytes.len(), count);
    }
    Ok(bytes)
}

fn bare_entry(line: &str) -> Option<[u8; 4]> {
    parse_entry(line).ok()
}

/// Tallies over a whole dump.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub transactions: usize,
    pub by_command: BTreeMap<&'static str, usize>,
    pub resyncs: usize,
    pub select_held: usize,
}

impl Summary {
    pub fn of(records: &[DumpRecord], framing: Framing) -> Self {
        let mut summary = Summary::default();
        for record in records {
            let command = record.entry.command(framing);
            summary.transactions += 1;
            *summary.by_command.entry(command.opcode().name()).or_default() += 1;
            if !command.is_known() {
                summary.resyncs += 1;
            }
            if record.entry.select_held() {
                summary.select_held += 1;
            }
        }
        summary
    }
}

/// Human-readable form of a decoded command.
pub fn describe(command: Command) -> String {
    match command {
        Command::SelectColumns(mask) => format!("select-columns {:#010b}", mask),
        Command::ReadRows => "read-rows".to_string(),
        Command::ReadModifiers => "read-modifiers".to_string(),
        Command::SetIndicator(on) => format!("set-indicator {}", if on { "on" } else { "off" }),
        Command::Unknown(byte) => format!("unknown {:#04x} (reset)", byte),
    }
}
