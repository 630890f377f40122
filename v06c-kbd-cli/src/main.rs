mod dump;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use v06c_kbd_protocol::codec::{decode_response, host_narrow_bytes, host_wide_frame};
use v06c_kbd_protocol::matrix::ROWS;
use v06c_kbd_protocol::{Command, Framing, Opcode};

#[derive(Parser)]
#[command(name = "v06c-kbd-cli")]
#[command(about = "Host-side tools for the v06c keyboard bridge")]
struct Cli {
    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Decode a diagnostic dump captured from the firmware's defmt console
    Decode {
        /// Path to the captured log
        file: String,
        /// Framing the firmware was built with
        #[arg(long, value_enum, default_value_t = FramingArg::Wide)]
        framing: FramingArg,
    },
    /// Show what a host clocks out for a command
    Frame {
        #[arg(value_enum)]
        command: CommandArg,
        /// Payload byte (0x.., 0b.. or decimal), for commands that take one
        payload: Option<String>,
    },
    /// Split a response word into rows and modifiers
    Response {
        /// Word as received (0x.., 0b.. or decimal)
        word: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FramingArg {
    Wide,
    Narrow,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Wide => Framing::WideFramed,
            FramingArg::Narrow => Framing::NarrowExchange,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CommandArg {
    SelectColumns,
    ReadRows,
    ReadModifiers,
    SetIndicator,
}

impl From<CommandArg> for Opcode {
    fn from(arg: CommandArg) -> Self {
        match arg {
            CommandArg::SelectColumns => Opcode::SelectColumns,
            CommandArg::ReadRows => Opcode::ReadRows,
            CommandArg::ReadModifiers => Opcode::ReadModifiers,
            CommandArg::SetIndicator => Opcode::SetIndicator,
        }
    }
}

/// Parse `0x..`, `0b..` or decimal.
fn parse_number(text: &str) -> Result<u32> {
    let text = text.trim().replace('_', "");
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2)
    } else {
        text.parse()
    };
    parsed.with_context(|| format!("`{}` is not a number", text))
}

fn parse_byte(text: &str) -> Result<u8> {
    let value = parse_number(text)?;
    u8::try_from(value).with_context(|| format!("{:#x} does not fit in a byte", value))
}

fn parse_word(text: &str) -> Result<u16> {
    let value = parse_number(text)?;
    u16::try_from(value).with_context(|| format!("{:#x} does not fit in 16 bits", value))
}

/// Join an opcode with its payload, refusing payloads the host never sends.
fn frame_command(opcode: Opcode, payload: Option<&str>) -> Result<Command> {
    let payload = match payload {
        Some(text) if !opcode.takes_payload() => {
            bail!("{} takes no payload, got `{}`", opcode.name(), text)
        }
        Some(text) => parse_byte(text)?,
        None if opcode.takes_payload() => bail!("{} needs a payload byte", opcode.name()),
        None => 0,
    };
    Ok(Command::decode(opcode.byte(), payload))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Action::Decode { file, framing } => {
            let contents = fs::read_to_string(&file).with_context(|| format!("reading {}", file))?;
            let records = dump::parse_dump(&contents).context("parsing diagnostic dump")?;
            if records.is_empty() {
                bail!("no diagnostic entries in {}", file);
            }

            let framing = Framing::from(framing);
            for record in &records {
                let [a, b, c, d] = record.entry.bytes();
                println!(
                    "{:>6}  {:02x} {:02x} {:02x} {:02x}  {}{}",
                    record.line,
                    a,
                    b,
                    c,
                    d,
                    dump::describe(record.entry.command(framing)),
                    if record.entry.select_held() { "  [select held]" } else { "" }
                );
            }

            let summary = dump::Summary::of(&records, framing);
            println!();
            println!("{} transactions", summary.transactions);
            for (name, count) in &summary.by_command {
                println!("  {:<16} {}", name, count);
            }
            println!("{} resyncs, {} with select still held", summary.resyncs, summary.select_held);
        }
        Action::Frame { command, payload } => {
            let command = frame_command(Opcode::from(command), payload.as_deref())?;

            let (bytes, len) = host_narrow_bytes(command);
            let narrow: Vec<String> = bytes[..len].iter().map(|b| format!("{:02x}", b)).collect();

            println!("{}", dump::describe(command));
            println!("wide:   0x{:04x}", host_wide_frame(command));
            println!("narrow: {}", narrow.join(" "));
        }
        Action::Response { word } => {
            let sample = decode_response(parse_word(&word)?);
            let rows: Vec<String> = (0..ROWS)
                .filter(|row| sample.rows & (1 << row) != 0)
                .map(|row| row.to_string())
                .collect();
            let modifiers: Vec<&str> = sample.modifiers.iter_names().map(|(name, _)| name).collect();

            println!("rows:      {:#010b} [{}]", sample.rows, rows.join(", "));
            println!(
                "modifiers: {:#04x} [{}]",
                sample.modifiers.bits(),
                modifiers.join(" | ")
            );
        }
    }

    Ok(())
}
