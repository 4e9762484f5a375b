//! protext - Edit protobuf messages as text, without a schema
//!
//! This tool decodes length-prefixed protobuf/gRPC messages into an
//! editable line-oriented text form and encodes edited text back into
//! wire bytes.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use protext_core::text::writer::walk;
use protext_core::{
    DecodedMessage, DecoderConfig, EncoderConfig, MessageDecoder, MessageEncoder, StatsVisitor,
    DEFAULT_MAX_DEPTH,
};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, Level};
use tracing_subscriber::EnvFilter;

/// Decode protobuf messages to editable text and encode them back
#[derive(Parser, Debug)]
#[command(name = "protext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a binary message into text
    Decode(DecodeArgs),
    /// Encode text into a binary message
    Encode(CommonArgs),
    /// Decode and re-encode a message, checking the bytes survive unchanged
    Roundtrip(CommonArgs),
    /// Print field statistics for a binary message
    Stats(CommonArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Input file (stdin when omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Read or write a bare payload without the 5-byte envelope
    #[arg(long)]
    raw: bool,

    /// Maximum nested message depth
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Overwrite an existing output file
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Indentation added per nesting level
    #[arg(long, default_value = "  ")]
    indent: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Decode(args) => run_decode(args),
        Command::Encode(args) => run_encode(args),
        Command::Roundtrip(args) => run_roundtrip(args),
        Command::Stats(args) => run_stats(args),
    }
}

/// Decode bytes with the given settings
fn decode_bytes(args: &CommonArgs, indent: &str, data: &[u8]) -> Result<DecodedMessage> {
    let config = DecoderConfig::new()
        .max_depth(args.max_depth)
        .indent_str(indent);
    let decoder = MessageDecoder::with_config(config);

    let decoded = if args.raw {
        decoder.decode_payload(data)
    } else {
        decoder.decode(data)
    };
    decoded.context("Failed to decode message")
}

/// Encode text with the given settings
fn encode_text(args: &CommonArgs, text: &str) -> Result<Vec<u8>> {
    let encoder = MessageEncoder::with_config(EncoderConfig::new().max_depth(args.max_depth));

    let encoded = if args.raw {
        encoder.encode_payload(text)
    } else {
        encoder.encode(text)
    };
    encoded.context("Failed to encode text")
}

fn run_decode(args: &DecodeArgs) -> Result<()> {
    let data = read_input(args.common.file.as_deref())?;
    trace!("Read {} bytes", data.len());

    let decoded = decode_bytes(&args.common, &args.indent, &data)?;
    info!("Decoded {} top-level fields", decoded.lines.len());

    let mut text = decoded.text;
    if !text.is_empty() {
        text.push('\n');
    }
    write_output(args.common.output.as_deref(), text.as_bytes(), args.common.force)
}

fn run_encode(args: &CommonArgs) -> Result<()> {
    let data = read_input(args.file.as_deref())?;
    let text = String::from_utf8(data).context("Input text is not valid UTF-8")?;

    let encoded = encode_text(args, &text)?;
    info!("Encoded {} bytes", encoded.len());

    write_output(args.output.as_deref(), &encoded, args.force)
}

fn run_roundtrip(args: &CommonArgs) -> Result<()> {
    let data = read_input(args.file.as_deref())?;
    let decoded = decode_bytes(args, "  ", &data)?;
    let encoded = encode_text(args, &decoded.text)?;

    if let Some(offset) = first_difference(&data, &encoded) {
        bail!(
            "Re-encoded message differs from the input at byte {} ({} bytes in, {} bytes out)",
            offset,
            data.len(),
            encoded.len()
        );
    }

    let report = format!("Round trip OK: {} bytes\n", encoded.len());
    write_output(args.output.as_deref(), report.as_bytes(), args.force)
}

fn run_stats(args: &CommonArgs) -> Result<()> {
    let data = read_input(args.file.as_deref())?;
    let decoded = decode_bytes(args, "  ", &data)?;

    let mut stats = StatsVisitor::default();
    walk(&decoded.fields, &mut stats).context("Failed to walk decoded fields")?;
    debug!("{:?}", stats);

    write_output(args.output.as_deref(), format_stats(&stats).as_bytes(), args.force)
}

/// Render statistics as aligned `name: count` lines
fn format_stats(stats: &StatsVisitor) -> String {
    let rows = [
        ("fields", stats.total()),
        ("varint", stats.varint_count),
        ("fixed64", stats.fixed64_count),
        ("double", stats.double_count),
        ("fixed32", stats.fixed32_count),
        ("float", stats.float_count),
        ("string", stats.string_count),
        ("bytes", stats.bytes_count),
        ("message", stats.message_count),
        ("max depth", stats.max_depth),
    ];
    rows.iter()
        .map(|(name, count)| format!("{:<10} {}\n", format!("{}:", name), count))
        .collect()
}

/// Index of the first byte where two buffers disagree
fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

/// Read the whole input file, or stdin when no path is given
fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            if !path.is_file() {
                bail!("Input file does not exist: {}", path.display());
            }
            fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))
        }
        None => {
            let mut data = Vec::new();
            std::io::stdin()
                .read_to_end(&mut data)
                .context("Failed to read stdin")?;
            Ok(data)
        }
    }
}

/// Write output to a file, or stdout when no path is given
fn write_output(path: Option<&Path>, content: &[u8], force: bool) -> Result<()> {
    let Some(path) = path else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(content).context("Failed to write stdout")?;
        return stdout.flush().context("Failed to flush stdout");
    };

    // Create parent directories
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Check if file exists
    if path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write file: {}", path.display()))?;

    info!("Wrote {}", path.display());
    Ok(())
}
