//! lfcodec - `.LF` program transcoder
//!
//! Decodes Fisnar `.LF` programs to editable text transcripts and encodes transcripts back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lfcodec::reference::{command_table, field_table};
use lfcodec::transcript::{DEFAULT_HEX_BYTES_PER_LINE, DEFAULT_RAW_COLUMN};
use lfcodec::{Program, Transcript, TranscriptOptions};

#[derive(Parser, Debug)]
#[command(name = "lfcodec")]
#[command(about = "Convert .LF programs to text transcripts and back")]
#[command(version)]
#[command(group(ArgGroup::new("mode").required(true).args(["decode", "encode", "reference"])))]
struct Cli {
  /// Decode a .LF binary into a transcript
  #[arg(short, long)]
  decode: bool,

  /// Encode a transcript into a .LF binary
  #[arg(short, long)]
  encode: bool,

  /// Print the command and SysMem field references
  #[arg(short, long)]
  reference: bool,

  /// Input file
  #[arg(required_unless_present = "reference")]
  input: Option<PathBuf>,

  /// Output file, written only if the conversion succeeds
  #[arg(short, long, required_unless_present = "reference")]
  output: Option<PathBuf>,

  /// Column at which `# raw:` annotations start
  #[arg(long, default_value_t = DEFAULT_RAW_COLUMN)]
  raw_column: usize,

  /// Bytes per line in the SysMem hex dump
  #[arg(long, default_value_t = DEFAULT_HEX_BYTES_PER_LINE, value_parser = positive)]
  hex_bytes_per_line: usize,

  /// Log section transitions and every ignored line
  #[arg(short, long)]
  verbose: bool,
}

impl Cli {
  fn options(&self) -> TranscriptOptions {
    TranscriptOptions {
      raw_column         : self.raw_column,
      hex_bytes_per_line : self.hex_bytes_per_line,
    }
  }
}

fn positive(text: &str) -> Result<usize, String> {
  match text.parse::<usize>() {
    Ok(0)      => Err("must be at least 1".to_string()),
    Ok(n)      => Ok(n),
    Err(error) => Err(error.to_string()),
  }
}

fn decode_file(input: &Path, output: &Path, options: &TranscriptOptions) -> Result<()> {
  let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
  let program = Program::decode(&data).with_context(|| format!("decoding {}", input.display()))?;
  let text = program.render(options);

  fs::write(output, text).with_context(|| format!("writing {}", output.display()))?;
  info!(
    "Decoded {} records ({} unknown) from {} to {}",
    program.records().len(),
    program.warnings().len(),
    input.display(),
    output.display()
  );
  Ok(())
}

fn encode_file(input: &Path, output: &Path) -> Result<()> {
  let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
  let transcript = Transcript::parse(&text).with_context(|| format!("parsing {}", input.display()))?;
  let bytes = transcript.encode();

  fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
  info!(
    "Encoded {} records ({} repacked from edited lines) from {} to {}",
    transcript.drafts().len(),
    transcript.edited_count(),
    input.display(),
    output.display()
  );
  Ok(())
}

fn run(cli: &Cli) -> Result<()> {
  if cli.reference {
    println!("Command Reference\n{}", command_table());
    println!("SysMem Field Reference\n{}", field_table());
    return Ok(());
  }

  let (input, output) = match (&cli.input, &cli.output) {
    (Some(input), Some(output)) => (input, output),
    _ => anyhow::bail!("an input file and -o/--output are required"),
  };
  match cli.decode {
    true  => decode_file(input, output, &cli.options()),
    false => encode_file(input, output),
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = match cli.verbose {
    true  => "debug",
    false => "info",
  };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .init();

  run(&cli)
}
