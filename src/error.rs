//! Errors raised while converting between `.LF` bytes and transcripts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The binary is not a whole number of records followed by the SysMem block.
  #[error("input is {len} bytes; expected a multiple of 16 bytes of records followed by 400 bytes of SysMem")]
  Format { len: usize },

  /// A record line could not be turned into a record.
  #[error("line {line}: {kind}")]
  Parse { line: usize, kind: ParseErrorKind },

  #[error(transparent)]
  Transcript(#[from] TranscriptError),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParseErrorKind {
  #[error("`{0}` is not a record line")]
  Malformed(String),

  #[error("`{0}` is not a two digit hex command byte")]
  BadCommandByte(String),

  #[error("command byte {command_byte:02X} is `{expected}`, not `{found}`")]
  NameMismatch { command_byte: u8, expected: String, found: String },

  #[error("raw annotation `{0}` is not 32 hex characters")]
  BadRawHex(String),

  #[error("`{command}` takes {expected} parameters but {found} were given")]
  ParameterCount { command: String, expected: usize, found: usize },

  #[error("parameter {position} `{token}` is not a valid {expected}")]
  BadParameter { position: usize, token: String, expected: String },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TranscriptError {
  #[error("SysMem raw hex section not found")]
  MissingRawHex,

  #[error("line {line}: `{header}` is out of order")]
  Misordered { line: usize, header: String },

  #[error("line {line}: `{token}` is not a hex byte")]
  BadHexByte { line: usize, token: String },

  #[error("SysMem raw hex section ending at line {line} holds {found} bytes; expected 400")]
  SysMemSize { line: usize, found: usize },
}
