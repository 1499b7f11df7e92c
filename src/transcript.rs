/*!
  Whole-program conversion between `.LF` bytes and transcripts.

  A transcript is laid out as
    ```text
    # <n> records
    <record line>*
    ===== SysMem (400 bytes) as raw hex =====
    <hex bytes>*
    ===== SysMem (decoded fields) =====
    <field line>*
    ```
  and is read back with a small state machine over the three sections:

    Records --raw hex header--> RawHex --fields header--> Fields --EOF--> done

  Record lines become `Draft`s. The raw hex section becomes the SysMem block. Field lines are
  only compared against that block and reported; nothing in the fields section, including a
  stray header, can take the machine back to an earlier section.
*/

use std::fmt::{Display, Formatter};

use tracing::{debug, warn};

use crate::bytecode::{parse_record_line, render_record, Draft, Raw, Record, RECORD_SIZE};
use crate::error::{Error, TranscriptError};
use crate::sysmem::{FieldNote, MetadataBlock, RawDump, SysMem, FIELDS_HEADER, RAW_HEADER, SYSMEM_SIZE};

pub const DEFAULT_RAW_COLUMN: usize = 60;
pub const DEFAULT_HEX_BYTES_PER_LINE: usize = 20;

/// Every section header starts with this.
const SECTION_MARK: &str = "=====";

/// Layout choices for rendered transcripts. None of them affect how a transcript is read back.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TranscriptOptions {
  /// 1-based column at which `# raw:` annotations start.
  pub raw_column         : usize,
  /// Bytes per line in the SysMem raw hex section.
  pub hex_bytes_per_line : usize,
}

impl Default for TranscriptOptions {
  fn default() -> Self {
    TranscriptOptions {
      raw_column         : DEFAULT_RAW_COLUMN,
      hex_bytes_per_line : DEFAULT_HEX_BYTES_PER_LINE,
    }
  }
}

/// Conditions that do not stop a conversion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Warning {
  UnknownCommand { index: usize, offset: usize, command_id: u8 },
}

impl Display for Warning {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Warning::UnknownCommand { index, offset, command_id } => {
        write!(
          f,
          "record {} at offset {:#06X}: command {} is not in the Command Reference; kept as raw bytes",
          index, offset, command_id
        )
      }
    }
  }
}

// region Binary -> transcript

/// A decoded `.LF` program.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
  records  : Vec<Record>,
  metadata : MetadataBlock,
  warnings : Vec<Warning>,
}

impl Program {
  pub fn decode(data: &[u8]) -> Result<Program, Error> {
    if data.len() < SYSMEM_SIZE || (data.len() - SYSMEM_SIZE) % RECORD_SIZE != 0 {
      return Err(Error::Format { len: data.len() });
    }
    let (body, trailer) = data.split_at(data.len() - SYSMEM_SIZE);

    let mut records = Vec::with_capacity(body.len() / RECORD_SIZE);
    let mut warnings = Vec::new();
    for (index, chunk) in body.chunks_exact(RECORD_SIZE).enumerate() {
      let mut raw: Raw = [0; RECORD_SIZE];
      raw.copy_from_slice(chunk);
      let record = Record::decode(raw);

      if !record.is_known() {
        let warning = Warning::UnknownCommand {
          index,
          offset     : index * RECORD_SIZE,
          command_id : record.command_id,
        };
        warn!("{}", warning);
        warnings.push(warning);
      }
      #[cfg(feature = "trace_records")]
      tracing::trace!(index, "decoded {}", render_record(&record, 0));

      records.push(record);
    }

    let mut sysmem: SysMem = [0; SYSMEM_SIZE];
    sysmem.copy_from_slice(trailer);
    debug!(records = records.len(), "decoded program");

    Ok(Program { records, metadata: MetadataBlock::decode(sysmem), warnings })
  }

  pub fn records(&self) -> &[Record] {
    &self.records
  }

  pub fn metadata(&self) -> &MetadataBlock {
    &self.metadata
  }

  pub fn warnings(&self) -> &[Warning] {
    &self.warnings
  }

  /// The program's bytes, exactly as decoded.
  pub fn encode(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(self.records.len() * RECORD_SIZE + SYSMEM_SIZE);
    for record in &self.records {
      bytes.extend_from_slice(&record.raw);
    }
    bytes.extend_from_slice(self.metadata.raw());
    bytes
  }

  pub fn render(&self, options: &TranscriptOptions) -> String {
    let mut lines = vec![format!("# {} records", self.records.len())];
    for record in &self.records {
      lines.push(render_record(record, options.raw_column));
    }
    lines.extend(self.metadata.render_raw_dump(options.hex_bytes_per_line));
    lines.extend(self.metadata.render_fields(options.raw_column));

    let mut text = lines.join("\n");
    text.push('\n');
    text
  }
}

// endregion

// region Transcript -> binary

enum Phase {
  Records,
  RawHex(RawDump),
  Fields(MetadataBlock),
}

fn report(line: usize, note: &FieldNote) {
  match note {
    FieldNote::Consistent => {}
    FieldNote::ValueIgnored { name, shown, decoded } => {
      warn!(
        line,
        "{} shows `{}` but the raw hex decodes to `{}`; SysMem only changes through the raw hex section",
        name, shown, decoded
      );
    }
    FieldNote::RawIgnored { name } => {
      warn!(line, "raw hex of {} differs from the SysMem dump; the dump is used", name);
    }
    FieldNote::Unrecognized => {
      debug!(line, "not a SysMem field line; ignored");
    }
  }
}

/// A parsed, possibly edited, transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct Transcript {
  drafts      : Vec<Draft>,
  metadata    : MetadataBlock,
  field_notes : Vec<(usize, FieldNote)>,
}

impl Transcript {
  pub fn parse(text: &str) -> Result<Transcript, Error> {
    let mut phase = Phase::Records;
    let mut drafts = Vec::new();
    let mut field_notes = Vec::new();
    let mut last_line = 0;

    for (index, line) in text.lines().enumerate() {
      let line_number = index + 1;
      last_line = line_number;
      let trimmed = line.trim();
      if trimmed.is_empty() || (trimmed.starts_with('#') && !matches!(phase, Phase::Fields(_))) {
        continue;
      }

      match &mut phase {
        Phase::Records => {
          if trimmed.starts_with(RAW_HEADER) {
            debug!(line = line_number, records = drafts.len(), "SysMem raw hex section");
            phase = Phase::RawHex(RawDump::new());
          } else if trimmed.starts_with(SECTION_MARK) {
            return Err(TranscriptError::Misordered { line: line_number, header: trimmed.to_string() }.into());
          } else {
            drafts.push(parse_record_line(line, line_number)?);
          }
        }

        Phase::RawHex(dump) => {
          if trimmed.starts_with(FIELDS_HEADER) {
            let block = std::mem::take(dump).finish(line_number)?;
            debug!(line = line_number, "SysMem decoded fields section");
            phase = Phase::Fields(block);
          } else if trimmed.starts_with(SECTION_MARK) {
            return Err(TranscriptError::Misordered { line: line_number, header: trimmed.to_string() }.into());
          } else {
            dump.push_line(trimmed, line_number)?;
          }
        }

        Phase::Fields(block) => {
          if trimmed.starts_with(SECTION_MARK) {
            warn!(line = line_number, "`{}` after the decoded fields is ignored", trimmed);
            continue;
          }
          let note = block.check_field_line(trimmed);
          report(line_number, &note);
          field_notes.push((line_number, note));
        }
      }
    }

    let metadata = match phase {
      Phase::Records       => return Err(TranscriptError::MissingRawHex.into()),
      Phase::RawHex(dump)  => dump.finish(last_line)?,
      Phase::Fields(block) => block,
    };

    Ok(Transcript { drafts, metadata, field_notes })
  }

  pub fn drafts(&self) -> &[Draft] {
    &self.drafts
  }

  pub fn metadata(&self) -> &MetadataBlock {
    &self.metadata
  }

  /// Diagnostics for the decoded-fields section, keyed by line number.
  pub fn field_notes(&self) -> &[(usize, FieldNote)] {
    &self.field_notes
  }

  pub fn edited_count(&self) -> usize {
    self.drafts.iter().filter(|draft| draft.is_edited()).count()
  }

  /// `records || sysmem`
  pub fn encode(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(self.drafts.len() * RECORD_SIZE + SYSMEM_SIZE);
    for draft in &self.drafts {
      let raw = draft.encode();
      #[cfg(feature = "trace_records")]
      tracing::trace!(edited = draft.is_edited(), "encoded {}", hex::encode_upper(raw));
      bytes.extend_from_slice(&raw);
    }
    bytes.extend_from_slice(&self.metadata.encode());
    bytes
  }
}

// endregion

/// Decodes a `.LF` program and renders its transcript.
pub fn binary_to_transcript(data: &[u8], options: &TranscriptOptions) -> Result<String, Error> {
  Ok(Program::decode(data)?.render(options))
}

/// Parses a transcript and encodes it back to `.LF` bytes.
pub fn transcript_to_binary(text: &str) -> Result<Vec<u8>, Error> {
  Ok(Transcript::parse(text)?.encode())
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ParseErrorKind;
  use crate::sysmem::FieldValue;

  fn sample_program() -> Vec<u8> {
    let records = [
      // Line Speed 100 1, with a stray byte at 9 that no layout claims
      "0000C842000000000055000000000101",
      // Line End 3 4 5, comment flag set
      "00004040000080400000A0400000008C",
      // unknown command 8
      "0102030405060708090A0B0C0D0E0F08",
      // Line Dispense Setup
      "0000C03F000000400500FA00B0040015",
      // Padding
      "000000000000000000000000000000FF",
    ];
    let mut data = Vec::new();
    for record in records.iter() {
      data.extend(hex::decode(record).unwrap());
    }

    let mut sysmem = [0u8; SYSMEM_SIZE];
    sysmem[5] = 0x5A;
    sysmem[52..56].copy_from_slice(b"TEST");
    sysmem[83] = 0x03;
    sysmem[207..211].copy_from_slice(&41i32.to_le_bytes());
    data.extend_from_slice(&sysmem);
    data
  }

  fn transcript() -> String {
    binary_to_transcript(&sample_program(), &TranscriptOptions::default()).unwrap()
  }

  fn replace_line(text: &str, index: usize, replacement: &str) -> String {
    let mut lines: Vec<&str> = text.lines().collect();
    lines[index] = replacement;
    lines.join("\n")
  }

  #[test]
  fn untouched_transcript_round_trips() {
    let data = sample_program();
    assert_eq!(transcript_to_binary(&transcript()).unwrap(), data);

    let options = TranscriptOptions { raw_column: 30, hex_bytes_per_line: 16 };
    let text = binary_to_transcript(&data, &options).unwrap();
    assert_eq!(transcript_to_binary(&text).unwrap(), data);
  }

  #[test]
  fn empty_body_round_trips() {
    let data = vec![0x11u8; SYSMEM_SIZE];
    let program = Program::decode(&data).unwrap();
    assert!(program.records().is_empty());
    assert_eq!(program.encode(), data);
    assert_eq!(transcript_to_binary(&program.render(&TranscriptOptions::default())).unwrap(), data);
  }

  #[test]
  fn renders_sections_in_order() {
    let text = transcript();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "# 5 records");
    assert!(lines[1].starts_with("01 Line Speed 100 1 "));
    assert!(lines[2].starts_with("8C Line End 3 4 5 "));
    assert!(lines[3].starts_with("08 UNKNOWN_8 "));
    assert!(lines[4].starts_with("15 Line Dispense Setup 1.5 0.25 2 1.2 0.005 "));
    assert!(lines[5].starts_with("FF Padding "));
    assert_eq!(lines[6], RAW_HEADER);
    assert_eq!(lines[27], FIELDS_HEADER);
    assert!(lines[28].starts_with("ProgramSize: 40 "));
  }

  #[test]
  fn unknown_commands_warn_and_survive() {
    let program = Program::decode(&sample_program()).unwrap();
    assert_eq!(
      program.warnings(),
      &[Warning::UnknownCommand { index: 2, offset: 32, command_id: 8 }]
    );
    assert_eq!(program.records()[2].raw[0], 0x01);
  }

  #[test]
  fn surviving_annotation_wins_over_edited_parameters() {
    let text = transcript().replace("01 Line Speed 100 1 ", "01 Line Speed 250 7 ");
    assert_eq!(transcript_to_binary(&text).unwrap(), sample_program());
  }

  #[test]
  fn removed_annotation_repacks_the_record() {
    let edited = replace_line(&transcript(), 1, "01 Line Speed 250 7");

    let transcript = Transcript::parse(&edited).unwrap();
    assert_eq!(transcript.edited_count(), 1);

    let bytes = transcript.encode();
    let mut expected = sample_program();
    expected[..16].copy_from_slice(&[0x00, 0x00, 0x7A, 0x43, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x07, 0x01]);
    assert_eq!(bytes, expected);
  }

  #[test]
  fn removing_an_annotation_without_edits_drops_unclaimed_bytes() {
    let text = transcript();
    let line = text.lines().nth(1).unwrap();
    let stripped = replace_line(&text, 1, line.split('#').next().unwrap());

    let bytes = transcript_to_binary(&stripped).unwrap();
    assert_eq!(bytes[9], 0x00);
    assert_eq!(bytes[16..], sample_program()[16..]);
  }

  #[test]
  fn field_edits_without_hex_change_nothing() {
    let text = transcript()
      .replace("ProgramSize: 40", "ProgramSize: 99")
      .replace("ProgramLabel: TEST", "ProgramLabel: OTHER");
    let transcript = Transcript::parse(&text).unwrap();

    assert_eq!(transcript.encode(), sample_program());
    assert_eq!(transcript.metadata().value("ProgramSize"), Some(&FieldValue::Int(40)));
    let ignored = transcript
      .field_notes()
      .iter()
      .filter(|(_, note)| matches!(note, FieldNote::ValueIgnored { .. }))
      .count();
    assert_eq!(ignored, 2);
  }

  #[test]
  fn dump_edits_change_sysmem() {
    let text = transcript();
    // bytes 200..220 of SysMem; ProgramSize starts at 207
    let edited_line = text.lines().nth(17).unwrap().replacen("29", "2A", 1);
    let edited = replace_line(&text, 17, &edited_line);

    let bytes = transcript_to_binary(&edited).unwrap();
    let sysmem = &bytes[bytes.len() - SYSMEM_SIZE..];
    assert_eq!(&sysmem[207..211], &42i32.to_le_bytes());
  }

  #[test]
  fn fields_section_is_optional() {
    let text = transcript();
    let cut = text.find(FIELDS_HEADER).unwrap();
    assert_eq!(transcript_to_binary(&text[..cut]).unwrap(), sample_program());
  }

  #[test]
  fn fields_section_cannot_reopen_earlier_sections() {
    let mut text = transcript();
    text.push_str(&format!("{}\n", RAW_HEADER));
    text.push_str("01 Line Speed 5 5\n");
    text.push_str("00 00 00\n");
    assert_eq!(transcript_to_binary(&text).unwrap(), sample_program());
  }

  #[test]
  fn wrong_binary_size_is_a_format_error() {
    assert!(matches!(Program::decode(&[0u8; 399]), Err(Error::Format { len: 399 })));
    assert!(matches!(Program::decode(&[0u8; 401]), Err(Error::Format { len: 401 })));
  }

  #[test]
  fn missing_raw_hex_section() {
    let text = "01 Line Speed 100 1\n";
    assert!(matches!(
      transcript_to_binary(text),
      Err(Error::Transcript(TranscriptError::MissingRawHex))
    ));
  }

  #[test]
  fn fields_before_raw_hex_is_misordered() {
    let text = format!("01 Line Speed 100 1\n{}\n", FIELDS_HEADER);
    assert!(matches!(
      transcript_to_binary(&text),
      Err(Error::Transcript(TranscriptError::Misordered { line: 2, .. }))
    ));
  }

  #[test]
  fn stray_header_in_raw_hex_is_misordered() {
    let text = replace_line(&transcript(), 12, "===== Something Else =====");
    assert!(matches!(
      transcript_to_binary(&text),
      Err(Error::Transcript(TranscriptError::Misordered { line: 13, .. }))
    ));
  }

  #[test]
  fn short_dump_is_rejected() {
    let text = transcript();
    let last = text.lines().nth(26).unwrap();
    let shortened = replace_line(&text, 26, "00 00");
    assert!(matches!(
      transcript_to_binary(&shortened),
      Err(Error::Transcript(TranscriptError::SysMemSize { line: 28, found: 382 }))
    ));

    let longer = replace_line(&text, 26, &format!("{} 00", last));
    assert!(matches!(
      transcript_to_binary(&longer),
      Err(Error::Transcript(TranscriptError::SysMemSize { found: 401, .. }))
    ));
  }

  #[test]
  fn bad_record_line_names_its_line() {
    let broken = replace_line(&transcript(), 4, "15 Line Dispense Setup 1.5 x 2 1.2 0.005");
    match transcript_to_binary(&broken) {
      Err(Error::Parse { line: 5, kind: ParseErrorKind::BadParameter { position: 2, .. } }) => {}
      other => panic!("unexpected {:?}", other),
    }
  }
}
