/*!
  Decoding, rendering and rebuilding of the 400 byte SysMem block.

  Rendering produces two sections: a raw hex dump of every byte, and one line per named field.
  Only the dump is read back. Field lines are checked against the dump so that an edit which
  cannot take effect gets reported, but they never contribute bytes.
*/

use std::fmt::{Display, Formatter};
use std::ops::Range;

use super::field::{lookup, unmapped_ranges, FieldRef, FieldSpec, FieldTransform, Primitive, FIELDS};
use super::{SysMem, FIELDS_HEADER, RAW_HEADER};
use crate::bytecode::{annotate, RAW_TAG};
use crate::error::TranscriptError;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
  Float(f32),
  Int(i64),
  Bool(bool),
  Label(&'static str),
  Text(String),
}

impl Display for FieldValue {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      FieldValue::Float(v) => write!(f, "{:?}", v),
      FieldValue::Int(v)   => write!(f, "{}", v),
      FieldValue::Bool(v)  => write!(f, "{}", v),
      FieldValue::Label(v) => write!(f, "{}", v),
      FieldValue::Text(v)  => write!(f, "{}", v),
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NamedField {
  pub name  : &'static str,
  pub field : FieldRef,
  pub value : FieldValue,
}

impl NamedField {
  pub fn span(&self) -> Range<usize> {
    self.field.spec().span()
  }
}

/// Bytes no Field Table entry claims, kept as found.
#[derive(Clone, Debug, PartialEq)]
pub struct UnmappedRange {
  pub offset : usize,
  pub bytes  : Vec<u8>,
}

/// What a decoded-field line says relative to the raw dump.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldNote {
  Consistent,
  /// The shown value was edited but the hex was not. The edit has no effect.
  ValueIgnored { name: &'static str, shown: String, decoded: String },
  /// The hex differs from the dump. The dump wins.
  RawIgnored { name: &'static str },
  Unrecognized,
}

enum Reading {
  Int(i64),
  Float(f32),
  Text(String),
}

fn decode_text(bytes: &[u8]) -> String {
  let mut text = String::new();
  for &b in bytes.iter().take_while(|&&b| b != 0).filter(|b| b.is_ascii()) {
    let c = b as char;
    match c.is_ascii_control() {
      true  => text.extend(c.escape_default()),
      false => text.push(c)
    }
  }
  text
}

fn read(raw: &SysMem, spec: &FieldSpec) -> Reading {
  let b = &raw[spec.span()];
  match spec.primitive {
    Primitive::I8       => Reading::Int(b[0] as i8 as i64),
    Primitive::I16      => Reading::Int(i16::from_le_bytes([b[0], b[1]]) as i64),
    Primitive::I32      => Reading::Int(i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64),
    Primitive::F32      => Reading::Float(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
    Primitive::Ascii(_) => Reading::Text(decode_text(b)),
  }
}

fn decode_field(index: usize, spec: &'static FieldSpec, raw: &SysMem) -> Vec<NamedField> {
  let single = |value: FieldValue| {
    vec![NamedField { name: spec.name, field: FieldRef { index, bit: None }, value }]
  };

  match (spec.transform, read(raw, spec)) {
    (_, Reading::Float(v))                      => single(FieldValue::Float(v)),
    (_, Reading::Text(v))                       => single(FieldValue::Text(v)),
    (FieldTransform::Plain, Reading::Int(v))         => single(FieldValue::Int(v)),
    (FieldTransform::StoredPlusOne, Reading::Int(v)) => single(FieldValue::Int(v - 1)),
    (FieldTransform::Truthy, Reading::Int(v))        => single(FieldValue::Bool(v != 0)),
    (FieldTransform::Inverted, Reading::Int(v))      => single(FieldValue::Bool(v == 0)),
    (FieldTransform::Choice { zero, nonzero }, Reading::Int(v)) => {
      single(FieldValue::Label(if v == 0 { zero } else { nonzero }))
    }
    (FieldTransform::Bits(flags), Reading::Int(v)) => {
      flags
        .iter()
        .enumerate()
        .map(|(bit, &name)| NamedField {
          name,
          field : FieldRef { index, bit: Some(bit as u32) },
          value : FieldValue::Bool(v & (1 << bit) != 0),
        })
        .collect()
    }
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetadataBlock {
  raw      : SysMem,
  fields   : Vec<NamedField>,
  unmapped : Vec<UnmappedRange>,
}

impl MetadataBlock {
  pub fn decode(raw: SysMem) -> MetadataBlock {
    let fields = FIELDS
      .iter()
      .enumerate()
      .flat_map(|(index, spec)| decode_field(index, spec, &raw))
      .collect();
    let unmapped = unmapped_ranges()
      .into_iter()
      .map(|range| UnmappedRange { offset: range.start, bytes: raw[range].to_vec() })
      .collect();

    MetadataBlock { raw, fields, unmapped }
  }

  pub fn raw(&self) -> &SysMem {
    &self.raw
  }

  /// The block's bytes. Always the bytes it was decoded from.
  pub fn encode(&self) -> SysMem {
    self.raw
  }

  pub fn fields(&self) -> &[NamedField] {
    &self.fields
  }

  pub fn value(&self, name: &str) -> Option<&FieldValue> {
    let field = lookup(name)?;
    self.fields.iter().find(|f| f.field == field).map(|f| &f.value)
  }

  pub fn unmapped(&self) -> &[UnmappedRange] {
    &self.unmapped
  }

  /// The raw hex section, header included.
  pub fn render_raw_dump(&self, bytes_per_line: usize) -> Vec<String> {
    let mut lines = vec![RAW_HEADER.to_string()];
    for chunk in self.raw.chunks(bytes_per_line.max(1)) {
      lines.push(chunk.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" "));
    }
    lines
  }

  /// The decoded-fields section, header included.
  pub fn render_fields(&self, raw_column: usize) -> Vec<String> {
    let mut lines = vec![FIELDS_HEADER.to_string()];
    for field in &self.fields {
      let left = format!("{}: {}", field.name, field.value);
      lines.push(annotate(&left, &self.raw[field.span()], raw_column));
    }
    lines
  }

  /// Compares one decoded-field line with what the dump decodes to.
  pub fn check_field_line(&self, line: &str) -> FieldNote {
    let (left, hex) = match line.rsplit_once(RAW_TAG) {
      Some((left, hex)) => (left, Some(hex)),
      None              => (line, None)
    };
    let (name, shown) = match left.split_once(':') {
      Some((name, shown)) => (name.trim(), shown.trim()),
      None                => return FieldNote::Unrecognized
    };
    let current = match lookup(name).and_then(|r| self.fields.iter().find(|f| f.field == r)) {
      Some(current) => current,
      None          => return FieldNote::Unrecognized
    };

    if let Some(hex) = hex {
      let digits: String = hex.split_whitespace().collect();
      match hex::decode(&digits) {
        Ok(bytes) if bytes[..] == self.raw[current.span()] => {}
        _ => return FieldNote::RawIgnored { name: current.name }
      }
    }

    let decoded = current.value.to_string();
    match shown == decoded.trim() {
      true  => FieldNote::Consistent,
      false => FieldNote::ValueIgnored { name: current.name, shown: shown.to_string(), decoded }
    }
  }
}

/// Accumulates the bytes of a raw hex section.
#[derive(Default)]
pub struct RawDump {
  bytes: Vec<u8>,
}

impl RawDump {
  pub fn new() -> RawDump {
    RawDump::default()
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  pub fn push_line(&mut self, line: &str, line_number: usize) -> Result<(), TranscriptError> {
    for token in line.split_whitespace() {
      let byte = match token.len() <= 2 && token.chars().all(|c| c.is_ascii_hexdigit()) {
        true  => u8::from_str_radix(token, 16).ok(),
        false => None
      };
      match byte {
        Some(byte) => self.bytes.push(byte),
        None => {
          return Err(TranscriptError::BadHexByte { line: line_number, token: token.to_string() });
        }
      }
    }
    Ok(())
  }

  /// Ends the section. `line_number` is where it ended, for the error message.
  pub fn finish(self, line_number: usize) -> Result<MetadataBlock, TranscriptError> {
    let found = self.bytes.len();
    let raw = SysMem::try_from(self.bytes)
      .map_err(|_| TranscriptError::SysMemSize { line: line_number, found })?;
    Ok(MetadataBlock::decode(raw))
  }
}
