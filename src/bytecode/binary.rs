/*!
  This module is responsible for the encoding and decoding of binary records.

  Decoding never fails: a record whose command ID is not in the Command Reference is kept as an
  opaque 16 bytes with no parameters. Encoding is total as well. Anything that could go wrong
  when turning text into bytes is caught while building the `Draft`, so `Draft::encode` only
  ever copies bytes around.
*/

use std::fmt::{Display, Formatter};

use super::command::{layout_of, name_of, Command, Param, ParamType, Transform};
use super::{Raw, COMMAND_BYTE, COMMAND_MASK, COMMENT_FLAG, RECORD_SIZE};
use super::assembly::format_float;

/// A parameter as it is shown in a transcript, after its transform has been applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
  Float(f64),
  Int(i64),
}

impl Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Value::Float(v) => write!(f, "{}", format_float(*v)),
      Value::Int(v)   => write!(f, "{}", v),
    }
  }
}

/// A primitive exactly as it sits in the record bytes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Stored {
  F32(f32),
  I16(i16),
  U8(u8),
}

impl Stored {
  pub fn read(raw: &Raw, offset: usize, ty: ParamType) -> Stored {
    match ty {
      ParamType::F32 => {
        Stored::F32(f32::from_le_bytes([raw[offset], raw[offset + 1], raw[offset + 2], raw[offset + 3]]))
      }
      ParamType::I16 => Stored::I16(i16::from_le_bytes([raw[offset], raw[offset + 1]])),
      ParamType::U8  => Stored::U8(raw[offset]),
    }
  }

  pub fn write(&self, raw: &mut Raw, offset: usize) {
    match self {
      Stored::F32(v) => raw[offset..offset + 4].copy_from_slice(&v.to_le_bytes()),
      Stored::I16(v) => raw[offset..offset + 2].copy_from_slice(&v.to_le_bytes()),
      Stored::U8(v)  => raw[offset] = *v,
    }
  }

  fn as_integer(&self) -> Option<i64> {
    match self {
      Stored::F32(_) => None,
      Stored::I16(v) => Some(*v as i64),
      Stored::U8(v)  => Some(*v as i64),
    }
  }
}

/// Reads one parameter slot and applies its display transform.
pub fn read_param(raw: &Raw, param: &Param) -> Value {
  let stored = Stored::read(raw, param.offset, param.ty);
  match (stored, param.transform) {
    (Stored::F32(v), _)              => Value::Float(v as f64),
    (s, Transform::Identity)         => Value::Int(s.as_integer().unwrap_or_default()),
    (s, Transform::PlusOne)          => Value::Int(s.as_integer().unwrap_or_default() + 1),
    (s, Transform::Scaled(divisor))  => {
      Value::Float(s.as_integer().unwrap_or_default() as f64 / divisor as f64)
    }
  }
}

/// One decoded record of the program body.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
  pub command_id   : u8,
  pub comment_flag : bool,
  pub parameters   : Vec<Value>,
  pub raw          : Raw,
}

impl Record {
  pub fn decode(raw: Raw) -> Record {
    let command_byte = raw[COMMAND_BYTE];
    let parameters = layout_of(command_byte)
      .iter()
      .map(|param| read_param(&raw, param))
      .collect();

    Record {
      command_id   : command_byte & COMMAND_MASK,
      comment_flag : command_byte & COMMENT_FLAG != 0,
      parameters,
      raw,
    }
  }

  pub fn command_byte(&self) -> u8 {
    self.raw[COMMAND_BYTE]
  }

  pub fn command(&self) -> Option<Command> {
    Command::from_byte(self.command_byte())
  }

  pub fn is_known(&self) -> bool {
    self.command().is_some()
  }

  pub fn name(&self) -> String {
    name_of(self.command_byte())
  }
}

/**
  A record parsed back from a transcript line, not yet turned into bytes.

  `Verbatim` holds the bytes of a surviving `# raw:` annotation. `Derived` holds values that were
  converted and range-checked against the command layout when the line was parsed, each paired
  with its offset in the record.
*/
#[derive(Clone, Debug, PartialEq)]
pub enum Draft {
  Verbatim(Raw),
  Derived {
    command_byte : u8,
    values       : Vec<(usize, Stored)>,
  },
}

impl Draft {
  pub fn is_edited(&self) -> bool {
    matches!(self, Draft::Derived { .. })
  }

  pub fn encode(&self) -> Raw {
    match self {
      Draft::Verbatim(raw) => *raw,

      Draft::Derived { command_byte, values } => {
        let mut raw = [0u8; RECORD_SIZE];
        for (offset, value) in values {
          value.write(&mut raw, *offset);
        }
        raw[COMMAND_BYTE] = *command_byte;
        raw
      }
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  fn record_from_hex(text: &str) -> Record {
    let mut raw = [0u8; RECORD_SIZE];
    raw.copy_from_slice(&hex::decode(text).unwrap());
    Record::decode(raw)
  }

  #[test]
  fn decode_line_speed() {
    // float32 100.0 at 0, mode 2 at byte 14
    let record = record_from_hex("0000C842000000000000000000000201");
    assert_eq!(record.command(), Some(Command::LineSpeed));
    assert!(!record.comment_flag);
    assert_eq!(record.parameters, vec![Value::Float(100.0), Value::Int(2)]);
    assert_eq!(record.name(), "Line Speed");
  }

  #[test]
  fn decode_comment_flag() {
    let record = record_from_hex("0000803F0000004000004040000000CC");
    assert_eq!(record.command_id, 0x4C);
    assert!(record.comment_flag);
    assert_eq!(record.command(), Some(Command::FixedPoint));
    assert_eq!(record.command_byte(), 0xCC);
  }

  #[test]
  fn decode_transforms() {
    // Brush Area: byte 14 is shown plus one, i16 @12 as is.
    let record = record_from_hex("0000803F00000040000000000700041C");
    assert_eq!(
      record.parameters,
      vec![Value::Float(1.0), Value::Float(2.0), Value::Int(5), Value::Int(7)]
    );

    // Circle: i16 @12 shown divided by 100.
    let record = record_from_hex("000000000000000000000000F5000025");
    assert_eq!(record.parameters[3], Value::Float(2.45));
  }

  #[test]
  fn unknown_command_is_opaque() {
    let record = record_from_hex("0102030405060708090A0B0C0D0E0F08");
    assert!(!record.is_known());
    assert!(record.parameters.is_empty());
    assert_eq!(record.name(), "UNKNOWN_8");
    assert_eq!(Draft::Verbatim(record.raw).encode(), record.raw);
  }

  #[test]
  fn derived_zero_fills_unclaimed_bytes() {
    let draft = Draft::Derived {
      command_byte : 0x01,
      values       : vec![(0, Stored::F32(100.0)), (14, Stored::U8(1))],
    };
    assert!(draft.is_edited());
    assert_eq!(
      draft.encode(),
      [0x00, 0x00, 0xC8, 0x42, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0x01]
    );
  }

  #[test]
  fn stored_round_trips_through_bytes() {
    let mut raw = [0u8; RECORD_SIZE];
    Stored::I16(-2).write(&mut raw, 8);
    assert_eq!(&raw[8..10], &[0xFE, 0xFF]);
    assert_eq!(Stored::read(&raw, 8, ParamType::I16), Stored::I16(-2));
  }
}
