/*!
  The human readable textual form of a record is a transcript line. This module renders records
  as lines and parses (possibly edited) lines back into `Draft`s.

  A record line is given by the following grammar:
    ```text
    <record_line>  ::= <command_byte> (<space> <name> <parameter>*)? <space>* <comment>?
    <command_byte> ::= <hex> <hex>
    <comment>      ::= '#' <text>
    <annotation>   ::= '#' <space>* 'raw:' <hex>{32}
    ```
  Whether a line carries an annotation decides how it is encoded. See `parse_record_line`.
*/

use nom::{
  bytes::complete::{is_not, take_while_m_n},
  character::complete::{char as one_char, space0, space1},
  combinator::{all_consuming, map_res, opt, rest},
  sequence::{preceded, terminated, tuple},
  IResult,
};
use tracing::{debug, warn};

use super::binary::{Draft, Record, Stored};
use super::command::{layout_of, name_of, Command, Param, ParamType, Transform};
use super::{Raw, COMMAND_BYTE, RECORD_SIZE};
use crate::error::{Error, ParseErrorKind};

/// Marks the start of a raw hex annotation.
pub const RAW_TAG: &str = "# raw:";

// region Rendering

/**
  Formats a float the way parameters are shown: as an integer when it is within 1e-6 of one,
  otherwise with six significant digits, switching to exponent form outside 1e-4..1e6.
*/
pub fn format_float(value: f64) -> String {
  if !value.is_finite() {
    return value.to_string();
  }
  if (value - value.round()).abs() < 1e-6 {
    let rounded = value.round();
    return match rounded == 0.0 {
      true  => "0".to_string(),
      false => format!("{:.0}", rounded)
    };
  }

  let scientific = format!("{:.5e}", value);
  let (mantissa, exponent) = match scientific.split_once('e') {
    Some((m, e)) => (m, e.parse::<i32>().unwrap_or_default()),
    None         => (scientific.as_str(), 0)
  };

  if exponent < -4 || exponent >= 6 {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
  } else {
    trim_fraction(&format!("{:.*}", (5 - exponent) as usize, value)).to_string()
  }
}

fn trim_fraction(text: &str) -> &str {
  match text.contains('.') {
    true  => text.trim_end_matches('0').trim_end_matches('.'),
    false => text
  }
}

/// Pads `left` so that the raw annotation starts at the 1-based `raw_column`, always leaving at
/// least one space.
pub fn annotate(left: &str, raw: &[u8], raw_column: usize) -> String {
  let padding = raw_column.saturating_sub(left.chars().count() + 1).max(1);
  format!("{}{}{} {}", left, " ".repeat(padding), RAW_TAG, hex::encode_upper(raw))
}

/// `XX CommandName [params...]    # raw: <32 hex>`
pub fn render_record(record: &Record, raw_column: usize) -> String {
  let mut left = format!("{:02X} {}", record.command_byte(), record.name());
  for value in &record.parameters {
    left.push(' ');
    left.push_str(&value.to_string());
  }
  annotate(&left, &record.raw, raw_column)
}

// endregion

// region Parsing

fn pcommand_byte(i: &str) -> IResult<&str, u8> {
  map_res(
    take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
    |out: &str| u8::from_str_radix(out, 16)
  )(i)
}

/// Splits a line into (command byte, name and parameters, comment).
fn precord_line(i: &str) -> IResult<&str, (u8, Option<&str>, Option<&str>)> {
  all_consuming(
    tuple((
      preceded(space0, pcommand_byte),
      terminated(opt(preceded(space1, is_not("#"))), space0),
      opt(preceded(one_char('#'), rest))
    ))
  )(i)
}

/// Returns `None` for an ordinary comment, otherwise the decoded annotation. `comment` is the text
/// after the first `#`; the annotation is the last `#` part that starts with `raw:`.
fn raw_annotation(comment: &str) -> Option<Result<Raw, ParseErrorKind>> {
  let text = comment.rsplit('#').find_map(|part| part.trim_start().strip_prefix("raw:"))?;
  let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();

  let decoded = match digits.len() == RECORD_SIZE * 2 {
    true  => hex::decode(&digits).ok().and_then(|bytes| Raw::try_from(bytes).ok()),
    false => None
  };
  Some(decoded.ok_or_else(|| ParseErrorKind::BadRawHex(text.trim().to_string())))
}

/// Separates the parameter tokens from the command name, or `None` when the line does not start
/// with `name`.
fn split_name<'a>(body: &'a str, name: &str) -> Option<Vec<&'a str>> {
  let tokens: Vec<&str> = body.split_whitespace().collect();
  let name_tokens: Vec<&str> = name.split_whitespace().collect();

  match tokens.starts_with(&name_tokens) {
    true  => Some(tokens[name_tokens.len()..].to_vec()),
    false => None
  }
}

fn integral(token: &str) -> Option<i64> {
  token.parse::<i64>().ok().or_else(|| {
    let value = token.parse::<f64>().ok()?;
    match value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 {
      true  => Some(value as i64),
      false => None
    }
  })
}

/// Converts a displayed parameter back into the primitive stored in its slot.
fn pack_param(param: &Param, token: &str) -> Option<Stored> {
  if param.ty == ParamType::F32 {
    let value = token.parse::<f64>().ok()?;
    let narrowed = value as f32;
    return match value.is_finite() && !narrowed.is_finite() {
      true  => None,
      false => Some(Stored::F32(narrowed))
    };
  }

  let stored = match param.transform {
    Transform::Identity  => integral(token)?,
    Transform::PlusOne   => integral(token)?.checked_sub(1)?,
    Transform::Scaled(d) => {
      let scaled = token.parse::<f64>().ok()? * d as f64;
      if !scaled.is_finite() || scaled.abs() > i32::MAX as f64 {
        return None;
      }
      scaled.round_ties_even() as i64
    }
  };

  match param.ty {
    ParamType::I16 => i16::try_from(stored).ok().map(Stored::I16),
    ParamType::U8  => u8::try_from(stored).ok().map(Stored::U8),
    ParamType::F32 => None
  }
}

fn describe(param: &Param) -> String {
  match (param.ty, param.transform) {
    (ParamType::F32, _)                    => "number".to_string(),
    (ParamType::I16, Transform::Identity)  => "16-bit integer".to_string(),
    (ParamType::U8, Transform::Identity)   => "byte value (0 to 255)".to_string(),
    (ParamType::U8, Transform::PlusOne)    => "integer from 1 to 256".to_string(),
    (ParamType::I16, Transform::Scaled(d)) => format!("number in steps of 1/{} within 16-bit range", d),
    (ty, _)                                => format!("{} value", ty)
  }
}

/**
  Parses one record line.

  If the line carries a well-formed `# raw:` annotation the result is `Draft::Verbatim` holding
  those bytes, and the command name and parameters are informational only. Otherwise the line
  is edited: the name must belong to the command byte, and the parameters must match the
  command's layout in number and type. A present but malformed annotation is an error rather
  than a silent repack.
*/
pub fn parse_record_line(line: &str, line_number: usize) -> Result<Draft, Error> {
  let error = move |kind: ParseErrorKind| Error::Parse { line: line_number, kind };

  let (_, (command_byte, body, comment)) = precord_line(line).map_err(|_| {
    let token = line.split_whitespace().next().unwrap_or_default();
    error(ParseErrorKind::BadCommandByte(token.to_string()))
  })?;
  let body = body.unwrap_or_default().trim();
  let expected = name_of(command_byte);
  let parameters = split_name(body, &expected);

  if let Some(annotation) = comment.and_then(raw_annotation) {
    let raw = annotation.map_err(error)?;
    if parameters.is_none() {
      warn!(line = line_number, expected = %expected, found = body,
        "command name does not match the command byte; raw bytes kept");
    }
    if raw[COMMAND_BYTE] != command_byte {
      warn!(line = line_number, "command byte {:02X} differs from raw byte {:02X}; raw bytes kept",
        command_byte, raw[COMMAND_BYTE]);
    }
    return Ok(Draft::Verbatim(raw));
  }

  let tokens = parameters.ok_or_else(|| {
    error(ParseErrorKind::NameMismatch {
      command_byte,
      expected : expected.clone(),
      found    : body.to_string(),
    })
  })?;

  let layout = layout_of(command_byte);
  if tokens.len() != layout.len() {
    return Err(error(ParseErrorKind::ParameterCount {
      command  : expected,
      expected : layout.len(),
      found    : tokens.len(),
    }));
  }

  let values = layout
    .iter()
    .zip(tokens)
    .enumerate()
    .map(|(index, (param, token))| {
      match pack_param(param, token) {
        Some(stored) => Ok((param.offset, stored)),
        None => Err(error(ParseErrorKind::BadParameter {
          position : index + 1,
          token    : token.to_string(),
          expected : describe(param),
        }))
      }
    })
    .collect::<Result<Vec<_>, _>>()?;

  if Command::from_byte(command_byte).is_none() {
    warn!(line = line_number, "{} is not in the Command Reference; packed without parameters", expected);
  } else {
    debug!(line = line_number, "repacking edited `{}` record", expected);
  }

  Ok(Draft::Derived { command_byte, values })
}

// endregion
