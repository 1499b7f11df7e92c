/*!
  The SysMem Field Reference: where each named machine parameter lives in the 400 byte block,
  what primitive it is stored as, and how the stored value becomes the displayed one.

  The table describes decoding only. Several transforms have no well-defined inverse (text
  truncated to its field width, flags sharing an integer with neighbours whose other bits are
  unknown to us), so SysMem bytes are never rebuilt from displayed values.
*/

use std::fmt::{Display, Formatter};
use std::ops::Range;

use bimap::BiMap;

use super::SYSMEM_SIZE;

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Primitive {
  I8,
  I16,
  I32,
  F32,
  /// Zero-terminated ASCII of the given width.
  Ascii(usize),
}

impl Primitive {
  pub const fn width(self) -> usize {
    match self {
      Primitive::I8        => 1,
      Primitive::I16       => 2,
      Primitive::I32       => 4,
      Primitive::F32       => 4,
      Primitive::Ascii(n)  => n,
    }
  }
}

impl Display for Primitive {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Primitive::I8       => write!(f, "i8"),
      Primitive::I16      => write!(f, "i16"),
      Primitive::I32      => write!(f, "i32"),
      Primitive::F32      => write!(f, "f32"),
      Primitive::Ascii(n) => write!(f, "ascii[{}]", n),
    }
  }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum FieldTransform {
  Plain,
  /// Stored as the logical value plus one.
  StoredPlusOne,
  /// True when non-zero.
  Truthy,
  /// True when zero.
  Inverted,
  /// One label for zero, another for anything else.
  Choice { zero: &'static str, nonzero: &'static str },
  /// One named flag per bit, least significant bit first.
  Bits(&'static [&'static str]),
}

impl Display for FieldTransform {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      FieldTransform::Plain                   => write!(f, "-"),
      FieldTransform::StoredPlusOne           => write!(f, "stored + 1"),
      FieldTransform::Truthy                  => write!(f, "non-zero"),
      FieldTransform::Inverted                => write!(f, "zero"),
      FieldTransform::Choice { zero, nonzero} => write!(f, "{} / {}", zero, nonzero),
      FieldTransform::Bits(names)             => write!(f, "bits {}", names.join(" ")),
    }
  }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct FieldSpec {
  pub name      : &'static str,
  pub offset    : usize,
  pub primitive : Primitive,
  pub transform : FieldTransform,
}

impl FieldSpec {
  pub fn span(&self) -> Range<usize> {
    self.offset..self.offset + self.primitive.width()
  }
}

const fn field(name: &'static str, offset: usize, primitive: Primitive, transform: FieldTransform)
  -> FieldSpec
{
  FieldSpec { name, offset, primitive, transform }
}

const fn float(name: &'static str, offset: usize) -> FieldSpec {
  field(name, offset, Primitive::F32, FieldTransform::Plain)
}

pub const OUTPUT_FLAGS: &[&str] = &["O1", "O2", "O3", "O4", "O5", "O6", "O7", "O8"];

/// Field Table entries in display order.
pub const FIELDS: &[FieldSpec] = &[
  field("ProgramSize",      207, Primitive::I32, FieldTransform::StoredPlusOne),
  float("XYMoveSpeed",           12),
  float("ZMoveSpeed",            44),
  float("DebugSpeed",           105),
  float("TipHomeX",              85),
  float("TipHomeY",              89),
  float("TipHomeZ",              93),
  float("TipAdjustX",           109),
  float("TipAdjustY",           113),
  float("TipAdjustZ",           117),
  float("SoftOrgX",             267),
  float("SoftOrgY",             271),
  float("SoftOrgZ",             275),
  float("AutoPurgeWaitTime",    178),
  float("AutoPurgeDispenseTime",182),
  float("ZLimit",                79),
  float("PreDispenseWait",      263),
  field("RunCounter",        70, Primitive::I16, FieldTransform::Plain),
  field("QuickStep",        177, Primitive::I8,  FieldTransform::Truthy),
  field("RunningHomeFirst", 397, Primitive::I8,  FieldTransform::Inverted),
  field("EmergencyMode",    190, Primitive::I8,
    FieldTransform::Choice { zero: "Initial", nonzero: "Maintaining" }),
  field("ProgramLabel",      52, Primitive::Ascii(15), FieldTransform::Plain),
  field("OutputFlags",       83, Primitive::I16, FieldTransform::Bits(OUTPUT_FLAGS)),
  field("MagicSignature_398", 398, Primitive::I16, FieldTransform::Plain),
];

/// Identifies a displayed field: a Field Table entry and, for bit flags, the bit.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct FieldRef {
  pub index : usize,
  pub bit   : Option<u32>,
}

impl FieldRef {
  pub fn spec(&self) -> &'static FieldSpec {
    &FIELDS[self.index]
  }
}

fn build_field_names() -> BiMap<&'static str, FieldRef> {
  let mut names = BiMap::new();

  for (index, spec) in FIELDS.iter().enumerate() {
    match spec.transform {
      FieldTransform::Bits(flags) => {
        for (bit, flag) in flags.iter().enumerate() {
          // Duplicate names are a table bug, caught by `field_names_are_unique`.
          let _ = names.insert_no_overwrite(*flag, FieldRef { index, bit: Some(bit as u32) });
        }
      }
      _ => {
        let _ = names.insert_no_overwrite(spec.name, FieldRef { index, bit: None });
      }
    }
  }
  names
}

lazy_static! {
  /// Displayed field name <-> field. Flag groups contribute one name per flag, not their own.
  pub static ref FIELD_NAMES: BiMap<&'static str, FieldRef> = build_field_names();
}

pub fn lookup(name: &str) -> Option<FieldRef> {
  FIELD_NAMES.get_by_left(name).copied()
}

/// The byte ranges of the block claimed by no Field Table entry, in ascending order.
pub fn unmapped_ranges() -> Vec<Range<usize>> {
  let mut spans: Vec<Range<usize>> = FIELDS.iter().map(FieldSpec::span).collect();
  spans.sort_by_key(|span| span.start);

  let mut gaps = Vec::new();
  let mut cursor = 0;
  for span in spans {
    if span.start > cursor {
      gaps.push(cursor..span.start);
    }
    cursor = cursor.max(span.end);
  }
  if cursor < SYSMEM_SIZE {
    gaps.push(cursor..SYSMEM_SIZE);
  }
  gaps
}
