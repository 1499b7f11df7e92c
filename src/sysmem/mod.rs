/*!
  The SysMem block is the fixed 400 byte trailer of every `.LF` program. It holds machine
  parameters (speeds, tip offsets, the program label, output flags) at fixed offsets listed in
  `field::FIELDS`. Bytes not listed there are carried along untouched.

  Unlike records, SysMem has no edit path through its decoded values: see `block`.
*/

mod block;
mod field;

pub use block::{FieldNote, FieldValue, MetadataBlock, NamedField, RawDump, UnmappedRange};
pub use field::{
  lookup, unmapped_ranges, FieldRef, FieldSpec, FieldTransform, Primitive, FIELDS, FIELD_NAMES,
  OUTPUT_FLAGS,
};

pub const SYSMEM_SIZE: usize = 400;

pub const RAW_HEADER: &str = "===== SysMem (400 bytes) as raw hex =====";
pub const FIELDS_HEADER: &str = "===== SysMem (decoded fields) =====";

pub type SysMem = [u8; SYSMEM_SIZE];
