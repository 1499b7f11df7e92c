/*!

  The body of an `.LF` program is a sequence of 16 byte records, one command per record.
  Byte 15 is the command byte:

    bits 0-6: command ID
    bit  7:   comment flag

  Bytes 0-14 hold the command's parameters at fixed offsets given by its layout in
  `command::Command::layout`. Parameters are little-endian `f32`, little-endian `i16`, or a
  single unsigned byte. Some integer parameters are shown scaled (hundredths, thousandths) or
  offset by one; the layout records that as the slot's `Transform`.

  The human readable form of a record is a transcript line:
    ```text
    01 Line Speed 100 1                                        # raw: 0000C842000000000000000000000101
    ```
  The `# raw:` annotation carries the record's original bytes. While it survives, the line
  encodes to exactly those bytes no matter what the rest of the line says. Remove it, and the
  record is packed from the command byte and the displayed parameters instead.

*/

mod assembly;
mod binary;
mod command;

pub use assembly::{annotate, format_float, parse_record_line, render_record, RAW_TAG};
pub use binary::{read_param, Draft, Record, Stored, Value};
pub use command::{layout_of, name_of, Command, Param, ParamType, Transform};

pub const RECORD_SIZE: usize = 16;
/// Index of the command byte within a record.
pub const COMMAND_BYTE: usize = 15;
pub const COMMAND_MASK: u8 = 0x7F;
pub const COMMENT_FLAG: u8 = 0x80;

pub type Raw = [u8; RECORD_SIZE];
