/*!
  Converts Fisnar `.LF` dispensing programs to an editable text transcript and back.

  A program is a sequence of 16 byte command records (`bytecode`) followed by a 400 byte
  machine parameter block (`sysmem`). `transcript` puts the two together. An untouched
  transcript always encodes back to the exact bytes it was made from.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod error;
pub mod reference;
pub mod sysmem;
pub mod transcript;

pub use error::Error;
pub use transcript::{binary_to_transcript, transcript_to_binary, Program, Transcript, TranscriptOptions};
