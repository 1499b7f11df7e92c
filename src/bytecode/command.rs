/*!
  Command identifiers and the parameter layout of each command.

  A command's parameters live at fixed byte offsets within bytes 0-14 of its record. The
  order in which parameters are *displayed* is not necessarily the order of their offsets
  (see `LOOP` or `LINE_DISPENSE`), so a layout is an ordered list of slots rather than a
  byte map. Bytes not claimed by any slot are zero when a record is packed from text.
*/

use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, IntoStaticStr};

use super::COMMAND_MASK;

/**
  Command IDs of the Command Reference.

  The discriminants are the 7-bit IDs found in byte 15 of a record. IDs 0 and 19 are distinct
  commands which both display as "Empty".
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,       PartialEq,        Debug,         Hash
)]
#[repr(u8)]
pub enum Command {
  #[strum(serialize = "Empty")]                 Empty              = 0,
  #[strum(serialize = "Line Speed")]            LineSpeed          = 1,
  #[strum(serialize = "Line Passing")]          LinePassing        = 2,
  #[strum(serialize = "Arc Point")]             ArcPoint           = 3,
  #[strum(serialize = "Line Start")]            LineStart          = 4,
  #[strum(serialize = "Dispense Dot")]          DispenseDot        = 5,
  #[strum(serialize = "Output")]                Output             = 6,
  #[strum(serialize = "Input")]                 Input              = 7,
  #[strum(serialize = "Wait Point")]            WaitPoint          = 9,
  #[strum(serialize = "End Program")]           EndProgram         = 11,
  #[strum(serialize = "Line End")]              LineEnd            = 12,
  #[strum(serialize = "Step & Repeat X")]       StepRepeatX        = 13,
  #[strum(serialize = "Stop Point")]            StopPoint          = 18,
  #[strum(serialize = "Empty")]                 Blank              = 19,
  #[strum(serialize = "Point Dispense Setup")]  PointDispenseSetup = 20,
  #[strum(serialize = "Line Dispense Setup")]   LineDispenseSetup  = 21,
  #[strum(serialize = "Z Clearance")]           ZClearance         = 22,
  #[strum(serialize = "Dispense End Setup")]    DispenseEndSetup   = 23,
  #[strum(serialize = "Goto Address")]          GotoAddress        = 27,
  #[strum(serialize = "Brush Area")]            BrushArea          = 28,
  #[strum(serialize = "Call Subroutine")]       CallSubroutine     = 29,
  #[strum(serialize = "Call Program")]          CallProgram        = 30,
  #[strum(serialize = "Dummy Point CP")]        DummyPointCp       = 31,
  #[strum(serialize = "Step & Repeat Y")]       StepRepeatY        = 32,
  #[strum(serialize = "Dispense ON/OFF")]       DispenseOnOff      = 33,
  #[strum(serialize = "Home Point")]            HomePoint          = 35,
  #[strum(serialize = "Loop Address")]          LoopAddress        = 36,
  #[strum(serialize = "Circle")]                Circle             = 37,
  #[strum(serialize = "Retract Setup")]         RetractSetup       = 38,
  #[strum(serialize = "Initialize")]            Initialize         = 39,
  #[strum(serialize = "Label")]                 Label              = 40,
  #[strum(serialize = "Acceleration")]          Acceleration       = 43,
  #[strum(serialize = "Blend Point")]           BlendPoint         = 51,
  #[strum(serialize = "Circle Dispense Setup")] CircleDispenseSetup = 53,
  #[strum(serialize = "Dispense Outport")]      DispenseOutport    = 54,
  #[strum(serialize = "Dummy Point PTP")]       DummyPointPtp      = 55,
  #[strum(serialize = "Cubical Layer")]         CubicalLayer       = 57,
  #[strum(serialize = "Height Sensor Point")]   HeightSensorPoint  = 66,
  #[strum(serialize = "Pause Point")]           PausePoint         = 67,
  #[strum(serialize = "Output Toggle")]         OutputToggle       = 68,
  #[strum(serialize = "Wait Input")]            WaitInput          = 69,
  #[strum(serialize = "Check Block")]           CheckBlock         = 70,
  #[strum(serialize = "Acc Time")]              AccTime            = 71,
  #[strum(serialize = "Dummy Start")]           DummyStart         = 72,
  #[strum(serialize = "Dummy Passing")]         DummyPassing       = 73,
  #[strum(serialize = "Dummy Arc")]             DummyArc           = 74,
  #[strum(serialize = "Dummy End")]             DummyEnd           = 75,
  #[strum(serialize = "Fixed Point")]           FixedPoint         = 76,
  #[strum(serialize = "Padding")]               Padding            = 127,
}

/// The primitive stored in a parameter slot. All multi-byte values are little-endian.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum ParamType {
  F32,
  I16,
  U8,
}

impl ParamType {
  pub const fn width(self) -> usize {
    match self {
      ParamType::F32 => 4,
      ParamType::I16 => 2,
      ParamType::U8  => 1,
    }
  }
}

impl Display for ParamType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ParamType::F32 => write!(f, "f32"),
      ParamType::I16 => write!(f, "i16"),
      ParamType::U8  => write!(f, "u8"),
    }
  }
}

/// How a stored integer relates to the value shown in a transcript.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Transform {
  Identity,
  /// Stored value is the displayed value times the divisor, rounded.
  Scaled(i32),
  /// Stored value is the displayed value minus one.
  PlusOne,
}

/// One parameter slot of a command layout.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub struct Param {
  pub offset    : usize,
  pub ty        : ParamType,
  pub transform : Transform,
}

impl Param {
  /// The byte range this slot occupies within a record.
  pub fn span(&self) -> std::ops::Range<usize> {
    self.offset..self.offset + self.ty.width()
  }
}

impl Display for Param {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.transform {
      Transform::Identity   => write!(f, "{}@{}", self.ty, self.offset),
      Transform::Scaled(d)  => write!(f, "{}@{}/{}", self.ty, self.offset, d),
      Transform::PlusOne    => write!(f, "{}@{}+1", self.ty, self.offset),
    }
  }
}

const fn f32_at(offset: usize) -> Param {
  Param { offset, ty: ParamType::F32, transform: Transform::Identity }
}

const fn i16_at(offset: usize) -> Param {
  Param { offset, ty: ParamType::I16, transform: Transform::Identity }
}

const fn u8_at(offset: usize) -> Param {
  Param { offset, ty: ParamType::U8, transform: Transform::Identity }
}

const fn scaled_i16_at(offset: usize, divisor: i32) -> Param {
  Param { offset, ty: ParamType::I16, transform: Transform::Scaled(divisor) }
}

const fn plus_one_u8_at(offset: usize) -> Param {
  Param { offset, ty: ParamType::U8, transform: Transform::PlusOne }
}

// region Layouts

const NONE          : &[Param] = &[];
const ADDRESS       : &[Param] = &[i16_at(12)];
const SPEED_MODE    : &[Param] = &[f32_at(0), u8_at(14)];
const SECONDS       : &[Param] = &[f32_at(0)];
const SWITCH        : &[Param] = &[u8_at(14)];
const PAIR          : &[Param] = &[f32_at(0), f32_at(4)];
const POINT         : &[Param] = &[f32_at(0), f32_at(4), f32_at(8)];
const LOOP          : &[Param] = &[i16_at(12), f32_at(0)];
const BRUSH         : &[Param] = &[f32_at(0), f32_at(4), plus_one_u8_at(14), i16_at(12)];
const PORT_PAIR     : &[Param] = &[i16_at(8), i16_at(10)];
const PORT_TRIPLE   : &[Param] = &[i16_at(8), i16_at(10), i16_at(12)];
const POINT_CENTI   : &[Param] = &[f32_at(0), f32_at(4), f32_at(8), scaled_i16_at(12, 100)];
const POINT_INDEX   : &[Param] = &[f32_at(0), f32_at(4), f32_at(8), i16_at(12)];
const LINE_DISPENSE : &[Param] = &[
  f32_at(0),
  scaled_i16_at(10, 1000),
  f32_at(4),
  scaled_i16_at(12, 1000),
  scaled_i16_at(8, 1000),
];
const STEP_REPEAT   : &[Param] = &[
  scaled_i16_at(0, 100),
  scaled_i16_at(2, 100),
  i16_at(10),
  i16_at(12),
  u8_at(14),
  i16_at(8),
];

// endregion

impl Command {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn name(&self) -> &'static str {
    self.into()
  }

  /// Looks up a command by the ID bits of a command byte. The comment flag is ignored.
  pub fn from_byte(command_byte: u8) -> Option<Command> {
    Command::try_from(command_byte & COMMAND_MASK).ok()
  }

  /// The parameters of this command in display order.
  pub fn layout(&self) -> &'static [Param] {
    use Command::*;

    match self {
      DispenseOutport | GotoAddress | CallProgram | Label => ADDRESS,
      LineSpeed | ZClearance                             => SPEED_MODE,
      WaitPoint | AccTime                                => SECONDS,
      DispenseOnOff | FixedPoint                         => SWITCH,
      Output | CircleDispenseSetup                       => PAIR,
      OutputToggle | DispenseEndSetup                    => POINT,
      LinePassing | ArcPoint | LineStart | DispenseDot | LineEnd | StopPoint
        | DummyPointCp | DummyPointPtp | PausePoint
        | DummyStart | DummyPassing | DummyArc | DummyEnd   => POINT,
      LoopAddress                                        => LOOP,
      BrushArea                                          => BRUSH,
      CheckBlock | WaitInput                             => PORT_PAIR,
      Input | Acceleration                               => PORT_TRIPLE,
      HeightSensorPoint | Circle                         => POINT_CENTI,
      CallSubroutine | RetractSetup                      => POINT_INDEX,
      LineDispenseSetup                                  => LINE_DISPENSE,
      StepRepeatX | StepRepeatY                          => STEP_REPEAT,
      Empty | EndProgram | Blank | PointDispenseSetup | HomePoint | Initialize
        | BlendPoint | CubicalLayer | Padding             => NONE,
    }
  }
}

/// The layout for a raw command byte. Unknown IDs have no parameters.
pub fn layout_of(command_byte: u8) -> &'static [Param] {
  Command::from_byte(command_byte).map_or(NONE, |command| command.layout())
}

/// The display name for a raw command byte, `UNKNOWN_<id>` outside the Command Reference.
pub fn name_of(command_byte: u8) -> String {
  match Command::from_byte(command_byte) {
    Some(command) => command.name().to_string(),
    None          => format!("UNKNOWN_{}", command_byte & COMMAND_MASK),
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::RECORD_SIZE;
  use strum::IntoEnumIterator;

  #[test]
  fn slots_stay_clear_of_command_byte_and_each_other() {
    for command in Command::iter() {
      let mut claimed = [false; RECORD_SIZE];
      for param in command.layout() {
        for i in param.span() {
          assert!(i < RECORD_SIZE - 1, "{} writes into byte {}", command, i);
          assert!(!claimed[i], "{} has overlapping slots at byte {}", command, i);
          claimed[i] = true;
        }
      }
    }
  }

  #[test]
  fn comment_flag_does_not_change_lookup() {
    assert_eq!(Command::from_byte(0x01), Some(Command::LineSpeed));
    assert_eq!(Command::from_byte(0x81), Some(Command::LineSpeed));
    assert_eq!(Command::from_byte(0xFF), Some(Command::Padding));
  }

  #[test]
  fn unknown_ids_are_opaque() {
    assert_eq!(Command::from_byte(8), None);
    assert!(layout_of(8).is_empty());
    assert_eq!(name_of(0x88), "UNKNOWN_8");
  }

  #[test]
  fn names_and_codes() {
    assert_eq!(Command::LineSpeed.name(), "Line Speed");
    assert_eq!(Command::Blank.name(), "Empty");
    assert_eq!(Command::Blank.code(), 19);
    assert_eq!(name_of(0x0C), "Line End");
    assert_eq!(Command::iter().count(), 49);
  }

  #[test]
  fn display_order_differs_from_offset_order() {
    let offsets: Vec<usize> = Command::LoopAddress.layout().iter().map(|p| p.offset).collect();
    assert_eq!(offsets, vec![12, 0]);
    assert_eq!(Command::BrushArea.layout()[2].to_string(), "u8@14+1");
    assert_eq!(Command::LineDispenseSetup.layout()[1].to_string(), "i16@10/1000");
  }
}
