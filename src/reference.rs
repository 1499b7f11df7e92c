/*!
  Printable versions of the two static tables: the Command Reference and the SysMem Field
  Reference. Shown by `lfcodec --reference`.
*/

use prettytable::{format as TableFormat, Table};
use strum::IntoEnumIterator;

use crate::bytecode::Command;
use crate::sysmem::FIELDS;

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// One row per known command: ID, name, and its parameters in display order.
pub fn command_table() -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(row![ubr->"ID", ubl->"Command", ubl->"Parameters"]);

  for command in Command::iter() {
    let layout = command.layout();
    let params = match layout.is_empty() {
      true  => "-".to_string(),
      false => layout.iter().map(|p| p.to_string()).collect::<Vec<_>>().join("  "),
    };
    table.add_row(row![r->format!("{:02X}", command.code()), command.name(), params]);
  }
  table
}

pub fn field_table() -> Table {
  let mut table = Table::new();

  table.set_format(*TABLE_DISPLAY_FORMAT);
  table.set_titles(
    row![ubl->"Field", ubr->"Offset", ubr->"Width", ubl->"Type", ubl->"Transform"]
  );

  for spec in FIELDS {
    table.add_row(row![
      spec.name,
      r->spec.offset,
      r->spec.primitive.width(),
      spec.primitive,
      spec.transform
    ]);
  }
  table
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn command_table_lists_every_command() {
    let table = command_table();
    assert_eq!(table.len(), Command::iter().count());

    let text = table.to_string();
    assert!(text.contains("Line Dispense Setup"));
    assert!(text.contains("f32@0  i16@10/1000  f32@4  i16@12/1000  i16@8/1000"));
    assert!(text.contains("u8@14+1"));
  }

  #[test]
  fn field_table_lists_every_field() {
    let table = field_table();
    assert_eq!(table.len(), FIELDS.len());

    let text = table.to_string();
    assert!(text.contains("ProgramSize"));
    assert!(text.contains("stored + 1"));
    assert!(text.contains("bits O1 O2 O3 O4 O5 O6 O7 O8"));
    assert!(text.contains("ascii[15]"));
  }
}
