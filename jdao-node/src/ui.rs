use comfy_table::{presets, CellAlignment, ContentArrangement, Table};
use console::Style;

/// Data table for lists (proposals, holders).
/// UTF8_FULL preset with header separator, dynamic width.
pub fn data_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers);
    table
}

/// Right-aligned cell (for amounts / numbers).
pub fn cell_right(content: impl ToString) -> comfy_table::Cell {
    comfy_table::Cell::new(content).set_alignment(CellAlignment::Right)
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Print table with 2-space left indent to match the rest of the CLI.
pub fn print_table(table: &Table) {
    for line in table.lines() {
        println!("  {}", line);
    }
}

/// Dim label followed by a cyan value.
pub fn print_field(label: &str, value: impl std::fmt::Display) {
    let dim = Style::new().dim();
    let cyan = Style::new().cyan();
    println!("  {} {}", dim.apply_to(format!("{:<9}", label)), cyan.apply_to(value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_table_has_rows() {
        let mut table = data_table(&["a", "b"]);
        table.add_row(vec![comfy_table::Cell::new("x"), cell_right(42)]);
        let rendered = table.to_string();
        assert!(rendered.contains("42"));
        assert!(rendered.contains('x'));
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(true), "yes");
        assert_eq!(yes_no(false), "no");
    }
}
