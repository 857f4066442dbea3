use crate::config::{Cell, Table};

/// Normalizes one column label: surrounding whitespace removed, upper case,
/// newlines turned into spaces.
pub fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_uppercase()
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

/// Normalizes all the column labels of a table.
///
/// The rows are not touched and the order of the columns is preserved.
/// Applying it more than once has no further effect.
pub fn normalize_columns(table: Table) -> Table {
    let columns = table.columns.iter().map(|c| normalize_label(c)).collect();
    Table {
        columns,
        rows: table.rows,
    }
}

/// Turns the raw content of a header cell into a label.
///
/// Empty header cells get a positional name so that every column stays
/// addressable.
pub fn header_label(idx: usize, cell: &Cell) -> String {
    match cell {
        Cell::Empty => format!("Unnamed: {}", idx),
        Cell::Text(s) => s.clone(),
        Cell::Number(x) => format!("{}", x),
        Cell::Bool(true) => "True".to_string(),
        Cell::Bool(false) => "False".to_string(),
        Cell::Date(d) => format!("{} 00:00:00", d.format("%Y-%m-%d")),
    }
}
