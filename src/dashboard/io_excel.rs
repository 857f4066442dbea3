// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::dashboard::*;

/// The names of all the worksheets, in workbook order.
pub fn sheet_names(path: &str) -> DashboardResult<Vec<String>> {
    let workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let names = workbook.sheet_names().to_vec();
    debug!("sheet_names: path: {:?} sheets: {:?}", path, names);
    Ok(names)
}

/// Picks the worksheet to process.
///
/// A requested name must exist in the workbook. Without a request, the
/// workbook must contain exactly one worksheet.
pub fn select_sheet(
    path: &str,
    sheet_names: &[String],
    requested: Option<&str>,
) -> DashboardResult<String> {
    match (requested, sheet_names) {
        (Some(name), _) if sheet_names.iter().any(|s| s == name) => Ok(name.to_string()),
        (Some(name), _) => MissingSheetSnafu {
            sheet: name,
            available: sheet_names.to_vec(),
        }
        .fail(),
        (None, []) => EmptyWorkbookSnafu { path }.fail(),
        (None, [single]) => Ok(single.clone()),
        (None, _) => AmbiguousSheetSnafu {
            available: sheet_names.to_vec(),
        }
        .fail(),
    }
}

/// Reads a worksheet as a table. The first row is the header.
///
/// Rows in which every cell is empty are skipped.
pub fn read_table(path: &str, sheet: &str) -> DashboardResult<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = workbook
        .worksheet_range(sheet)
        .context(MissingSheetSnafu {
            sheet,
            available: workbook.sheet_names().to_vec(),
        })?
        .context(OpeningExcelSnafu { path })?;

    let mut iter = wrange.rows();
    let header: Vec<Cell> = iter
        .next()
        .context(EmptySheetSnafu { sheet })?
        .iter()
        .map(read_cell)
        .collect();
    debug!("read_table: header: {:?}", header);

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let cells: Vec<Cell> = row.iter().map(read_cell).collect();
        if cells.iter().all(|c| c.is_empty()) {
            debug!("read_table: skipping empty row {}", idx + 2);
            continue;
        }
        rows.push(cells);
    }
    Ok(Table::from_header_cells(&header, rows))
}

/// Cells in error (`#N/A`, `#REF!`) and empty strings are read as empty cells.
pub fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::Empty => Cell::Empty,
        DataType::String(s) if s.is_empty() => Cell::Empty,
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Bool(b) => Cell::Bool(*b),
        DataType::DateTime(serial) => match from_excel_serial(*serial) {
            Some(d) => Cell::Date(d),
            None => Cell::Number(*serial),
        },
        other => {
            debug!("read_cell: reading {:?} as an empty cell", other);
            Cell::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::test_support::unique_test_dir;
    use rust_xlsxwriter::Workbook;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sheet_selection() {
        let two = names(&["Setoran", "Rekap"]);
        assert_eq!(select_sheet("f.xlsx", &two, Some("Rekap")).unwrap(), "Rekap");
        assert!(matches!(
            select_sheet("f.xlsx", &two, None),
            Err(DashboardError::AmbiguousSheet { .. })
        ));
        assert!(matches!(
            select_sheet("f.xlsx", &two, Some("Other")),
            Err(DashboardError::MissingSheet { .. })
        ));
        assert_eq!(
            select_sheet("f.xlsx", &names(&["Only"]), None).unwrap(),
            "Only"
        );
        assert!(matches!(
            select_sheet("f.xlsx", &[], None),
            Err(DashboardError::EmptyWorkbook { .. })
        ));
    }

    #[test]
    fn cells() {
        assert_eq!(read_cell(&DataType::Int(3)), Cell::Number(3.0));
        assert_eq!(read_cell(&DataType::String("".to_string())), Cell::Empty);
        assert_eq!(read_cell(&DataType::String("a".to_string())), Cell::text("a"));
        assert_eq!(
            read_cell(&DataType::DateTime(45306.0)),
            Cell::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
    }

    #[test]
    fn reads_selected_sheet() {
        let dir = unique_test_dir("read-table");
        let path = dir.join("input.xlsx").display().to_string();

        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Rekap").unwrap();
        first.write_string(0, 0, "unused").unwrap();
        let second = workbook.add_worksheet();
        second.set_name("Setoran").unwrap();
        for (col, label) in ["TMT", "Nama OP", "Status", "Jan 2024"].iter().enumerate() {
            second.write_string(0, col as u16, *label).unwrap();
        }
        second.write_string(1, 0, "2024-01-15").unwrap();
        second.write_string(1, 1, "ACME").unwrap();
        second.write_string(1, 2, "Aktif").unwrap();
        second.write_number(1, 3, 250000.0).unwrap();
        // Row 3 is left empty.
        second.write_string(3, 1, "BETA").unwrap();
        workbook.save(&path).unwrap();

        assert_eq!(sheet_names(&path).unwrap(), names(&["Rekap", "Setoran"]));
        let table = read_table(&path, "Setoran").unwrap();
        assert_eq!(table.columns, names(&["TMT", "Nama OP", "Status", "Jan 2024"]));
        assert_eq!(table.num_rows(), 2);
        assert_eq!(*table.cell(0, 3), Cell::Number(250000.0));
        assert_eq!(*table.cell(1, 1), Cell::text("BETA"));
        assert_eq!(*table.cell(1, 3), Cell::Empty);

        assert!(matches!(
            read_table(&path, "Nope"),
            Err(DashboardError::MissingSheet { .. })
        ));
    }
}
