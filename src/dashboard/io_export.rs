// Writing of the result workbook and of the sample input workbook.

use chrono::Datelike;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet, XlsxError};

use crate::dashboard::*;

/// The only worksheet of the exported workbook.
pub const RESULT_SHEET: &str = "Result";
pub const DEFAULT_EXPORT_FILE: &str = "hasil_dashboard_kepatuhan.xlsx";
pub const TEMPLATE_FILE: &str = "CONTOH_FORMAT_SETORAN MASA.xlsx";
const TEMPLATE_SHEET: &str = "SETORAN MASA";

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MEI", "JUN", "JUL", "AGU", "SEP", "OKT", "NOV", "DES",
];

fn excel_date(d: chrono::NaiveDate) -> Option<ExcelDateTime> {
    let year = u16::try_from(d.year()).ok()?;
    ExcelDateTime::from_ymd(year, d.month() as u8, d.day() as u8).ok()
}

/// Writes a header row and the rows below it, starting at the first cell.
fn write_table_sheet(
    worksheet: &mut Worksheet,
    columns: &[String],
    rows: &[Vec<Cell>],
) -> Result<(), XlsxError> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (col, label) in columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, label, &header_format)?;
    }
    for (idx, row) in rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let c = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Number(x) => {
                    worksheet.write_number(r, c, *x)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(r, c, s)?;
                }
                // Dates outside of the spreadsheet range are kept as text.
                Cell::Date(d) => match excel_date(*d) {
                    Some(dt) => {
                        worksheet.write_datetime_with_format(r, c, &dt, &date_format)?;
                    }
                    None => {
                        worksheet.write_string(r, c, cell.to_string())?;
                    }
                },
            }
        }
    }
    Ok(())
}

/// The augmented table in a workbook with a single worksheet.
pub fn result_workbook(table: &ComplianceTable) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(RESULT_SHEET)?;
    write_table_sheet(worksheet, &table.augmented_columns(), &table.augmented_rows())?;
    Ok(workbook)
}

pub fn write_result(table: &ComplianceTable, path: &str) -> DashboardResult<()> {
    let mut workbook = result_workbook(table).context(WritingExcelSnafu { path })?;
    workbook.save(path).context(WritingExcelSnafu { path })?;
    info!(
        "Result of {} rows written to {}",
        table.records.len(),
        path
    );
    Ok(())
}

/// An example of the expected input: a few taxpayers and one column per month.
pub fn template_table(year: TaxYear) -> Table {
    let mut columns: Vec<String> = vec![TMT.to_string(), NAMA_OP.to_string(), STATUS.to_string()];
    columns.extend(MONTHS.iter().map(|m| format!("{} {}", m, year)));

    let samples: [(&str, &str, &str, [f64; 12]); 3] = [
        (
            "2019-03-01",
            "CV MAJU JAYA",
            "AKTIF",
            [150000.0; 12],
        ),
        (
            "2021-07-15",
            "TOKO SUMBER REJEKI",
            "AKTIF",
            [
                0.0, 75000.0, 0.0, 80000.0, 0.0, 0.0, 90000.0, 0.0, 0.0, 85000.0, 0.0, 95000.0,
            ],
        ),
        (
            "2023-11-20",
            "RM SEDERHANA",
            "NON AKTIF",
            [
                50000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
            ],
        ),
    ];
    let rows = samples
        .iter()
        .map(|(tmt, name, status, payments)| {
            let mut row = vec![
                parse_date_cell(&Cell::text(*tmt))
                    .map(Cell::Date)
                    .unwrap_or(Cell::Empty),
                Cell::text(*name),
                Cell::text(*status),
            ];
            row.extend(payments.iter().map(|p| Cell::Number(*p)));
            row
        })
        .collect();
    Table::new(columns, rows)
}

pub fn write_template(path: &str, year: TaxYear) -> DashboardResult<()> {
    let table = template_table(year);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(TEMPLATE_SHEET)
        .context(WritingExcelSnafu { path })?;
    write_table_sheet(worksheet, &table.columns, &table.rows).context(WritingExcelSnafu { path })?;
    workbook.save(path).context(WritingExcelSnafu { path })?;
    info!("Template written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::io_excel;
    use crate::dashboard::test_support::unique_test_dir;

    fn column(table: &Table, label: &str) -> Vec<Cell> {
        let idx = table.column_index(label).unwrap();
        (0..table.num_rows()).map(|r| table.cell(r, idx).clone()).collect()
    }

    #[test]
    fn result_round_trip() {
        let dir = unique_test_dir("round-trip");
        let path = dir.join(DEFAULT_EXPORT_FILE).display().to_string();

        let year = TaxYear::new(2024).unwrap();
        let computed = compute_compliance(&template_table(year), year)
            .unwrap()
            .into_table();
        write_result(&computed, &path).unwrap();

        assert_eq!(io_excel::sheet_names(&path).unwrap(), vec![RESULT_SHEET]);
        let read_back = io_excel::read_table(&path, RESULT_SHEET).unwrap();
        let expected = computed.to_table();

        assert_eq!(read_back.columns, expected.columns);
        assert_eq!(read_back.num_rows(), computed.records.len());
        for label in ["TOTAL PEMBAYARAN", "KEPATUHAN (%)", "KLASIFIKASI KEPATUHAN"] {
            assert_eq!(column(&read_back, label), column(&expected, label), "{}", label);
        }
        // Dates may come back as serial numbers, depending on the reader.
        let tmt_back: Vec<_> = column(&read_back, TMT).iter().map(parse_date_cell).collect();
        let tmt: Vec<_> = computed.records.iter().map(|r| r.registration_date).collect();
        assert_eq!(tmt_back, tmt);

        // The read back table gives the same result.
        let again = compute_compliance(&read_back, year).unwrap().into_table();
        assert_eq!(again.payment_columns, computed.payment_columns);
        assert_eq!(
            again.records.iter().map(|r| r.metrics.clone()).collect::<Vec<_>>(),
            computed.records.iter().map(|r| r.metrics.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn export_with_registration_before_1900() {
        let dir = unique_test_dir("old-tmt");
        let path = dir.join(DEFAULT_EXPORT_FILE).display().to_string();
        let header = ["TMT", "NAMA OP", "STATUS", "JAN 2024"].map(Cell::text);
        let rows = vec![
            vec![Cell::text("1850-03-01"), Cell::text("A"), Cell::text("AKTIF"), Cell::Number(10.0)],
            vec![Cell::text("2020-03-01"), Cell::text("B"), Cell::text("AKTIF"), Cell::Number(20.0)],
        ];
        let year = TaxYear::default();
        let computation = compute_compliance(&Table::from_header_cells(&header, rows), year).unwrap();
        assert_eq!(
            computation.warnings(),
            vec![ComplianceWarning::UnparsableDates { count: 1 }]
        );
        write_result(computation.table(), &path).unwrap();
        let read_back = io_excel::read_table(&path, RESULT_SHEET).unwrap();
        assert_eq!(read_back.num_rows(), 2);
        assert_eq!(*read_back.cell(0, 0), Cell::Empty);
    }

    #[test]
    fn dates_out_of_range_are_written_as_text() {
        let dir = unique_test_dir("old-date-cell");
        let path = dir.join("dates.xlsx").display().to_string();
        let date = chrono::NaiveDate::from_ymd_opt(1850, 3, 1).unwrap();
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        write_table_sheet(worksheet, &["D".to_string()], &[vec![Cell::Date(date)]]).unwrap();
        workbook.save(&path).unwrap();
        let names = io_excel::sheet_names(&path).unwrap();
        let table = io_excel::read_table(&path, &names[0]).unwrap();
        assert_eq!(*table.cell(0, 0), Cell::text("1850-03-01"));
    }

    #[test]
    fn template_covers_all_tiers() {
        let year = TaxYear::new(2025).unwrap();
        let table = template_table(year);
        assert_eq!(table.columns[3], "JAN 2025");
        assert_eq!(table.columns[14], "DES 2025");

        let computed = compute_compliance(&table, year).unwrap().into_table();
        assert_eq!(computed.payment_columns.len(), 12);
        let tiers: Vec<ComplianceTier> = computed
            .records
            .iter()
            .filter_map(|r| r.metrics.as_ref().map(|m| m.tier))
            .collect();
        assert_eq!(
            tiers,
            vec![
                ComplianceTier::Patuh,
                ComplianceTier::CukupPatuh,
                ComplianceTier::KurangPatuh
            ]
        );
    }

    #[test]
    fn template_is_readable() {
        let dir = unique_test_dir("template");
        let path = dir.join(TEMPLATE_FILE).display().to_string();
        write_template(&path, TaxYear::default()).unwrap();
        assert_eq!(io_excel::sheet_names(&path).unwrap(), vec![TEMPLATE_SHEET]);
        let table = io_excel::read_table(&path, TEMPLATE_SHEET).unwrap();
        assert_eq!(table.num_rows(), 3);
        let computation = compute_compliance(&table, TaxYear::default()).unwrap();
        assert!(!computation.is_partial());
    }
}
