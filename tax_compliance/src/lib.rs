/*!
Monthly tax payment compliance.

This crate computes, for each taxpayer of a spreadsheet table, how many months
of a tax year were paid, and classifies the taxpayer into one of three
compliance tiers. The crate does not read or write files: see the `kepatuhan`
program for the spreadsheet input and the dashboard output.

See the [manual] for the expected input layout.
*/

mod config;
mod dates;
pub mod manual;
mod normalize;
mod summary;

use log::{debug, info, warn};

pub use crate::config::*;
pub use crate::dates::{from_excel_serial, parse_date_cell, parse_month_label};
pub use crate::normalize::{header_label, normalize_columns, normalize_label};
pub use crate::summary::*;

// The positions of the required columns in a normalized table.
struct RequiredColumns {
    tmt: usize,
    name: usize,
    status: usize,
}

fn locate_required(table: &Table) -> Result<RequiredColumns, ComplianceError> {
    let tmt = table.column_index(TMT);
    let name = table.column_index(NAMA_OP);
    let status = table.column_index(STATUS);
    match (tmt, name, status) {
        (Some(tmt), Some(name), Some(status)) => Ok(RequiredColumns { tmt, name, status }),
        _ => {
            let columns: Vec<String> = [(TMT, tmt), (NAMA_OP, name), (STATUS, status)]
                .iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(c, _)| c.to_string())
                .collect();
            MissingRequiredColumnSnafu { columns }.fail()
        }
    }
}

/// A column holds payments when all its values are numbers, or all are
/// booleans. Empty cells are ignored.
fn is_numeric_column(table: &Table, col: usize) -> bool {
    let mut has_numbers = false;
    let mut has_bools = false;
    for row in 0..table.num_rows() {
        match table.cell(row, col) {
            Cell::Empty => {}
            Cell::Number(_) => has_numbers = true,
            Cell::Bool(_) => has_bools = true,
            Cell::Text(_) | Cell::Date(_) => return false,
        }
    }
    !(has_numbers && has_bools)
}

/// Finds the payment columns: the numeric columns whose label mentions the year.
pub fn payment_columns(table: &Table, year: TaxYear) -> Vec<usize> {
    let tag = year.to_string();
    table
        .columns
        .iter()
        .enumerate()
        .filter(|(idx, label)| label.contains(&tag) && is_numeric_column(table, *idx))
        .map(|(idx, _)| idx)
        .collect()
}

/// Computes the compliance indicators of every taxpayer of the table.
///
/// The column labels are normalized first. The table must then contain the
/// `TMT`, `NAMA OP` and `STATUS` columns, otherwise
/// [ComplianceError::MissingRequiredColumn] is returned.
///
/// When no payment column is found for the year, the result is
/// [Computation::NoPaymentColumns]: the dates are still parsed but no
/// indicator is computed.
///
/// ```
/// use tax_compliance::*;
///
/// let header = ["TMT", "NAMA OP", "STATUS", "JAN 2024", "FEB 2024"].map(Cell::text);
/// let row = vec![
///     Cell::text("2024-01-15"),
///     Cell::text("ACME"),
///     Cell::text("Active"),
///     Cell::Number(100.0),
///     Cell::Number(0.0),
/// ];
/// let table = Table::from_header_cells(&header, vec![row]);
///
/// let computation = compute_compliance(&table, TaxYear::new(2024)?)?;
/// let metrics = computation.table().records[0].metrics.clone().unwrap();
/// assert_eq!(metrics.months_paid, 1);
/// assert_eq!(metrics.tier, ComplianceTier::KurangPatuh);
///
/// # Ok::<(), ComplianceError>(())
/// ```
pub fn compute_compliance(table: &Table, year: TaxYear) -> Result<Computation, ComplianceError> {
    let table = normalize_columns(table.clone());
    debug!("compute_compliance: columns: {:?}", table.columns);

    let required = locate_required(&table)?;

    let payment_idxs = payment_columns(&table, year);
    let payment_labels: Vec<String> = payment_idxs
        .iter()
        .map(|idx| table.columns[*idx].clone())
        .collect();
    info!(
        "compute_compliance: {} rows, year {}, payment columns: {:?}",
        table.num_rows(),
        year,
        payment_labels
    );

    let mut unparsable_dates: usize = 0;
    let mut records: Vec<TaxpayerRecord> = Vec::with_capacity(table.num_rows());
    for row_index in 0..table.num_rows() {
        let mut source = table.padded_row(row_index);

        let tmt_cell = &source[required.tmt];
        let registration_date = parse_date_cell(tmt_cell);
        if registration_date.is_none() && !tmt_cell.is_empty() {
            debug!(
                "compute_compliance: row {}: unreadable TMT {:?}",
                row_index, tmt_cell
            );
            unparsable_dates += 1;
        }
        source[required.tmt] = registration_date.map(Cell::Date).unwrap_or(Cell::Empty);

        let payments: Vec<Option<f64>> = payment_idxs
            .iter()
            .map(|idx| source[*idx].as_number())
            .collect();
        let metrics = if payment_idxs.is_empty() {
            None
        } else {
            Some(ComplianceMetrics::from_payments(&payments))
        };

        records.push(TaxpayerRecord {
            row_index,
            registration_date,
            name: source[required.name].to_string(),
            status: source[required.status].to_string(),
            source,
            payments,
            metrics,
        });
    }

    let res = ComplianceTable {
        tax_year: year,
        columns: table.columns,
        records,
        payment_columns: payment_labels,
        unparsable_dates,
    };

    if res.has_payment_columns() {
        Ok(Computation::Complete(res))
    } else {
        warn!(
            "compute_compliance: no numeric payment column found for year {}",
            year
        );
        Ok(Computation::NoPaymentColumns(res))
    }
}
