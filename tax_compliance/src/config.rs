// ********* Input data structures ***********

use chrono::{Datelike, NaiveDate};
use snafu::Snafu;
use std::fmt::Display;

/// The registration date column.
pub const TMT: &str = "TMT";
/// The taxpayer name column.
pub const NAMA_OP: &str = "NAMA OP";
/// The taxpayer status column.
pub const STATUS: &str = "STATUS";

/// The columns that must be present after normalization.
pub const REQUIRED_COLUMNS: [&str; 3] = [TMT, NAMA_OP, STATUS];

/// Number of months a taxpayer is assumed to be active during the tax year.
///
/// This is not derived from the registration date: every taxpayer is expected
/// to pay every month.
pub const ACTIVE_MONTHS: u32 = 12;

/// The tax years that can be selected.
pub const SUPPORTED_TAX_YEARS: [u16; 3] = [2023, 2024, 2025];

/// The content of a single cell of a table.
///
/// Readers convert their own representation into cells. Errors in the source
/// spreadsheet (`#N/A`, `#DIV/0!`) are expected to be read as `Empty`.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Number(f64),
    Bool(bool),
    Text(String),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Cell {
        Cell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// The numeric value of the cell, if it holds a number or a boolean.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(x) => Some(*x),
            Cell::Bool(true) => Some(1.0),
            Cell::Bool(false) => Some(0.0),
            _ => None,
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(x) => write!(f, "{}", x),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// A rectangular table: a header row of labels and rows of cells.
///
/// Rows may be shorter than the header, in which case the missing cells are
/// considered empty.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Table {
        Table { columns, rows }
    }

    /// Builds a table from the raw cells of a header row.
    ///
    /// The header cells are coerced to strings, see [crate::header_label].
    pub fn from_header_cells(header: &[Cell], rows: Vec<Vec<Cell>>) -> Table {
        let columns = header
            .iter()
            .enumerate()
            .map(|(idx, c)| crate::normalize::header_label(idx, c))
            .collect();
        Table { columns, rows }
    }

    /// The position of the first column with this exact label.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// A copy of the row, padded or truncated to the width of the header.
    pub fn padded_row(&self, row: usize) -> Vec<Cell> {
        (0..self.columns.len())
            .map(|col| self.cell(row, col).clone())
            .collect()
    }
}

/// A tax year that can be selected for the computation.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct TaxYear(u16);

impl TaxYear {
    pub fn new(year: u16) -> Result<TaxYear, ComplianceError> {
        if SUPPORTED_TAX_YEARS.contains(&year) {
            Ok(TaxYear(year))
        } else {
            UnsupportedTaxYearSnafu { year }.fail()
        }
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl Default for TaxYear {
    fn default() -> Self {
        TaxYear(2024)
    }
}

impl TryFrom<u16> for TaxYear {
    type Error = ComplianceError;
    fn try_from(year: u16) -> Result<Self, Self::Error> {
        TaxYear::new(year)
    }
}

impl Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ******** Output data structures *********

/// The three compliance bands.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum ComplianceTier {
    /// Compliance of at most 33.333%.
    KurangPatuh,
    /// Compliance above 33.333% and at most 66.666%.
    CukupPatuh,
    /// Compliance above 66.666%.
    Patuh,
}

impl ComplianceTier {
    pub const ALL: [ComplianceTier; 3] = [
        ComplianceTier::KurangPatuh,
        ComplianceTier::CukupPatuh,
        ComplianceTier::Patuh,
    ];

    /// Classifies a compliance percentage. The bounds belong to the lower band.
    pub fn classify(compliance_pct: f64) -> ComplianceTier {
        if compliance_pct <= 33.333 {
            ComplianceTier::KurangPatuh
        } else if compliance_pct <= 66.666 {
            ComplianceTier::CukupPatuh
        } else {
            ComplianceTier::Patuh
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComplianceTier::KurangPatuh => "Kurang Patuh",
            ComplianceTier::CukupPatuh => "Cukup Patuh",
            ComplianceTier::Patuh => "Patuh",
        }
    }

    pub fn from_label(label: &str) -> Option<ComplianceTier> {
        ComplianceTier::ALL.into_iter().find(|t| t.label() == label)
    }
}

impl Display for ComplianceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The values derived from the payment columns of one taxpayer.
#[derive(PartialEq, Debug, Clone)]
pub struct ComplianceMetrics {
    pub total_payment: f64,
    pub months_paid: u32,
    pub active_months: u32,
    pub average_payment: f64,
    pub compliance_pct: f64,
    pub tier: ComplianceTier,
}

impl ComplianceMetrics {
    /// Missing payments are ignored in the total and are not counted as paid.
    pub fn from_payments(payments: &[Option<f64>]) -> ComplianceMetrics {
        let total_payment: f64 = payments.iter().flatten().sum();
        let months_paid = payments.iter().flatten().filter(|x| **x > 0.0).count() as u32;
        let average_payment = total_payment / months_paid.max(1) as f64;
        let compliance_pct = months_paid as f64 / ACTIVE_MONTHS as f64 * 100.0;
        ComplianceMetrics {
            total_payment,
            months_paid,
            active_months: ACTIVE_MONTHS,
            average_payment,
            compliance_pct,
            tier: ComplianceTier::classify(compliance_pct),
        }
    }
}

/// One row of the input table, with its typed fields extracted.
#[derive(PartialEq, Debug, Clone)]
pub struct TaxpayerRecord {
    /// Position of the row in the input table, starting at 0.
    pub row_index: usize,
    pub registration_date: Option<NaiveDate>,
    pub name: String,
    pub status: String,
    /// All the normalized columns of the row. The `TMT` cell holds the parsed
    /// date, or is empty.
    pub source: Vec<Cell>,
    /// The values of the payment columns, in the order of the payment column set.
    pub payments: Vec<Option<f64>>,
    /// Absent when no payment column was found.
    pub metrics: Option<ComplianceMetrics>,
}

impl TaxpayerRecord {
    pub fn registration_year(&self) -> Option<i32> {
        self.registration_date.map(|d| d.year())
    }

    pub fn total_payment(&self) -> Option<f64> {
        self.metrics.as_ref().map(|m| m.total_payment)
    }
}

/// The columns appended to the input table.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum DerivedColumn {
    RegistrationYear,
    TotalPayment,
    MonthsPaid,
    ActiveMonths,
    AveragePayment,
    CompliancePct,
    Tier,
}

impl DerivedColumn {
    /// The columns that depend on the payment columns.
    pub const PAYMENT_METRICS: [DerivedColumn; 6] = [
        DerivedColumn::TotalPayment,
        DerivedColumn::MonthsPaid,
        DerivedColumn::ActiveMonths,
        DerivedColumn::AveragePayment,
        DerivedColumn::CompliancePct,
        DerivedColumn::Tier,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DerivedColumn::RegistrationYear => "TAHUN TMT",
            DerivedColumn::TotalPayment => "TOTAL PEMBAYARAN",
            DerivedColumn::MonthsPaid => "BULAN PEMBAYARAN",
            DerivedColumn::ActiveMonths => "BULAN AKTIF",
            DerivedColumn::AveragePayment => "RATA-RATA PEMBAYARAN",
            DerivedColumn::CompliancePct => "KEPATUHAN (%)",
            DerivedColumn::Tier => "KLASIFIKASI KEPATUHAN",
        }
    }

    pub fn value(&self, record: &TaxpayerRecord) -> Cell {
        let m = record.metrics.as_ref();
        let cell = match self {
            DerivedColumn::RegistrationYear => {
                record.registration_year().map(|y| Cell::Number(y as f64))
            }
            DerivedColumn::TotalPayment => m.map(|m| Cell::Number(m.total_payment)),
            DerivedColumn::MonthsPaid => m.map(|m| Cell::Number(m.months_paid as f64)),
            DerivedColumn::ActiveMonths => m.map(|m| Cell::Number(m.active_months as f64)),
            DerivedColumn::AveragePayment => m.map(|m| Cell::Number(m.average_payment)),
            DerivedColumn::CompliancePct => m.map(|m| Cell::Number(m.compliance_pct)),
            DerivedColumn::Tier => m.map(|m| Cell::text(m.tier.label())),
        };
        cell.unwrap_or(Cell::Empty)
    }
}

/// Where the content of an output column comes from.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ColumnSlot {
    Source(usize),
    Derived(DerivedColumn),
}

/// The input table augmented with the compliance indicators.
#[derive(PartialEq, Debug, Clone)]
pub struct ComplianceTable {
    pub tax_year: TaxYear,
    /// The normalized labels of the input table.
    pub columns: Vec<String>,
    pub records: Vec<TaxpayerRecord>,
    /// The payment column set, in table order. May be empty.
    pub payment_columns: Vec<String>,
    /// Number of non-empty `TMT` cells that could not be read as a date.
    pub unparsable_dates: usize,
}

impl ComplianceTable {
    pub fn has_payment_columns(&self) -> bool {
        !self.payment_columns.is_empty()
    }

    /// The layout of the output table.
    ///
    /// A derived column whose label already exists in the input replaces that
    /// column in place.
    pub fn layout(&self) -> Vec<(String, ColumnSlot)> {
        let mut slots: Vec<(String, ColumnSlot)> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.clone(), ColumnSlot::Source(idx)))
            .collect();
        let mut derived = vec![DerivedColumn::RegistrationYear];
        if self.has_payment_columns() {
            derived.extend(DerivedColumn::PAYMENT_METRICS);
        }
        for d in derived {
            let label = d.label();
            match slots.iter_mut().find(|(l, _)| l == label) {
                Some(slot) => slot.1 = ColumnSlot::Derived(d),
                None => slots.push((label.to_string(), ColumnSlot::Derived(d))),
            }
        }
        slots
    }

    pub fn augmented_columns(&self) -> Vec<String> {
        self.layout().into_iter().map(|(l, _)| l).collect()
    }

    pub fn augmented_rows(&self) -> Vec<Vec<Cell>> {
        let layout = self.layout();
        self.records
            .iter()
            .map(|r| {
                layout
                    .iter()
                    .map(|(_, slot)| match slot {
                        ColumnSlot::Source(idx) => r.source.get(*idx).cloned().unwrap_or(Cell::Empty),
                        ColumnSlot::Derived(d) => d.value(r),
                    })
                    .collect()
            })
            .collect()
    }

    /// The augmented table as a plain table.
    pub fn to_table(&self) -> Table {
        Table::new(self.augmented_columns(), self.augmented_rows())
    }
}

/// Conditions that do not prevent the computation from producing a table.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ComplianceWarning {
    /// No numeric column is tagged with the tax year.
    NoPaymentColumnsFound { year: TaxYear },
    /// Some registration dates could not be read.
    UnparsableDates { count: usize },
}

impl Display for ComplianceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceWarning::NoPaymentColumnsFound { year } => write!(
                f,
                "no valid numeric payment column found for tax year {}",
                year
            ),
            ComplianceWarning::UnparsableDates { count } => {
                write!(f, "{} TMT values could not be read as dates", count)
            }
        }
    }
}

/// The outcome of a successful computation.
#[derive(PartialEq, Debug, Clone)]
pub enum Computation {
    /// The payment columns were found and all the indicators are computed.
    Complete(ComplianceTable),
    /// Only the dates were derived.
    NoPaymentColumns(ComplianceTable),
}

impl Computation {
    pub fn table(&self) -> &ComplianceTable {
        match self {
            Computation::Complete(t) | Computation::NoPaymentColumns(t) => t,
        }
    }

    pub fn into_table(self) -> ComplianceTable {
        match self {
            Computation::Complete(t) | Computation::NoPaymentColumns(t) => t,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Computation::NoPaymentColumns(_))
    }

    pub fn warnings(&self) -> Vec<ComplianceWarning> {
        let t = self.table();
        let mut res = Vec::new();
        if self.is_partial() {
            res.push(ComplianceWarning::NoPaymentColumnsFound { year: t.tax_year });
        }
        if t.unparsable_dates > 0 {
            res.push(ComplianceWarning::UnparsableDates {
                count: t.unparsable_dates,
            });
        }
        res
    }
}

/// Errors that prevent the computation from producing a table.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ComplianceError {
    #[snafu(display("Missing required columns: {}", columns.join(", ")))]
    MissingRequiredColumn { columns: Vec<String> },
    #[snafu(display("Unsupported tax year {year}, expected one of 2023, 2024, 2025"))]
    UnsupportedTaxYear { year: u16 },
}
