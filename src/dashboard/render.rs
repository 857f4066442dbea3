// Terminal rendering of the computed table and of the messages to the user.

use tabled::{builder::Builder, settings::Style, Table as TextTable, Tabled};

use crate::dashboard::*;

/// Formats an amount in rupiah with thousands separators: `Rp 1,234,567`.
pub fn format_rupiah(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("Rp -{}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

pub fn format_pct(pct: f64) -> String {
    format!("{:.2}", pct)
}

/// Renders any table, every cell as it is exported.
pub fn table_view(columns: &[String], rows: &[Vec<Cell>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(row.iter().map(|c| c.to_string()));
    }
    let mut table = builder.build();
    table.with(Style::psql());
    table.to_string()
}

#[derive(Tabled)]
struct TopPayerRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "NAMA OP")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "TOTAL PEMBAYARAN")]
    total: String,
    #[tabled(rename = "KEPATUHAN (%)")]
    compliance: String,
    #[tabled(rename = "KLASIFIKASI KEPATUHAN")]
    tier: String,
}

pub fn top_payers_view(table: &ComplianceTable, n: usize) -> String {
    let rows: Vec<TopPayerRow> = top_payers(table, n)
        .iter()
        .enumerate()
        .filter_map(|(idx, r)| {
            r.metrics.as_ref().map(|m| TopPayerRow {
                rank: idx + 1,
                name: r.name.clone(),
                status: r.status.clone(),
                total: format_rupiah(m.total_payment),
                compliance: format_pct(m.compliance_pct),
                tier: m.tier.label().to_string(),
            })
        })
        .collect();
    let mut t = TextTable::new(rows);
    t.with(Style::psql());
    t.to_string()
}

#[derive(Tabled)]
struct TierRow {
    #[tabled(rename = "Kategori")]
    tier: String,
    #[tabled(rename = "Jumlah")]
    count: usize,
}

pub fn tier_counts_view(table: &ComplianceTable) -> String {
    let rows: Vec<TierRow> = tier_counts(table)
        .into_iter()
        .map(|(tier, count)| TierRow {
            tier: tier.label().to_string(),
            count,
        })
        .collect();
    let mut t = TextTable::new(rows);
    t.with(Style::psql());
    t.to_string()
}

/// The three summary metrics, as label and formatted value.
pub fn metrics(agg: &Aggregates) -> Vec<(&'static str, String)> {
    let na = || "-".to_string();
    vec![
        ("Total WP", agg.record_count.to_string()),
        (
            "Total Pembayaran",
            agg.total_payment.map(format_rupiah).unwrap_or_else(na),
        ),
        (
            "Rata-rata Pembayaran",
            agg.mean_payment.map(format_rupiah).unwrap_or_else(na),
        ),
    ]
}

/// Everything printed after a successful computation.
pub fn terminal_report(computation: &Computation, top_n: usize) -> String {
    let table = computation.table();
    let mut out = String::new();
    out.push_str("✅ Data berhasil diproses!\n\n");
    out.push_str(&table_view(&table.augmented_columns(), &table.augmented_rows()));
    out.push_str("\n\n📌 Ringkasan Statistik\n");
    for (label, value) in metrics(&aggregates(table)) {
        out.push_str(&format!("  {:<22}{}\n", label, value));
    }
    if table.has_payment_columns() {
        out.push_str("\n📊 Jumlah WP per Klasifikasi\n");
        out.push_str(&tier_counts_view(table));
        out.push_str(&format!("\n\n🏅 Top {} Pembayar Tertinggi\n", top_n));
        out.push_str(&top_payers_view(table, top_n));
        out.push('\n');
    }
    out
}

pub fn blocking_message(e: &ComplianceError) -> String {
    match e {
        ComplianceError::MissingRequiredColumn { columns } => format!(
            "❌ Kolom wajib hilang: {}. Kolom wajib: TMT, NAMA OP, STATUS. Harap periksa file Anda.",
            columns.join(", ")
        ),
        other => format!("❌ {}", other),
    }
}

pub fn warning_message(w: &ComplianceWarning) -> String {
    match w {
        ComplianceWarning::NoPaymentColumnsFound { year } => format!(
            "⚠️ Tidak ditemukan kolom pembayaran murni yang valid untuk tahun {}.",
            year
        ),
        ComplianceWarning::UnparsableDates { count } => {
            format!("⚠️ {} nilai TMT bukan tanggal yang valid.", count)
        }
    }
}

pub fn no_input_hint() -> String {
    format!(
        "💡 Silakan pilih file Excel berisi data setoran masa pajak dengan --input.\n   Contoh format dapat dibuat dengan: kepatuhan --template \"{}\"",
        io_export::TEMPLATE_FILE
    )
}

pub fn template_written(path: &str) -> String {
    format!("📎 Contoh format Excel ditulis ke {}", path)
}

pub fn export_written(path: &str) -> String {
    format!("📥 Hasil Excel ditulis ke {}", path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computation(payments: &[f64]) -> Computation {
        let mut header = vec![Cell::text("TMT"), Cell::text("NAMA OP"), Cell::text("STATUS")];
        let mut row = vec![Cell::text("2024-01-15"), Cell::text("ACME"), Cell::text("Active")];
        for (idx, p) in payments.iter().enumerate() {
            header.push(Cell::text(format!("BULAN{} 2024", idx + 1)));
            row.push(Cell::Number(*p));
        }
        let table = Table::from_header_cells(&header, vec![row]);
        compute_compliance(&table, TaxYear::default()).unwrap()
    }

    #[test]
    fn rupiah() {
        assert_eq!(format_rupiah(0.0), "Rp 0");
        assert_eq!(format_rupiah(999.0), "Rp 999");
        assert_eq!(format_rupiah(1000.0), "Rp 1,000");
        assert_eq!(format_rupiah(1234567.4), "Rp 1,234,567");
        assert_eq!(format_rupiah(-2500000.0), "Rp -2,500,000");
        assert_eq!(format_pct(100.0 / 12.0), "8.33");
    }

    #[test]
    fn report_contains_all_sections() {
        let report = terminal_report(&computation(&[100.0, 0.0]), 20);
        assert!(report.contains("KLASIFIKASI KEPATUHAN"));
        assert!(report.contains("Kurang Patuh"));
        assert!(report.contains("Rp 100"));
        assert!(report.contains("Top 20 Pembayar Tertinggi"));
        assert!(report.contains("8.33"));
    }

    #[test]
    fn report_without_payments() {
        let report = terminal_report(&computation(&[]), 20);
        assert!(report.contains("TAHUN TMT"));
        assert!(!report.contains("Top 20"));
        assert!(report.contains("Total Pembayaran      -"));
    }

    #[test]
    fn messages() {
        let e = ComplianceError::MissingRequiredColumn {
            columns: vec!["STATUS".to_string()],
        };
        assert!(blocking_message(&e).starts_with("❌ Kolom wajib hilang: STATUS."));
        let w = ComplianceWarning::NoPaymentColumnsFound {
            year: TaxYear::default(),
        };
        assert!(warning_message(&w).contains("2024"));
    }
}
