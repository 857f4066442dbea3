// Read-only reductions over a computed table: rankings, aggregates and the
// series behind the charts.

use chrono::NaiveDate;

use crate::config::*;
use crate::dates::parse_month_label;

/// The default size of the top payers view.
pub const DEFAULT_TOP_N: usize = 20;

/// Number of taxpayers in each tier.
///
/// Sorted by decreasing count, ties in tier order. Tiers without any taxpayer
/// are left out. Empty when no payment column was found.
pub fn tier_counts(table: &ComplianceTable) -> Vec<(ComplianceTier, usize)> {
    let mut counts: Vec<(ComplianceTier, usize)> = ComplianceTier::ALL
        .iter()
        .map(|tier| {
            let n = table
                .records
                .iter()
                .filter(|r| r.metrics.as_ref().map(|m| m.tier) == Some(*tier))
                .count();
            (*tier, n)
        })
        .filter(|(_, n)| *n > 0)
        .collect();
    // Stable: equal counts keep the tier order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// The `n` taxpayers with the largest total payment, largest first.
///
/// Taxpayers with the same total keep the order of the input rows.
pub fn top_payers(table: &ComplianceTable, n: usize) -> Vec<&TaxpayerRecord> {
    let mut ranked: Vec<(&TaxpayerRecord, f64)> = table
        .records
        .iter()
        .filter_map(|r| r.total_payment().map(|t| (r, t)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().take(n).map(|(r, _)| r).collect()
}

/// The scalars of the summary view.
#[derive(PartialEq, Debug, Clone)]
pub struct Aggregates {
    pub record_count: usize,
    /// Sum of the total payments. None without payment columns.
    pub total_payment: Option<f64>,
    /// Mean of the total payments. None without payment columns or records.
    pub mean_payment: Option<f64>,
}

pub fn aggregates(table: &ComplianceTable) -> Aggregates {
    let record_count = table.records.len();
    if !table.has_payment_columns() {
        return Aggregates {
            record_count,
            total_payment: None,
            mean_payment: None,
        };
    }
    let total: f64 = table.records.iter().filter_map(|r| r.total_payment()).sum();
    Aggregates {
        record_count,
        total_payment: Some(total),
        mean_payment: if record_count > 0 {
            Some(total / record_count as f64)
        } else {
            None
        },
    }
}

/// One point of the monthly trend.
#[derive(PartialEq, Debug, Clone)]
pub struct TrendPoint {
    pub label: String,
    /// The month read from the label, if it could be read.
    pub month: Option<NaiveDate>,
    pub total: f64,
}

/// The sum of each payment column across all the taxpayers.
///
/// Points are sorted by month. Columns whose month cannot be determined come
/// last, in table order.
pub fn monthly_trend(table: &ComplianceTable) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = table
        .payment_columns
        .iter()
        .enumerate()
        .map(|(idx, label)| TrendPoint {
            label: label.clone(),
            month: parse_month_label(label),
            total: table
                .records
                .iter()
                .filter_map(|r| r.payments.get(idx).cloned().flatten())
                .sum(),
        })
        .collect();
    points.sort_by_key(|p| (p.month.is_none(), p.month));
    points
}

/// The distribution of the total payments inside one tier.
#[derive(PartialEq, Debug, Clone)]
pub struct TierSpread {
    pub tier: ComplianceTier,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    /// All the total payments of the tier, in input order.
    pub points: Vec<f64>,
}

/// The five-number summary of the total payments, for each tier that has
/// taxpayers, in tier order.
pub fn payment_spread(table: &ComplianceTable) -> Vec<TierSpread> {
    let mut res: Vec<TierSpread> = Vec::new();
    for tier in ComplianceTier::ALL {
        let points: Vec<f64> = table
            .records
            .iter()
            .filter_map(|r| r.metrics.as_ref())
            .filter(|m| m.tier == tier)
            .map(|m| m.total_payment)
            .collect();
        if points.is_empty() {
            continue;
        }
        let mut sorted = points.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        res.push(TierSpread {
            tier,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            points,
        });
    }
    res
}

// Linear interpolation between the closest ranks. `sorted` must not be empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_compliance;

    fn table(rows: Vec<(&str, Vec<f64>)>) -> ComplianceTable {
        let mut header = vec![Cell::text("TMT"), Cell::text("NAMA OP"), Cell::text("STATUS")];
        header.extend(
            ["MAR 2024", "JAN 2024", "FEB 2024", "TOTAL 2024"]
                .iter()
                .map(|s| Cell::text(*s)),
        );
        let rows = rows
            .into_iter()
            .map(|(name, payments)| {
                let mut row = vec![Cell::text("2024-01-01"), Cell::text(name), Cell::text("AKTIF")];
                row.extend(payments.into_iter().map(Cell::Number));
                row
            })
            .collect();
        let t = Table::from_header_cells(&header, rows);
        compute_compliance(&t, TaxYear::new(2024).unwrap())
            .unwrap()
            .into_table()
    }

    #[test]
    fn top_payers_ties_keep_input_order() {
        let t = table(vec![
            ("A", vec![10.0, 0.0, 0.0, 0.0]),
            ("B", vec![50.0, 0.0, 0.0, 0.0]),
            ("C", vec![10.0, 0.0, 0.0, 0.0]),
            ("D", vec![0.0, 0.0, 0.0, 0.0]),
        ]);
        let names: Vec<&str> = top_payers(&t, 20).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C", "D"]);
        let names: Vec<&str> = top_payers(&t, 2).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn tier_counts_sorted_by_count() {
        let t = table(vec![
            ("A", vec![1.0, 1.0, 1.0, 1.0]),
            ("B", vec![0.0, 0.0, 0.0, 0.0]),
            ("C", vec![1.0, 0.0, 0.0, 0.0]),
        ]);
        // 4 months paid is above a third.
        assert_eq!(
            tier_counts(&t),
            vec![
                (ComplianceTier::KurangPatuh, 2),
                (ComplianceTier::CukupPatuh, 1)
            ]
        );
    }

    #[test]
    fn aggregates_over_totals() {
        let t = table(vec![
            ("A", vec![100.0, 0.0, 0.0, 0.0]),
            ("B", vec![100.0, 100.0, 100.0, 0.0]),
        ]);
        let agg = aggregates(&t);
        assert_eq!(agg.record_count, 2);
        assert_eq!(agg.total_payment, Some(400.0));
        assert_eq!(agg.mean_payment, Some(200.0));

        let empty = table(vec![]);
        let agg = aggregates(&empty);
        assert_eq!(agg.record_count, 0);
        assert_eq!(agg.total_payment, Some(0.0));
        assert_eq!(agg.mean_payment, None);
    }

    #[test]
    fn trend_is_ordered_by_month() {
        let t = table(vec![
            ("A", vec![1.0, 2.0, 3.0, 6.0]),
            ("B", vec![10.0, 20.0, 30.0, 60.0]),
        ]);
        let trend = monthly_trend(&t);
        let labels: Vec<&str> = trend.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["JAN 2024", "FEB 2024", "MAR 2024", "TOTAL 2024"]);
        let totals: Vec<f64> = trend.iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![22.0, 33.0, 11.0, 66.0]);
        assert_eq!(trend[3].month, None);
    }

    #[test]
    fn spread_quartiles() {
        let t = table(vec![
            ("A", vec![1.0, 0.0, 0.0, 0.0]),
            ("B", vec![2.0, 0.0, 0.0, 0.0]),
            ("C", vec![3.0, 0.0, 0.0, 0.0]),
            ("D", vec![4.0, 0.0, 0.0, 0.0]),
            ("E", vec![5.0, 0.0, 0.0, 0.0]),
        ]);
        let spread = payment_spread(&t);
        assert_eq!(spread.len(), 1);
        let s = &spread[0];
        assert_eq!(s.tier, ComplianceTier::KurangPatuh);
        assert_eq!((s.min, s.q1, s.median, s.q3, s.max), (1.0, 2.0, 3.0, 4.0, 5.0));
        assert_eq!(s.points, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(quantile(&[1.0, 2.0], 0.25), 1.25);
    }
}
