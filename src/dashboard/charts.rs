// SVG charts and the HTML page of the dashboard.

use std::f64::consts::PI;

use crate::dashboard::*;

const WIDTH: usize = 680;
const HEIGHT: usize = 320;
const MARGIN: usize = 60;

// Pastel palette, in tier order.
const PIE_COLORS: [&str; 3] = ["#66c5cc", "#f6cf71", "#f89c74"];
// Set2 palette, in tier order.
const BAR_COLORS: [&str; 3] = ["#66c2a5", "#fc8d62", "#8da0cb"];

pub const TREND_FILE: &str = "tren_pembayaran.svg";
pub const PIE_FILE: &str = "pie_kepatuhan.svg";
pub const BAR_FILE: &str = "bar_kepatuhan.svg";
pub const SPREAD_FILE: &str = "box_pembayaran.svg";

/// The charts of one computed table.
///
/// The trend chart only exists when the table has payment columns.
#[derive(Debug, Clone)]
pub struct DashboardCharts {
    pub trend: Option<String>,
    pub pie: String,
    pub bar: String,
    pub spread: String,
}

impl DashboardCharts {
    pub fn build(table: &ComplianceTable) -> DashboardCharts {
        let counts = tier_counts(table);
        let trend = if table.has_payment_columns() {
            Some(line_chart_svg(&monthly_trend(table)))
        } else {
            None
        };
        DashboardCharts {
            trend,
            pie: pie_chart_svg(&counts),
            bar: bar_chart_svg(&counts),
            spread: box_plot_svg(&payment_spread(table)),
        }
    }

    /// The file name and the content of each chart.
    pub fn files(&self) -> Vec<(&'static str, &str)> {
        let mut res: Vec<(&'static str, &str)> = Vec::new();
        if let Some(trend) = &self.trend {
            res.push((TREND_FILE, trend.as_str()));
        }
        res.push((PIE_FILE, self.pie.as_str()));
        res.push((BAR_FILE, self.bar.as_str()));
        res.push((SPREAD_FILE, self.spread.as_str()));
        res
    }
}

pub fn escape_xml(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => res.push_str("&amp;"),
            '<' => res.push_str("&lt;"),
            '>' => res.push_str("&gt;"),
            '"' => res.push_str("&quot;"),
            '\'' => res.push_str("&#39;"),
            _ => res.push(c),
        }
    }
    res
}

fn tier_color(palette: &[&'static str; 3], tier: ComplianceTier) -> &'static str {
    let idx = ComplianceTier::ALL
        .iter()
        .position(|t| *t == tier)
        .unwrap_or(0);
    palette[idx]
}

fn svg_frame(title: &str, body: &str) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" style="background:white; border-radius:8px">
  <text x="{cx}" y="24" text-anchor="middle" font-size="15" font-weight="600" fill="#374151">{title}</text>
{body}
</svg>"##,
        w = WIDTH,
        h = HEIGHT,
        cx = WIDTH / 2,
        title = escape_xml(title),
        body = body
    )
}

fn no_data(title: &str) -> String {
    let body = format!(
        r##"  <text x="{}" y="{}" text-anchor="middle" font-size="13" fill="#9ca3af">Tidak ada data</text>"##,
        WIDTH / 2,
        HEIGHT / 2
    );
    svg_frame(title, &body)
}

// Axis lines and the y labels for values from 0 to max.
fn axes(max: f64, format_tick: impl Fn(f64) -> String) -> String {
    let chart_height = (HEIGHT - 2 * MARGIN) as f64;
    let mut res = format!(
        r##"  <line x1="{m}" y1="{b}" x2="{r}" y2="{b}" stroke="#e5e7eb" stroke-width="2"/>
  <line x1="{m}" y1="{m}" x2="{m}" y2="{b}" stroke="#e5e7eb" stroke-width="2"/>
"##,
        m = MARGIN,
        b = HEIGHT - MARGIN,
        r = WIDTH - MARGIN
    );
    for step in 0..=4 {
        let value = max * step as f64 / 4.0;
        let y = (HEIGHT - MARGIN) as f64 - chart_height * step as f64 / 4.0;
        res.push_str(&format!(
            r##"  <text x="{}" y="{:.1}" text-anchor="end" font-size="10" fill="#6b7280">{}</text>
"##,
            MARGIN - 6,
            y + 3.0,
            escape_xml(&format_tick(value))
        ));
    }
    res
}

// Short amounts for the axis ticks.
fn short_amount(x: f64) -> String {
    if x >= 1e9 {
        format!("{:.1}M", x / 1e9)
    } else if x >= 1e6 {
        format!("{:.1}jt", x / 1e6)
    } else if x >= 1e3 {
        format!("{:.0}rb", x / 1e3)
    } else {
        format!("{:.0}", x)
    }
}

/// Total payment per month, as a line with markers.
pub fn line_chart_svg(points: &[TrendPoint]) -> String {
    let title = "Tren Pembayaran Pajak per Bulan";
    if points.is_empty() {
        return no_data(title);
    }
    let chart_width = (WIDTH - 2 * MARGIN) as f64;
    let chart_height = (HEIGHT - 2 * MARGIN) as f64;
    let max = points.iter().map(|p| p.total).fold(0.0_f64, f64::max);
    let scale = if max > 0.0 { max } else { 1.0 };
    let step = if points.len() > 1 {
        chart_width / (points.len() - 1) as f64
    } else {
        0.0
    };

    let coords: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let x = if points.len() > 1 {
                MARGIN as f64 + idx as f64 * step
            } else {
                MARGIN as f64 + chart_width / 2.0
            };
            let y = (HEIGHT - MARGIN) as f64 - p.total.max(0.0) / scale * chart_height;
            (x, y)
        })
        .collect();

    let mut body = axes(scale, short_amount);
    let path: Vec<String> = coords
        .iter()
        .map(|(x, y)| format!("{:.1},{:.1}", x, y))
        .collect();
    body.push_str(&format!(
        r##"  <polyline points="{}" fill="none" stroke="#2563eb" stroke-width="2"/>
"##,
        path.join(" ")
    ));
    for ((x, y), p) in coords.iter().zip(points) {
        body.push_str(&format!(
            r##"  <circle cx="{:.1}" cy="{:.1}" r="4" fill="#2563eb"><title>{}: {}</title></circle>
  <text x="{:.1}" y="{}" text-anchor="end" font-size="10" fill="#6b7280" transform="rotate(-35, {:.1}, {})">{}</text>
"##,
            x,
            y,
            escape_xml(&p.label),
            escape_xml(&render::format_rupiah(p.total)),
            x,
            HEIGHT - MARGIN + 14,
            x,
            HEIGHT - MARGIN + 14,
            escape_xml(&p.label)
        ));
    }
    svg_frame(title, &body)
}

/// Share of taxpayers in each tier.
pub fn pie_chart_svg(counts: &[(ComplianceTier, usize)]) -> String {
    let title = "Distribusi Kategori Kepatuhan";
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    if total == 0 {
        return no_data(title);
    }
    let (cx, cy, r) = (WIDTH as f64 / 3.0, HEIGHT as f64 / 2.0 + 10.0, 110.0);

    let mut body = String::new();
    let mut angle = -PI / 2.0;
    for (tier, n) in counts.iter().filter(|(_, n)| *n > 0) {
        let color = tier_color(&PIE_COLORS, *tier);
        if *n == total {
            body.push_str(&format!(
                r##"  <circle cx="{:.1}" cy="{:.1}" r="{:.1}" fill="{}" stroke="white" stroke-width="2"/>
"##,
                cx, cy, r, color
            ));
            continue;
        }
        let sweep = 2.0 * PI * *n as f64 / total as f64;
        let (x1, y1) = (cx + r * angle.cos(), cy + r * angle.sin());
        let end = angle + sweep;
        let (x2, y2) = (cx + r * end.cos(), cy + r * end.sin());
        let large_arc = if sweep > PI { 1 } else { 0 };
        body.push_str(&format!(
            r##"  <path d="M {:.1} {:.1} L {:.1} {:.1} A {:.1} {:.1} 0 {} 1 {:.1} {:.1} Z" fill="{}" stroke="white" stroke-width="2"/>
"##,
            cx, cy, x1, y1, r, r, large_arc, x2, y2, color
        ));
        angle = end;
    }

    // Legend, with the share of each tier.
    let lx = WIDTH as f64 * 2.0 / 3.0 - 20.0;
    for (idx, (tier, n)) in counts.iter().filter(|(_, n)| *n > 0).enumerate() {
        let y = 110.0 + idx as f64 * 28.0;
        body.push_str(&format!(
            r##"  <rect x="{:.1}" y="{:.1}" width="14" height="14" fill="{}"/>
  <text x="{:.1}" y="{:.1}" font-size="12" fill="#374151">{} ({:.1}%)</text>
"##,
            lx,
            y - 11.0,
            tier_color(&PIE_COLORS, *tier),
            lx + 22.0,
            y,
            tier.label(),
            100.0 * *n as f64 / total as f64
        ));
    }
    svg_frame(title, &body)
}

/// Number of taxpayers in each tier.
pub fn bar_chart_svg(counts: &[(ComplianceTier, usize)]) -> String {
    let title = "Jumlah WP per Kategori Kepatuhan";
    let max = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if max == 0 {
        return no_data(title);
    }
    let chart_width = (WIDTH - 2 * MARGIN) as f64;
    let chart_height = (HEIGHT - 2 * MARGIN) as f64;
    let slot = chart_width / counts.len() as f64;

    let mut body = axes(max as f64, |x| format!("{:.0}", x));
    for (idx, (tier, n)) in counts.iter().enumerate() {
        let bar_height = *n as f64 / max as f64 * chart_height;
        let x = MARGIN as f64 + idx as f64 * slot + slot * 0.2;
        let y = (HEIGHT - MARGIN) as f64 - bar_height;
        body.push_str(&format!(
            r##"  <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" opacity="0.9"/>
  <text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="12" fill="#374151">{}</text>
  <text x="{:.1}" y="{}" text-anchor="middle" font-size="12" fill="#6b7280">{}</text>
"##,
            x,
            y,
            slot * 0.6,
            bar_height,
            tier_color(&BAR_COLORS, *tier),
            x + slot * 0.3,
            y - 6.0,
            n,
            x + slot * 0.3,
            HEIGHT - MARGIN + 18,
            tier.label()
        ));
    }
    svg_frame(title, &body)
}

/// Spread of the total payments within each tier, with every taxpayer as a dot.
pub fn box_plot_svg(spreads: &[TierSpread]) -> String {
    let title = "Sebaran Total Pembayaran per Kategori";
    if spreads.is_empty() {
        return no_data(title);
    }
    let chart_width = (WIDTH - 2 * MARGIN) as f64;
    let chart_height = (HEIGHT - 2 * MARGIN) as f64;
    let max = spreads.iter().map(|s| s.max).fold(0.0_f64, f64::max);
    let scale = if max > 0.0 { max } else { 1.0 };
    let y_of = |v: f64| (HEIGHT - MARGIN) as f64 - v.max(0.0) / scale * chart_height;
    let slot = chart_width / spreads.len() as f64;

    let mut body = axes(scale, short_amount);
    for (idx, s) in spreads.iter().enumerate() {
        let color = tier_color(&BAR_COLORS, s.tier);
        let center = MARGIN as f64 + (idx as f64 + 0.5) * slot;
        let half = slot * 0.2;
        body.push_str(&format!(
            r##"  <line x1="{c:.1}" y1="{ymin:.1}" x2="{c:.1}" y2="{ymax:.1}" stroke="#374151" stroke-width="1"/>
  <line x1="{l:.1}" y1="{ymin:.1}" x2="{r:.1}" y2="{ymin:.1}" stroke="#374151" stroke-width="1"/>
  <line x1="{l:.1}" y1="{ymax:.1}" x2="{r:.1}" y2="{ymax:.1}" stroke="#374151" stroke-width="1"/>
  <rect x="{bl:.1}" y="{yq3:.1}" width="{bw:.1}" height="{bh:.1}" fill="{color}" opacity="0.8" stroke="#374151"/>
  <line x1="{bl:.1}" y1="{ymed:.1}" x2="{br:.1}" y2="{ymed:.1}" stroke="#111827" stroke-width="2"/>
  <text x="{c:.1}" y="{ty}" text-anchor="middle" font-size="12" fill="#6b7280">{label}</text>
"##,
            c = center,
            l = center - half / 2.0,
            r = center + half / 2.0,
            bl = center - half,
            br = center + half,
            bw = 2.0 * half,
            bh = (y_of(s.q1) - y_of(s.q3)).max(1.0),
            ymin = y_of(s.min),
            ymax = y_of(s.max),
            yq3 = y_of(s.q3),
            ymed = y_of(s.median),
            color = color,
            ty = HEIGHT - MARGIN + 18,
            label = s.tier.label()
        ));
        // Dots are spread across the box width in a fixed pattern.
        for (p_idx, p) in s.points.iter().enumerate() {
            let offset = ((p_idx % 7) as f64 - 3.0) / 3.0 * half * 0.8;
            body.push_str(&format!(
                r##"  <circle cx="{:.1}" cy="{:.1}" r="2.5" fill="#1f2937" opacity="0.5"/>
"##,
                center + offset,
                y_of(*p)
            ));
        }
    }
    svg_frame(title, &body)
}

fn html_table(columns: &[String], rows: &[Vec<String>]) -> String {
    let mut res = String::from("<table>\n<thead><tr>");
    for c in columns {
        res.push_str(&format!("<th>{}</th>", escape_xml(c)));
    }
    res.push_str("</tr></thead>\n<tbody>\n");
    for row in rows {
        res.push_str("<tr>");
        for c in row {
            res.push_str(&format!("<td>{}</td>", escape_xml(c)));
        }
        res.push_str("</tr>\n");
    }
    res.push_str("</tbody>\n</table>\n");
    res
}

fn section(title: &str, content: &str) -> String {
    format!(
        "<section>\n<h2>{}</h2>\n{}</section>\n",
        escape_xml(title),
        content
    )
}

const PAGE_STYLE: &str = "body { font-family: sans-serif; margin: 2em; color: #1f2937; }
.metrics { display: flex; gap: 1em; }
.metric { border: 1px solid #e5e7eb; border-radius: 8px; padding: 1em; min-width: 12em; }
.metric .value { font-size: 1.4em; font-weight: 600; }
.warning { background: #fef3c7; border-radius: 8px; padding: 0.6em 1em; }
.charts { display: flex; flex-wrap: wrap; gap: 1em; }
.scroll { overflow-x: auto; }
table { border-collapse: collapse; font-size: 0.85em; }
th, td { border: 1px solid #e5e7eb; padding: 0.3em 0.6em; }
th { background: #f3f4f6; }
";

/// The dashboard as a single HTML page, with the charts inlined.
pub fn dashboard_page(
    sheet: &str,
    computation: &Computation,
    charts: &DashboardCharts,
    top_n: usize,
) -> String {
    let table = computation.table();
    let mut body = String::new();
    body.push_str(&format!(
        "<h1>Dashboard Kepatuhan Pajak Daerah</h1>\n<p>Lembar kerja <b>{}</b>, tahun pajak <b>{}</b>.</p>\n",
        escape_xml(sheet),
        table.tax_year
    ));

    for w in computation.warnings() {
        body.push_str(&format!(
            "<p class=\"warning\">{}</p>\n",
            escape_xml(&render::warning_message(&w))
        ));
    }

    let mut metrics_html = String::from("<div class=\"metrics\">\n");
    for (label, value) in render::metrics(&aggregates(table)) {
        metrics_html.push_str(&format!(
            "<div class=\"metric\"><div>{}</div><div class=\"value\">{}</div></div>\n",
            escape_xml(label),
            escape_xml(&value)
        ));
    }
    metrics_html.push_str("</div>\n");
    body.push_str(&section("Ringkasan Statistik", &metrics_html));

    let rows: Vec<Vec<String>> = table
        .augmented_rows()
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect();
    body.push_str(&section(
        "Data Hasil Perhitungan",
        &format!(
            "<div class=\"scroll\">\n{}</div>\n<p><a href=\"{}\">📥 Download Hasil Excel</a></p>\n",
            html_table(&table.augmented_columns(), &rows),
            io_export::DEFAULT_EXPORT_FILE
        ),
    ));

    if table.has_payment_columns() {
        let top: Vec<Vec<String>> = top_payers(table, top_n)
            .iter()
            .filter_map(|r| {
                r.metrics.as_ref().map(|m| {
                    vec![
                        r.name.clone(),
                        r.status.clone(),
                        render::format_rupiah(m.total_payment),
                        render::format_pct(m.compliance_pct),
                        m.tier.label().to_string(),
                    ]
                })
            })
            .collect();
        let top_columns: Vec<String> = [
            NAMA_OP,
            STATUS,
            DerivedColumn::TotalPayment.label(),
            DerivedColumn::CompliancePct.label(),
            DerivedColumn::Tier.label(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        body.push_str(&section(
            &format!("Top {} Pembayar Tertinggi", top_n),
            &html_table(&top_columns, &top),
        ));
    }

    let mut charts_html = String::from("<div class=\"charts\">\n");
    for (_, svg) in charts.files() {
        charts_html.push_str(svg);
        charts_html.push('\n');
    }
    charts_html.push_str("</div>\n");
    body.push_str(&section("Visualisasi", &charts_html));

    format!(
        "<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n<meta charset=\"utf-8\">\n<title>Dashboard Kepatuhan Pajak</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        PAGE_STYLE, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn computation(rows: Vec<(&str, Vec<f64>)>, months: &[&str]) -> Computation {
        let mut header = vec![Cell::text("TMT"), Cell::text("NAMA OP"), Cell::text("STATUS")];
        header.extend(months.iter().map(|m| Cell::text(*m)));
        let rows = rows
            .into_iter()
            .map(|(name, payments)| {
                let mut row = vec![Cell::text("2023-05-01"), Cell::text(name), Cell::text("AKTIF")];
                row.extend(payments.into_iter().map(Cell::Number));
                row
            })
            .collect();
        let table = Table::from_header_cells(&header, rows);
        compute_compliance(&table, TaxYear::default()).unwrap()
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_xml("A & B <C>"), "A &amp; B &lt;C&gt;");
        assert_eq!(escape_xml("\"x\" 'y'"), "&quot;x&quot; &#39;y&#39;");
    }

    #[test]
    fn charts_of_a_table() {
        let c = computation(
            vec![
                ("A", vec![100.0, 200.0]),
                ("B", vec![0.0, 50.0]),
                ("C & D", vec![0.0, 0.0]),
            ],
            &["JAN 2024", "FEB 2024"],
        );
        let charts = DashboardCharts::build(c.table());
        let names: Vec<&str> = charts.files().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec![TREND_FILE, PIE_FILE, BAR_FILE, SPREAD_FILE]);

        let trend = charts.trend.clone().unwrap();
        assert!(trend.contains("<polyline"));
        assert!(trend.contains("JAN 2024"));
        assert!(trend.contains("Rp 250"));

        // All three taxpayers are in the lowest tier.
        assert!(charts.pie.contains("<circle"));
        assert!(charts.pie.contains("Kurang Patuh (100.0%)"));
        assert!(!charts.pie.contains("Cukup Patuh"));
        assert!(charts.spread.contains("Kurang Patuh"));
    }

    #[test]
    fn charts_without_payments() {
        let c = computation(vec![("A", vec![])], &[]);
        let charts = DashboardCharts::build(c.table());
        assert!(charts.trend.is_none());
        assert_eq!(charts.files().len(), 3);
        assert!(charts.bar.contains("Tidak ada data"));
        assert!(charts.pie.contains("Tidak ada data"));
    }

    #[test]
    fn pie_slices() {
        let svg = pie_chart_svg(&[
            (ComplianceTier::Patuh, 3),
            (ComplianceTier::KurangPatuh, 1),
        ]);
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("Patuh (75.0%)"));
        assert!(svg.contains("Kurang Patuh (25.0%)"));
    }

    #[test]
    fn page() {
        let c = computation(vec![("PT <Satu>", vec![100.0])], &["JAN 2024"]);
        let charts = DashboardCharts::build(c.table());
        let page = dashboard_page("Setoran", &c, &charts, 5);
        assert!(page.contains("PT &lt;Satu&gt;"));
        assert!(page.contains("Top 5 Pembayar Tertinggi"));
        assert!(page.contains(io_export::DEFAULT_EXPORT_FILE));
        assert!(page.contains("KLASIFIKASI KEPATUHAN"));
        assert!(!page.contains("class=\"warning\""));

        let partial = computation(vec![("A", vec![])], &[]);
        let charts = DashboardCharts::build(partial.table());
        let page = dashboard_page("Setoran", &partial, &charts, 5);
        assert!(page.contains("class=\"warning\""));
        assert!(!page.contains("Top 5"));
    }
}
