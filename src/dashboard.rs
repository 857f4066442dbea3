use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use tax_compliance::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::dashboard::config_reader::*;

pub mod charts;
pub mod io_excel;
pub mod io_export;
pub mod render;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DashboardError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} does not contain any worksheet"))]
    EmptyWorkbook { path: String },
    #[snafu(display(
        "The workbook contains several worksheets, choose one with --sheet: {}",
        available.join(", ")
    ))]
    AmbiguousSheet { available: Vec<String> },
    #[snafu(display(
        "The workbook has no worksheet named {sheet:?}, available worksheets: {}",
        available.join(", ")
    ))]
    MissingSheet {
        sheet: String,
        available: Vec<String>,
    },
    #[snafu(display("The worksheet {sheet:?} is empty"))]
    EmptySheet { sheet: String },
    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing workbook {path}"))]
    WritingExcel {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Missing parent directory for {path}"))]
    MissingParentDir { path: String },
    #[snafu(context(false), display("{source}"))]
    Compliance { source: ComplianceError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

impl DashboardError {
    /// The message shown to the user when the run stops on this error.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Compliance { source } => render::blocking_message(source),
            other => other.to_string(),
        }
    }

    /// A missing required column is a problem with the input file, not with the program.
    pub fn exit_code(&self) -> i32 {
        match self {
            DashboardError::Compliance {
                source: ComplianceError::MissingRequiredColumn { .. },
            } => 2,
            _ => 1,
        }
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

pub mod config_reader {
    use crate::dashboard::*;

    #[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
    pub struct DashboardConfig {
        #[serde(rename = "inputFile")]
        pub input_file: Option<String>,
        #[serde(rename = "sheetName")]
        pub sheet_name: Option<String>,
        #[serde(rename = "taxYear")]
        pub tax_year: Option<u16>,
        #[serde(rename = "outputDirectory")]
        pub output_directory: Option<String>,
        #[serde(rename = "exportFile")]
        pub export_file: Option<String>,
        #[serde(rename = "summaryFile")]
        pub summary_file: Option<String>,
        #[serde(rename = "topN")]
        pub top_n: Option<usize>,
    }

    impl DashboardConfig {
        /// Interprets the relative paths of the configuration as relative to `root`.
        pub fn resolve_paths(self, root: &Path) -> DashboardConfig {
            let resolve = |p: Option<String>| p.map(|p| resolve_path(root, &p));
            DashboardConfig {
                input_file: resolve(self.input_file),
                output_directory: resolve(self.output_directory),
                export_file: resolve(self.export_file),
                summary_file: self.summary_file.map(|p| {
                    if p == "stdout" {
                        p
                    } else {
                        resolve_path(root, &p)
                    }
                }),
                ..self
            }
        }
    }

    fn resolve_path(root: &Path, p: &str) -> String {
        let path = Path::new(p);
        if path.is_absolute() {
            p.to_string()
        } else {
            root.join(path).display().to_string()
        }
    }

    pub fn read_config(path: &str) -> DashboardResult<DashboardConfig> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        debug!("read_config: content: {:?}", contents);
        let config: DashboardConfig =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        let root = Path::new(path)
            .parent()
            .context(MissingParentDirSnafu { path })?;
        Ok(config.resolve_paths(root))
    }

    pub fn read_summary(path: &str) -> DashboardResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
        debug!("read_summary: content: {:?}", contents);
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }
}

/// The options of one run, after merging the command line and the configuration file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub input: Option<String>,
    pub sheet: Option<String>,
    pub list_sheets: bool,
    pub year: TaxYear,
    pub summary_out: Option<String>,
    pub export: Option<String>,
    pub dashboard_dir: Option<String>,
    pub top_n: usize,
    pub template: Option<String>,
    pub reference: Option<String>,
}

pub fn build_settings(args: &Args, config: &DashboardConfig) -> DashboardResult<RunSettings> {
    let year = match args.year.or(config.tax_year) {
        Some(y) => TaxYear::new(y)?,
        None => TaxYear::default(),
    };
    Ok(RunSettings {
        input: args.input.clone().or_else(|| config.input_file.clone()),
        sheet: args.sheet.clone().or_else(|| config.sheet_name.clone()),
        list_sheets: args.list_sheets,
        year,
        summary_out: args.out.clone().or_else(|| config.summary_file.clone()),
        export: args.export.clone().or_else(|| config.export_file.clone()),
        dashboard_dir: args
            .dashboard
            .clone()
            .or_else(|| config.output_directory.clone()),
        top_n: args.top.or(config.top_n).unwrap_or(DEFAULT_TOP_N),
        template: args.template.clone(),
        reference: args.reference.clone(),
    })
}

fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn results_to_json(table: &ComplianceTable, top_n: usize) -> JSValue {
    let agg = aggregates(table);

    let mut tiers: JSMap<String, JSValue> = JSMap::new();
    for (tier, count) in tier_counts(table) {
        tiers.insert(tier.label().to_string(), json!(count));
    }

    let top: Vec<JSValue> = top_payers(table, top_n)
        .iter()
        .filter_map(|r| r.metrics.as_ref().map(|m| (r, m)))
        .map(|(r, m)| {
            json!({
                "name": r.name,
                "status": r.status,
                "totalPayment": m.total_payment,
                "compliancePct": round2(m.compliance_pct),
                "tier": m.tier.label(),
            })
        })
        .collect();

    let trend: Vec<JSValue> = monthly_trend(table)
        .iter()
        .map(|p| json!({"month": p.label, "total": p.total}))
        .collect();

    json!({
        "recordCount": agg.record_count,
        "totalPayment": agg.total_payment,
        "meanPayment": agg.mean_payment.map(round2),
        "paymentColumns": table.payment_columns,
        "tierCounts": tiers,
        "topPayers": top,
        "monthlyTrend": trend,
    })
}

pub fn build_summary_js(settings: &RunSettings, sheet: &str, computation: &Computation) -> JSValue {
    let table = computation.table();
    let warnings: Vec<String> = computation.warnings().iter().map(|w| w.to_string()).collect();
    json!({
        "config": {
            "input": settings.input.as_deref().map(simplify_file_name),
            "sheet": sheet,
            "taxYear": table.tax_year.value(),
        },
        "warnings": warnings,
        "results": results_to_json(table, settings.top_n),
    })
}

fn write_summary(dest: &str, pretty_js: &str) -> DashboardResult<()> {
    if dest == "stdout" {
        println!("{}", pretty_js);
        return Ok(());
    }
    fs::write(dest, pretty_js).context(WritingFileSnafu { path: dest })?;
    info!("Summary written to {}", dest);
    Ok(())
}

fn write_dashboard(dir: &str, sheet: &str, computation: &Computation, top_n: usize) -> DashboardResult<()> {
    let table = computation.table();
    fs::create_dir_all(dir).context(WritingFileSnafu { path: dir })?;
    let dir_p = PathBuf::from(dir);

    let export_p = dir_p.join(io_export::DEFAULT_EXPORT_FILE);
    io_export::write_result(table, &export_p.display().to_string())?;

    let charts = charts::DashboardCharts::build(table);
    for (file_name, svg) in charts.files() {
        let p = dir_p.join(file_name).display().to_string();
        fs::write(&p, svg).context(WritingFileSnafu { path: p.clone() })?;
        debug!("write_dashboard: wrote {}", p);
    }

    let page = charts::dashboard_page(sheet, computation, &charts, top_n);
    let page_p = dir_p.join("dashboard.html").display().to_string();
    fs::write(&page_p, page).context(WritingFileSnafu {
        path: page_p.clone(),
    })?;
    info!("Dashboard written to {}", page_p);
    Ok(())
}

/// Checks the computed summary against a reference summary.
fn check_reference(reference_path: &str, pretty_js_stats: &str) -> DashboardResult<()> {
    let summary_ref = read_summary(reference_path)?;
    debug!("check_reference: reference: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between computed summary and reference summary")
    }
    info!("The computed summary matches the reference {}", reference_path);
    Ok(())
}

/// Runs the whole pipeline for one workbook: read, compute, render, export.
pub fn run_dashboard(settings: &RunSettings) -> DashboardResult<()> {
    if let Some(template_p) = settings.template.as_deref() {
        io_export::write_template(template_p, settings.year)?;
        println!("{}", render::template_written(template_p));
        return Ok(());
    }

    let input_p = match settings.input.as_deref() {
        Some(p) => p,
        None => {
            println!("{}", render::no_input_hint());
            return Ok(());
        }
    };

    info!("Attempting to read workbook {:?}", input_p);
    let sheet_names = io_excel::sheet_names(input_p)?;
    if settings.list_sheets {
        for name in sheet_names.iter() {
            println!("{}", name);
        }
        return Ok(());
    }

    let sheet = io_excel::select_sheet(input_p, &sheet_names, settings.sheet.as_deref())?;
    let table = io_excel::read_table(input_p, &sheet)?;
    info!(
        "Read {} rows and {} columns from worksheet {:?}",
        table.num_rows(),
        table.columns.len(),
        sheet
    );

    let computation = compute_compliance(&table, settings.year)?;
    for w in computation.warnings() {
        warn!("{}", w);
        eprintln!("{}", render::warning_message(&w));
    }

    print!("{}", render::terminal_report(&computation, settings.top_n));

    if let Some(export_p) = settings.export.as_deref() {
        io_export::write_result(computation.table(), export_p)?;
        println!("{}", render::export_written(export_p));
    }

    if let Some(dir) = settings.dashboard_dir.as_deref() {
        write_dashboard(dir, &sheet, &computation, settings.top_n)?;
    }

    let result_js = build_summary_js(settings, &sheet, &computation);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    if let Some(out) = settings.summary_out.as_deref() {
        write_summary(out, &pretty_js_stats)?;
    }

    // The reference summary, if provided for comparison
    if let Some(reference_p) = settings.reference.as_deref() {
        check_reference(reference_p, &pretty_js_stats)?;
    }

    Ok(())
}

pub fn run(args: &Args) -> DashboardResult<()> {
    let config = match args.config.as_deref() {
        Some(p) => read_config(p)?,
        None => DashboardConfig::default(),
    };
    debug!("run: config: {:?}", config);
    let settings = build_settings(args, &config)?;
    info!("run: settings: {:?}", settings);
    run_dashboard(&settings)
}
