use clap::Parser;

/// This is a tax payment compliance dashboard.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The Excel workbook (.xlsx) containing the tax deposit records. If not provided, kepatuhan will
    /// explain how to obtain the sample template.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (sheet name) The worksheet to process. It may be omitted when the workbook contains a single worksheet.
    #[clap(short, long, value_parser)]
    pub sheet: Option<String>,

    /// If passed as an argument, prints the names of the worksheets of the input and stops.
    #[clap(long, takes_value = false)]
    pub list_sheets: bool,

    /// (default 2024) The tax year. Only 2023, 2024 and 2025 are supported.
    #[clap(short, long, value_parser)]
    pub year: Option<u16>,

    /// (file path, 'stdout' or empty) If specified, the summary of the computation will be written in JSON format to
    /// the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) If specified, the computed table is exported to this Excel workbook, in a single
    /// worksheet named 'Result'.
    #[clap(long, value_parser)]
    pub export: Option<String>,

    /// (directory or empty) If specified, the HTML dashboard and its charts (SVG) are written in this directory.
    #[clap(long, value_parser)]
    pub dashboard: Option<String>,

    /// (default 20) The number of taxpayers in the top payers table.
    #[clap(long, value_parser)]
    pub top: Option<usize>,

    /// (file path) Writes an example input workbook to this location and stops.
    #[clap(long, value_parser)]
    pub template: Option<String>,

    /// (file path, optional) A JSON file with the options of the run. The flags of the command line take
    /// precedence over the content of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, kepatuhan will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
