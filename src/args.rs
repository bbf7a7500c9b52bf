use clap::Parser;

/// Converts the pair of NHI family-physician CSV exports into fixed-width
/// FM.txt upload files.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The full-year visit roster CSV with the patient demographics
    /// (the "long" layout).
    #[clap(long, value_parser)]
    pub long: String,

    /// (file path) The NHI download list CSV with the case metadata
    /// (the "short" layout).
    #[clap(long, value_parser)]
    pub short: String,

    /// (file path, optional) JSON file with the constant parameters that apply to
    /// every record. When not given, the parameters are prompted for interactively.
    #[clap(short, long, value_parser)]
    pub params: Option<String>,

    /// (directory) Destination directory for the FM.txt file(s).
    #[clap(short, long, value_parser, default_value = "output")]
    pub outdir: String,

    /// Write the output in UTF-8 instead of the default Big-5.
    #[clap(long, takes_value = false, conflicts_with = "big5")]
    pub utf8: bool,

    /// Write the output in Big-5. This is already the default; the switch exists so
    /// scripts can state the encoding explicitly.
    #[clap(long, takes_value = false)]
    pub big5: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
