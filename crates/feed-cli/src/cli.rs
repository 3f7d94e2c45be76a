//! Command-line arguments for `feed-check`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use feed_cli::pipeline::FieldValue;
use feed_model::DEFAULT_DATE_FORMAT;
use feed_transform::CorrectionMode;

#[derive(Parser)]
#[command(
    name = "feed-check",
    version,
    about = "Validate and correct product feeds against per-field rules",
    long_about = "Load a product feed (CSV/TSV, YML/XML offers or JSON), normalize it into \
                  records, check every value against a JSON rule configuration and run \
                  feed-level integrity checks.\n\n\
                  Violations can be corrected automatically or marked for manual review."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow cell values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a feed, optionally correct it, and report the results.
    Check(CheckArgs),

    /// List the fields discovered in a feed.
    Fields(SourceArgs),

    /// Validate a rule configuration and print the rules it defines.
    Rules(RulesArgs),
}

#[derive(Parser)]
pub struct SourceArgs {
    /// Feed file to load.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Declared input format (csv, tsv, xml, yml, json); inferred from the extension otherwise.
    #[arg(long = "format", value_name = "FORMAT")]
    pub format: Option<String>,

    /// Unit-of-record element of XML/YML feeds, or the key wrapping JSON records.
    #[arg(long = "container", value_name = "NAME")]
    pub container: Option<String>,
}

#[derive(Parser)]
pub struct CheckArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// JSON rule configuration.
    #[arg(long = "rules", value_name = "JSON")]
    pub rules: PathBuf,

    /// Fields every record must carry.
    #[arg(
        long = "mandatory",
        value_name = "FIELDS",
        value_delimiter = ',',
        default_value = "name,SKU,price"
    )]
    pub mandatory: Vec<String>,

    /// Field whose values must be unique across records.
    #[arg(long = "key", value_name = "FIELD", default_value = "SKU")]
    pub key: String,

    /// Field that must not be blank.
    #[arg(long = "category-field", value_name = "FIELD", default_value = "category")]
    pub category_field: String,

    /// Skip the feed-level integrity checks.
    #[arg(long = "no-integrity")]
    pub no_integrity: bool,

    /// How to treat violating values.
    #[arg(long = "correct", value_enum, default_value = "none")]
    pub correct: CorrectArg,

    /// Date field to normalize before validation.
    #[arg(long = "date-field", value_name = "FIELD")]
    pub date_field: Option<String>,

    /// Output format of normalized dates (strftime).
    #[arg(long = "date-format", value_name = "FORMAT", default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,

    /// Replace blank values of FIELD with VALUE before validation (repeatable).
    #[arg(long = "fill-blank", value_name = "FIELD=VALUE")]
    pub fill_blank: Vec<FieldValue>,

    /// Only check records whose FIELD equals VALUE.
    #[arg(long = "where", value_name = "FIELD=VALUE")]
    pub filter: Option<FieldValue>,

    /// Field identifying a record in the report.
    #[arg(long = "id-field", value_name = "FIELD", default_value = "id")]
    pub id_field: String,

    /// Where to write the corrected feed (default: <SOURCE stem>_new.<ext>).
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the validation report here (.json for JSON, text otherwise).
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RulesArgs {
    /// JSON rule configuration.
    #[arg(value_name = "JSON")]
    pub rules: PathBuf,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CorrectArg {
    /// Replace violating values with the rule default or the kind's zero value.
    Auto,
    /// Mark violating values for manual review.
    Review,
    /// Report only.
    None,
}

impl CorrectArg {
    pub fn mode(self) -> Option<CorrectionMode> {
        match self {
            CorrectArg::Auto => Some(CorrectionMode::Automatic),
            CorrectArg::Review => Some(CorrectionMode::ManualReview),
            CorrectArg::None => None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
