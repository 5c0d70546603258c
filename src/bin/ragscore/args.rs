use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ragscore::dataset::DatasetFormat;
use ragscore::evaluators::CategorySelection;

#[derive(Parser, Debug)]
#[command(name = "ragscore")]
#[command(about = "Batch evaluation of question/answer datasets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score every dataset row with the selected evaluators
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Path to the input dataset
    #[arg(short, long)]
    pub input: PathBuf,

    /// Input file format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Evaluator categories to run
    #[arg(short, long, value_enum, default_value = "both")]
    pub categories: CategoriesArg,

    /// Output file for results (one JSON record per row)
    #[arg(short, long, default_value = "results.jsonl")]
    pub output: PathBuf,

    /// Rows evaluated in flight at once
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Attempts per evaluator call, including the first
    #[arg(long, default_value_t = 1)]
    pub max_attempts: usize,

    /// Limit number of rows to process
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Csv,
    Xlsx,
}

impl From<FormatArg> for DatasetFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => DatasetFormat::Csv,
            FormatArg::Xlsx => DatasetFormat::Xlsx,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoriesArg {
    Quality,
    Safety,
    Both,
}

impl From<CategoriesArg> for CategorySelection {
    fn from(arg: CategoriesArg) -> Self {
        match arg {
            CategoriesArg::Quality => CategorySelection::Quality,
            CategoriesArg::Safety => CategorySelection::Safety,
            CategoriesArg::Both => CategorySelection::Both,
        }
    }
}
