use std::path::PathBuf;

use clap::{Parser, Subcommand};
use orgscope_core::ExtractionStrategy;

#[derive(Parser)]
#[command(
    name = "orgscope",
    about = "Collect, extract and store profiles of organizations and political parties",
    version
)]
pub struct Cli {
    /// SQLite database path
    #[arg(long, global = true, env = "ORGSCOPE_DB")]
    pub db: Option<String>,

    /// Member extraction strategy: pattern or model
    #[arg(long, global = true, env = "ORGSCOPE_STRATEGY")]
    pub strategy: Option<ExtractionStrategy>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Gather, extract and store data for one or more organizations
    Process {
        /// Organization or party names
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Research a topic on the web and write a report with the language model
    Report {
        topic: String,
        /// Number of search results to use
        #[arg(long, default_value_t = 3)]
        max_results: usize,
        /// Output file (defaults to <topic>_report.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search the web and print the extracted content of each hit as JSON
    Search {
        query: String,
        #[arg(long, default_value_t = 3)]
        max_results: usize,
    },
    /// Prompt for organization names until "quit"
    Interactive,
}
