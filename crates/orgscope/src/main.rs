mod cli;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use orgscope_core::{report_file_name, Config, OrganizationProcessor, ProcessOutput, Storage};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orgscope_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(strategy) = cli.strategy {
        config.strategy = strategy;
    }

    match cli.command {
        Commands::Process { names } => run_process(&config, &names).await,
        Commands::Report {
            topic,
            max_results,
            output,
        } => run_report(&config, &topic, max_results, output).await,
        Commands::Search { query, max_results } => run_search(&config, &query, max_results).await,
        Commands::Interactive => run_interactive(&config).await,
    }
}

async fn processor(config: &Config) -> Result<OrganizationProcessor> {
    let client = config.http_client()?;
    let storage = Storage::open(&config.database_path)
        .await
        .with_context(|| format!("opening database {}", config.database_path))?;
    Ok(config.processor(storage, &client)?)
}

fn print_summary(output: &ProcessOutput) {
    println!(
        "Processed '{}': {} members, {} new news articles ({} unchanged), {} of {} chunks extracted",
        output.name,
        output.stats.members,
        output.stats.articles_written,
        output.stats.articles_skipped,
        output.stats.chunks - output.stats.skipped_chunks,
        output.stats.chunks,
    );
}

async fn run_process(config: &Config, names: &[String]) -> Result<()> {
    let processor = processor(config).await?;

    let mut failed = 0;
    for name in names {
        match processor.process(name).await {
            Ok(output) => print_summary(&output),
            Err(e) => {
                eprintln!("Error processing '{name}': {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} organizations failed", names.len());
    }
    Ok(())
}

async fn run_report(
    config: &Config,
    topic: &str,
    max_results: usize,
    output: Option<PathBuf>,
) -> Result<()> {
    let client = config.http_client()?;
    let Some(generator) = config.report_generator(&client) else {
        bail!("report generation requires GOOGLE_API_KEY, GOOGLE_CSE_ID and GROQ_API_KEY");
    };

    let report = generator.generate(topic, max_results).await?;

    let path = output.unwrap_or_else(|| PathBuf::from(report_file_name(topic)));
    report.save(&path)?;

    println!("{}", report.report);
    eprintln!("Report saved to {}", path.display());
    Ok(())
}

async fn run_search(config: &Config, query: &str, max_results: usize) -> Result<()> {
    let client = config.http_client()?;
    let Some(sources) = config.source_collector(&client) else {
        bail!("web search requires GOOGLE_API_KEY and GOOGLE_CSE_ID");
    };

    let results = sources.try_collect(query, max_results).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn run_interactive(config: &Config) -> Result<()> {
    let processor = processor(config).await?;

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout
            .write_all(b"\nEnter organization name (or 'quit' to exit): ")
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let name = line.trim();
        if name.eq_ignore_ascii_case("quit") {
            break;
        }
        if name.is_empty() {
            continue;
        }

        match processor.process(name).await {
            Ok(output) => print_summary(&output),
            Err(e) => eprintln!("Error processing organization: {e}"),
        }
    }

    Ok(())
}
