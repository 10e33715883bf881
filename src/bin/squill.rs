//! squill — the CLI.
//!
//! ```bash
//! # Full pipeline: parse, introspect against the configured engine, emit
//! squill generate
//!
//! # Validate without writing anything
//! squill check
//!
//! # Parse-only validation, no engine needed
//! squill check --offline
//!
//! # Dump the parsed block model of one file
//! squill inspect queries/users.sql
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;

use squill::prelude::*;

#[derive(Parser)]
#[command(name = "squill")]
#[command(version)]
#[command(about = "Compile annotated SQL into strongly-typed data-access code", long_about = None)]
struct Cli {
    /// Project configuration file
    #[arg(short, long, default_value = "squill.yaml", env = "SQUILL_CONFIG")]
    config: PathBuf,

    /// Error report format
    #[arg(long, value_enum, default_value = "human")]
    report: ReportFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write one typed unit per SQL file
    Generate,
    /// Parse, introspect, and validate without writing anything
    Check {
        /// Skip engine execution; parse and render statements only
        #[arg(long)]
        offline: bool,
    },
    /// Dump the parsed block model of one SQL file as JSON
    Inspect { file: PathBuf },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(&cli).await {
        report_error(&err, cli.report);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = ProjectConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match &cli.command {
        Commands::Inspect { file } => {
            let name = file.display().to_string();
            let text =
                fs::read_to_string(file).with_context(|| format!("failed to read {name}"))?;
            let queries = parse_file(&name, &text, &config.constants)?;
            println!("{}", serde_json::to_string_pretty(&queries)?);
            Ok(())
        }
        Commands::Check { offline: true } => check_offline(&config),
        Commands::Check { offline: false } => pipeline(&config, false).await,
        Commands::Generate => pipeline(&config, true).await,
    }
}

async fn pipeline(config: &ProjectConfig, write: bool) -> Result<()> {
    for path in &config.sql {
        let file = path.display().to_string();
        let text =
            fs::read_to_string(path).with_context(|| format!("failed to read {file}"))?;
        let mut queries = parse_file(&file, &text, &config.constants)?;
        introspect_file(config, &file, &mut queries).await?;
        let json = render_unit(config.language, &file, &queries)?;

        if write {
            fs::create_dir_all(&config.out)?;
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unit");
            let out_path = config.out.join(format!("{stem}.{}.json", config.language));
            fs::write(&out_path, json)?;
            println!(
                "{} {} {} {}",
                "✓".green().bold(),
                file,
                "→".dimmed(),
                out_path.display()
            );
        } else {
            println!(
                "{} {} ({} blocks)",
                "✓".green().bold(),
                file,
                queries.len()
            );
        }
    }
    Ok(())
}

fn check_offline(config: &ProjectConfig) -> Result<()> {
    for path in &config.sql {
        let file = path.display().to_string();
        let text =
            fs::read_to_string(path).with_context(|| format!("failed to read {file}"))?;
        let queries = parse_file(&file, &text, &config.constants)?;
        let parameters: usize = queries.iter().map(|q| q.named.parameters.len()).sum();
        println!(
            "{} {} ({} blocks, {} parameters)",
            "✓".green().bold(),
            file,
            queries.len(),
            parameters
        );
    }
    println!("{}", "offline check passed; column types not verified".dimmed());
    Ok(())
}

fn render_unit(language: Language, file: &str, queries: &[Query]) -> Result<String> {
    let unit = match language {
        Language::Typescript => build_unit(file, queries, &TypeScriptBackend)?,
        Language::Rust => build_unit(file, queries, &RustBackend)?,
        Language::Python => build_unit(file, queries, &PythonBackend)?,
    };
    Ok(serde_json::to_string_pretty(&unit)?)
}

async fn introspect_file(
    config: &ProjectConfig,
    file: &str,
    queries: &mut [Query],
) -> Result<()> {
    match config.engine {
        #[cfg(feature = "duckdb")]
        Engine::Duckdb => {
            let adapter = squill::introspect::duckdb::DuckDbAdapter::open(&config.database)
                .map_err(|e| anyhow::anyhow!("failed to open duckdb database: {e}"))?;
            run_with(file, queries, adapter).await
        }
        #[cfg(not(feature = "duckdb"))]
        Engine::Duckdb => anyhow::bail!(
            "this build has no duckdb support (rebuild with --features duckdb)"
        ),
        #[cfg(feature = "postgres")]
        Engine::Postgres => {
            let adapter =
                squill::introspect::postgres::PostgresAdapter::connect(&config.database)
                    .await
                    .map_err(|e| anyhow::anyhow!("failed to connect to postgres: {e}"))?;
            run_with(file, queries, adapter).await
        }
        #[cfg(not(feature = "postgres"))]
        Engine::Postgres => anyhow::bail!(
            "this build has no postgres support (rebuild with --features postgres)"
        ),
        #[cfg(feature = "sqlite")]
        Engine::Sqlite => {
            let adapter = squill::introspect::sqlite::SqliteAdapter::connect(&config.database)
                .await
                .map_err(|e| anyhow::anyhow!("failed to open sqlite database: {e}"))?;
            run_with(file, queries, adapter).await
        }
        #[cfg(not(feature = "sqlite"))]
        Engine::Sqlite => anyhow::bail!(
            "this build has no sqlite support (rebuild with --features sqlite)"
        ),
    }
}

#[allow(dead_code)] // unused only when every engine feature is disabled
async fn run_with<A: EngineAdapter>(file: &str, queries: &mut [Query], mut adapter: A) -> Result<()> {
    let result = Introspector::new(file).run(queries, &mut adapter).await;
    let closed = adapter.close().await;
    result?;
    closed.map_err(|e| anyhow::anyhow!("failed to close engine connection: {e}"))?;
    Ok(())
}

fn report_error(err: &anyhow::Error, format: ReportFormat) {
    if let Some(squill) = err.downcast_ref::<SquillError>() {
        let report = squill.report();
        match format {
            ReportFormat::Json => {
                if let Ok(json) = serde_json::to_string_pretty(&report) {
                    eprintln!("{json}");
                    return;
                }
            }
            ReportFormat::Human => {
                eprintln!(
                    "{} {}",
                    format!("error[{}]:", report.code).red().bold(),
                    report.message
                );
                if let Some(suggestion) = report.suggestion {
                    eprintln!("  {} {suggestion}", "hint:".yellow());
                }
                if let Some(sql) = report.sql {
                    eprintln!("  {} {sql}", "sql:".dimmed());
                }
                return;
            }
        }
    }
    eprintln!("{} {err:#}", "error:".red().bold());
}
