//! specchunk CLI - specification PDF ingestion tool

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use specchunk::{
    ingest_file_with_options, output_path, write_jsonl, ExtractOptions, IngestOptions,
    IngestionStats, PageExtractor, PageSource, StructureExtractor,
};

#[derive(Parser)]
#[command(name = "specchunk")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Ingest specification PDFs into JSONL chunk files", long_about = None)]
struct Cli {
    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a PDF, or every PDF in a directory
    Ingest {
        /// Input PDF file or directory
        #[arg(value_name = "PATH")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "data/processed")]
        output: PathBuf,

        /// Product name shown in chunk headers (e.g. "eMMC")
        #[arg(long, env = "SPECCHUNK_PRODUCT")]
        product: Option<String>,

        /// Random chunk ids instead of deterministic ones
        #[arg(long)]
        random_ids: bool,

        /// Fail a document on the first page-level extraction error
        #[arg(long)]
        strict: bool,

        /// Write only the searchable chunks
        #[arg(long)]
        searchable_only: bool,

        /// Number of documents processed in parallel
        #[arg(short = 'j', long, value_name = "N")]
        jobs: Option<usize>,
    },

    /// Show the outline and resolved section structure of a PDF
    Toc {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Ingest {
            input,
            output,
            product,
            random_ids,
            strict,
            searchable_only,
            jobs,
        } => {
            let mut options = IngestOptions::new();
            if let Some(product) = product {
                options = options.with_product(product);
            }
            if random_ids {
                options = options.random_ids();
            }
            if strict {
                options = options.strict();
            }
            cmd_ingest(&input, &output, &options, searchable_only, jobs)
        }
        Commands::Toc { input } => cmd_toc(&input),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// PDF files to ingest: the input itself, or the `.pdf` files of a directory in name order.
fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = fs::read_dir(input)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(format!("No PDF files found in {}", input.display()).into());
    }
    Ok(files)
}

/// Ingest one document and write its chunk file.
fn ingest_one(
    path: &Path,
    output: &Path,
    options: &IngestOptions,
    searchable_only: bool,
) -> specchunk::Result<(PathBuf, IngestionStats)> {
    let result = ingest_file_with_options(path, options)?;
    let target = output_path(output, &result.source);
    if searchable_only {
        write_jsonl(&target, result.searchable_chunks())?;
    } else {
        write_jsonl(&target, result.chunks())?;
    }
    Ok((target, result.stats()))
}

fn cmd_ingest(
    input: &Path,
    output: &Path,
    options: &IngestOptions,
    searchable_only: bool,
    jobs: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = collect_inputs(input)?;
    fs::create_dir_all(output)?;
    log::info!("Ingesting {} document(s) into {}", files.len(), output.display());

    if let Some(jobs) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .build_global()?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let started = Instant::now();
    let outcomes: Vec<_> = files
        .par_iter()
        .map(|path| {
            pb.set_message(path.file_name().unwrap_or_default().to_string_lossy().to_string());
            let outcome = ingest_one(path, output, options, searchable_only);
            pb.inc(1);
            (path, outcome)
        })
        .collect();
    pb.finish_and_clear();

    let mut failed = 0;
    for (path, outcome) in &outcomes {
        match outcome {
            Ok((target, stats)) => print_stats(path, target, stats),
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", "Failed".red().bold(), path.display(), e);
            }
        }
    }

    println!(
        "\n{} {} of {} documents in {:.1}s",
        "Done!".green().bold(),
        outcomes.len() - failed,
        outcomes.len(),
        started.elapsed().as_secs_f32()
    );

    if failed > 0 {
        return Err(format!("{} document(s) failed", failed).into());
    }
    Ok(())
}

fn print_stats(input: &Path, target: &Path, stats: &IngestionStats) {
    println!("{}", input.display().to_string().cyan().bold());
    println!("  {} {}", "├─ output:".dimmed(), target.display());
    println!(
        "  {} total {}, searchable {}, front matter {}, filtered {}",
        "├─ chunks:".dimmed(),
        stats.total,
        stats.searchable.to_string().green(),
        stats.front_matter,
        stats.short_filtered.to_string().yellow()
    );
    let by_type: Vec<String> = stats
        .by_type
        .iter()
        .map(|(content_type, count)| format!("{} {}", content_type, count))
        .collect();
    println!("  {} {}", "└─ by type:".dimmed(), by_type.join(", "));
}

fn cmd_toc(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let extractor = PageExtractor::open(input, ExtractOptions::default())?;
    let toc = extractor.toc()?;
    let structure = StructureExtractor::new().extract(&toc, extractor.page_count());

    println!("{}", "Document".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Source".bold(), extractor.source());
    println!("{}: {}", "Version".bold(), extractor.version());
    println!("{}: {}", "Pages".bold(), structure.total_pages);
    println!("{}: {}", "Body starts".bold(), structure.body_start_page);

    println!();
    println!("{}", "Sections".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for section in &structure.sections {
        let indent = "  ".repeat(section.level.saturating_sub(1) as usize);
        let pages = format!("p{}-{}", section.page_start, section.page_end);
        let label = if section.is_front_matter {
            section.label().dimmed().to_string()
        } else {
            section.label()
        };
        println!("{}{} {}", indent, label, pages.dimmed());
    }

    if toc.is_empty() {
        println!("{}", "No outline found".yellow());
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "specchunk".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Specification PDF ingestion tool");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = collect_inputs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn test_collect_inputs_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_inputs(dir.path()).is_err());
    }

    #[test]
    fn test_collect_inputs_single_file() {
        let files = collect_inputs(Path::new("spec.pdf")).unwrap();
        assert_eq!(files, vec![PathBuf::from("spec.pdf")]);
    }

    #[test]
    fn test_cli_parses_ingest_flags() {
        let cli = Cli::try_parse_from([
            "specchunk", "ingest", "docs", "-o", "out", "--product", "eMMC", "--strict", "-j", "2",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest {
                input,
                output,
                product,
                strict,
                random_ids,
                jobs,
                ..
            } => {
                assert_eq!(input, PathBuf::from("docs"));
                assert_eq!(output, PathBuf::from("out"));
                assert_eq!(product.as_deref(), Some("eMMC"));
                assert!(strict);
                assert!(!random_ids);
                assert_eq!(jobs, Some(2));
            }
            _ => panic!("expected ingest"),
        }
    }
}
