use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pdfgraft::{
    compress_document_with, merge_documents, parse_page_numbers, pdf_to_text_document,
    split_document, CompressOptions, Document, PdfError, PlainTextWriter,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Largest input accepted unless overridden
const DEFAULT_MAX_INPUT_SIZE: u64 = 20 * 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "pdfgraft",
    about = "Merge, split and compact PDF documents",
    version,
    author
)]
struct Cli {
    /// Largest input file accepted, in bytes
    #[arg(
        long,
        global = true,
        env = "PDFGRAFT_MAX_INPUT_SIZE",
        default_value_t = DEFAULT_MAX_INPUT_SIZE
    )]
    max_input_size: u64,

    /// Log more (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge PDFs into one
    Merge {
        /// Input PDF files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// 0-based file indices in output order, repeats allowed (e.g. "1,0,1")
        #[arg(long, value_delimiter = ',')]
        order: Option<Vec<usize>>,
    },

    /// Build a PDF from selected pages of another
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// 1-based pages in output order (e.g. "3,3,1-2")
        #[arg(short, long)]
        pages: String,
    },

    /// Rewrite a PDF with object streams and blank metadata
    Compress {
        /// Input PDF file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Desired output size in bytes (advisory)
        #[arg(long)]
        target_size: Option<u64>,
    },

    /// Get information about a PDF file
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// Extract text from a PDF file
    ExtractText {
        /// Input PDF file
        input: PathBuf,

        /// Output text file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let limit = cli.max_input_size;

    match cli.command {
        Commands::Merge {
            files,
            output,
            order,
        } => {
            let sources = files
                .iter()
                .map(|path| read_input(path, limit))
                .collect::<Result<Vec<_>>>()?;
            let merged = merge_documents(&sources, order.as_deref()).map_err(|e| {
                let context = match &e {
                    PdfError::SourceParse { index, .. } => match files.get(*index) {
                        Some(path) => format!("Failed to parse {}", path.display()),
                        None => "Failed to parse input".to_string(),
                    },
                    _ => "Failed to merge PDFs".to_string(),
                };
                anyhow::Error::new(e).context(context)
            })?;
            write_output(&output, &merged)?;
            println!("✓ Merged {} files into {}", files.len(), output.display());
        }

        Commands::Split {
            input,
            output,
            pages,
        } => {
            let numbers = parse_page_numbers(&pages)
                .with_context(|| format!("Invalid page list '{pages}'"))?;
            let source = read_input(&input, limit)?;
            let split = split_document(&source, &numbers)
                .with_context(|| format!("Failed to split {}", input.display()))?;
            write_output(&output, &split)?;
            println!("✓ Wrote selected pages to {}", output.display());
        }

        Commands::Compress {
            input,
            output,
            target_size,
        } => {
            let source = read_input(&input, limit)?;
            let mut options = CompressOptions::default();
            if let Some(target) = target_size {
                options = options.with_target_size(target);
            }
            let compressed = compress_document_with(&source, &options)
                .with_context(|| format!("Failed to compress {}", input.display()))?;
            write_output(&output, &compressed)?;
            println!(
                "✓ Compressed {} bytes to {} bytes in {}",
                source.len(),
                compressed.len(),
                output.display()
            );
        }

        Commands::Info { input } => {
            let source = read_input(&input, limit)?;
            let mut document = Document::parse(&source)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            let metadata = document
                .metadata()
                .with_context(|| format!("Failed to read metadata of {}", input.display()))?;

            println!("PDF Information for: {}", input.display());
            println!("==========================================");
            println!("PDF Version: {}", document.version());
            println!("Pages: {}", document.page_count());
            println!("Objects: {}", document.object_count());

            let fields = [
                ("Title", &metadata.title),
                ("Author", &metadata.author),
                ("Subject", &metadata.subject),
                ("Keywords", &metadata.keywords),
                ("Creator", &metadata.creator),
                ("Producer", &metadata.producer),
                ("Created", &metadata.creation_date),
                ("Modified", &metadata.modification_date),
            ];
            for (label, value) in fields {
                if let Some(value) = value {
                    println!("{label}: {value}");
                }
            }
        }

        Commands::ExtractText { input, output } => {
            let source = read_input(&input, limit)?;
            let text = pdf_to_text_document(&source, &mut PlainTextWriter::new())
                .with_context(|| format!("Failed to extract text from {}", input.display()))?;

            match output {
                Some(path) => {
                    write_output(&path, &text)?;
                    println!("✓ Text extracted to: {}", path.display());
                }
                None => print!("{}", String::from_utf8_lossy(&text)),
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Reads an input file, refusing anything larger than `limit` bytes
fn read_input(path: &Path, limit: u64) -> Result<Vec<u8>> {
    let size = fs::metadata(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .len();
    if size > limit {
        bail!(
            "{} is {} bytes, larger than the {} byte limit",
            path.display(),
            size,
            limit
        );
    }
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::debug!("Read {} bytes from {}", data.len(), path.display());
    Ok(data)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
