//! PDF Stamper CLI tool
//!
//! A command-line tool for stamping a signature image onto PDF pages.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use pdf_stamper::batch::{run, BatchOptions, StampRequest};
use pdf_stamper::layout::Placement;
use pdf_stamper::pages::PageSpec;
use pdf_stamper::pdf::{extract_metadata, render_overlay, signed_path, stamp_file, SignatureImage};

/// PDF Stamper - Stamp a signature image onto PDF pages
#[derive(Parser)]
#[command(name = "pdf-stamper")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Sign page 2 of every PDF in a folder (writes signed_<name>.pdf)
    pdf-stamper sign --signature sig.png ./contracts

    # Sign pages 1-3 and 7 with a custom position and scale
    pdf-stamper sign --signature sig.png -x 400 -y 90 --scale 0.3 --pages 1-3,7 ./contracts

    # Sign a single file and open the result
    pdf-stamper stamp --signature sig.png --pages 1 --open contract.pdf

    # Check placement before a batch
    pdf-stamper preview --signature sig.png -o preview.pdf")]
struct Cli {
    /// Log progress details (same as RUST_LOG=info)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Position and size of the signature, in points on a Letter page
#[derive(Args, Debug)]
struct PlacementArgs {
    /// X position of the signature's lower-left corner
    #[arg(short = 'x', long, default_value_t = 380, env = "PDF_STAMPER_X", allow_negative_numbers = true)]
    x: i32,

    /// Y position of the signature's lower-left corner
    #[arg(short = 'y', long, default_value_t = 180, env = "PDF_STAMPER_Y", allow_negative_numbers = true)]
    y: i32,

    /// Scale factor applied to the image's pixel size (1 px = 1 pt)
    #[arg(short, long, default_value_t = 0.45, env = "PDF_STAMPER_SCALE")]
    scale: f64,
}

impl PlacementArgs {
    fn placement(&self) -> Result<Placement> {
        Ok(Placement::new(f64::from(self.x), f64::from(self.y), self.scale)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp every PDF in a folder
    Sign {
        /// Folder containing the PDFs (not searched recursively)
        folder: PathBuf,

        /// Signature image (PNG or JPEG)
        #[arg(long)]
        signature: PathBuf,

        #[command(flatten)]
        placement: PlacementArgs,

        /// Pages to stamp, e.g. "2", "1-3", "1,3,5"
        #[arg(short, long, default_value = "2", env = "PDF_STAMPER_PAGES")]
        pages: String,

        /// Prefix for output file names
        #[arg(long, default_value = "signed_")]
        prefix: String,

        /// Only accept the lowercase ".pdf" extension
        #[arg(long)]
        case_sensitive: bool,

        /// Number of files to process in parallel
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
    },

    /// Stamp a single PDF
    Stamp {
        /// Input PDF file
        input: PathBuf,

        /// Signature image (PNG or JPEG)
        #[arg(long)]
        signature: PathBuf,

        /// Output PDF file path (default: signed_<input> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        placement: PlacementArgs,

        /// Pages to stamp, e.g. "2", "1-3", "1,3,5"
        #[arg(short, long, default_value = "2", env = "PDF_STAMPER_PAGES")]
        pages: String,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Write the signature overlay alone as a one-page Letter PDF
    Preview {
        /// Signature image (PNG or JPEG)
        #[arg(long)]
        signature: PathBuf,

        #[command(flatten)]
        placement: PlacementArgs,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Sign {
            folder, signature, placement, pages, prefix, case_sensitive, jobs,
        } => {
            cmd_sign(folder, signature, &placement, pages, prefix, case_sensitive, jobs)
        }
        Commands::Stamp { input, signature, output, placement, pages, open } => {
            cmd_stamp(input, signature, output, &placement, &pages, open).map(|()| 0)
        }
        Commands::Preview { signature, placement, output, open } => {
            cmd_preview(signature, &placement, output, open).map(|()| 0)
        }
        Commands::Info { input } => {
            cmd_info(input).map(|()| 0)
        }
    };

    match result {
        Ok(0) => {}
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Stamp every PDF in a folder; returns the process exit code
fn cmd_sign(
    folder: PathBuf,
    signature: PathBuf,
    placement: &PlacementArgs,
    pages: String,
    prefix: String,
    case_sensitive: bool,
    jobs: usize,
) -> Result<i32> {
    let request = StampRequest {
        signature_path: signature,
        source_folder: folder.clone(),
        placement: placement.placement()?,
        pages,
    };
    let options = BatchOptions {
        output_prefix: prefix,
        case_insensitive_extension: !case_sensitive,
        jobs,
        ..Default::default()
    };

    eprintln!("Signing PDFs in {}...", folder.display());
    let report = run(&request, &options)?;

    for output in report.outputs() {
        eprintln!("  wrote {}", output.display());
    }

    println!("{} signed, {} failed", report.succeeded(), report.failed());
    for failure in report.failures() {
        println!("  {} [{}]: {}", failure.file_name, failure.kind, failure.message);
    }

    Ok(if report.is_success() { 0 } else { 2 })
}

/// Stamp a single PDF
fn cmd_stamp(
    input: PathBuf,
    signature: PathBuf,
    output: Option<PathBuf>,
    placement: &PlacementArgs,
    pages: &str,
    open: bool,
) -> Result<()> {
    let placement = placement.placement()?;
    let pages = PageSpec::parse(pages).context("invalid --pages")?;
    let image = SignatureImage::open(&signature)?;

    let output = match output {
        Some(path) => path,
        None => signed_path(&input, "signed_")?,
    };

    let fragment = render_overlay(&image, &placement)?;
    let summary = stamp_file(&input, &output, &fragment, &pages)
        .with_context(|| format!("failed to stamp {}", input.display()))?;

    if summary.stamped_pages.is_empty() {
        eprintln!(
            "Warning: none of pages {} exist in {} ({} pages); output is unchanged",
            pages,
            input.display(),
            summary.page_count
        );
    }
    eprintln!("Output: {}", output.display());

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Write the overlay as a standalone PDF
fn cmd_preview(signature: PathBuf, placement: &PlacementArgs, output: PathBuf, open: bool) -> Result<()> {
    let placement = placement.placement()?;
    let image = SignatureImage::open(&signature)?;
    let fragment = render_overlay(&image, &placement)?;

    if output.exists() && output.canonicalize()? == signature.canonicalize()? {
        bail!("refusing to overwrite the signature image");
    }
    std::fs::write(&output, fragment.to_pdf_bytes()?)
        .with_context(|| format!("cannot write {}", output.display()))?;

    let bounds = fragment.bounds();
    eprintln!(
        "Signature at ({}, {}), {} x {} pt",
        bounds.x, bounds.y, bounds.width, bounds.height
    );
    eprintln!("Output: {}", output.display());

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let metadata = extract_metadata(&input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);
    if let Ok(all) = PageSpec::all(metadata.page_count as u32) {
        println!("All pages: {}", all);
    }

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}
