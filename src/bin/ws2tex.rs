//! CLI binary for worksheet2tex.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and writes the `.tex` file.

use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use worksheet2tex::{convert, ConversionConfig, RasterBackend};

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a saved book page, images go to ./images
  ws2tex book.html -o book.tex

  # Download the page, Hungarian captions, everything under build/
  ws2tex https://www.geogebra.org/book/title/id/123 --lang hu --work-dir build -o build/book.tex

  # No ImageMagick on this machine
  ws2tex book.html --raster builtin -o book.tex

  # Summary as JSON
  ws2tex book.html -o book.tex --json

ENVIRONMENT VARIABLES:
  RUST_LOG   Overrides the log filter derived from -v
"#;

/// Convert worksheet books to LaTeX.
#[derive(Parser, Debug)]
#[command(
    name = "ws2tex",
    version,
    about = "Convert worksheet books (HTML) to LaTeX",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file path or HTTP/HTTPS URL.
    input: String,

    /// Write LaTeX to this file instead of stdout.
    #[arg(short, long, env = "WS2TEX_OUTPUT")]
    output: Option<PathBuf>,

    /// Document language as a two-letter code (en, hu, de, de_AT).
    #[arg(long = "lang", env = "WS2TEX_LANG", default_value = "en")]
    language: String,

    /// Directory the image directory is created in.
    #[arg(long, env = "WS2TEX_WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Image directory, relative to the work dir.
    #[arg(long, env = "WS2TEX_IMAGE_DIR", default_value = "images")]
    image_dir: String,

    /// Drop [color] markup instead of rendering it.
    #[arg(long)]
    no_color: bool,

    /// Do not append citation markers and a bibliography.
    #[arg(long)]
    no_references: bool,

    /// Keep LaTeX's default paragraph indentation.
    #[arg(long)]
    indent: bool,

    /// Download every image again even when a cached copy exists.
    #[arg(long)]
    no_cache: bool,

    /// Wrap translated text at 75 columns.
    #[arg(long)]
    word_wrap: bool,

    /// Raster normalization backend.
    #[arg(long, value_enum, default_value = "imagemagick")]
    raster: RasterArg,

    /// ImageMagick program used by the imagemagick backend.
    #[arg(long, env = "WS2TEX_CONVERT", default_value = "convert")]
    convert_program: String,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "WS2TEX_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Diagnostic output; repeat for more detail (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the conversion summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum RasterArg {
    Imagemagick,
    Builtin,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info,worksheet2tex=debug",
        _ => "info,worksheet2tex=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let raster = match cli.raster {
        RasterArg::Imagemagick => RasterBackend::ImageMagick {
            program: cli.convert_program.clone(),
        },
        RasterArg::Builtin => RasterBackend::Builtin,
    };
    let config = ConversionConfig::builder()
        .iso639_language(&cli.language)
        .verbosity(cli.verbose)
        .work_dir(&cli.work_dir)
        .image_dir(&cli.image_dir)
        .text_color(!cli.no_color)
        .references(!cli.no_references)
        .no_indent(!cli.indent)
        .image_cache(!cli.no_cache)
        .word_wrap(cli.word_wrap)
        .raster(raster)
        .download_timeout_secs(cli.download_timeout)
        .build()
        .context("Invalid configuration")?;

    // ── Convert ──────────────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .with_context(|| format!("Failed to convert {}", cli.input))?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &output.latex)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None if !cli.json => print!("{}", output.latex),
        None => {}
    }

    if cli.json {
        let summary = serde_json::json!({
            "metadata": output.metadata,
            "references": output.references,
            "stats": output.stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        let s = &output.stats;
        eprintln!(
            "{} worksheet(s), {} figure(s), {} reference(s), {} image failure(s) in {:.1}s",
            s.worksheets,
            s.images.figures,
            s.references,
            s.images.failed,
            s.total_duration_ms as f64 / 1000.0
        );
    }

    Ok(())
}
