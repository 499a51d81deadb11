//! CLI binary for pdf2epub.
//!
//! A thin shim over the library crate that maps CLI flags (layered over an
//! optional book profile) to `ConversionConfig` and reports results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2epub::{
    convert, inspect, render_output, write_output, BookProfile, ConversionConfig,
    ConversionProgressCallback, ImageEncoding, OutputFormat, PageSelection, Pdf2EpubError,
    ProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live page bar plus one log line per chapter
/// and per page problem.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_conversion_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reflowing");
        self.bar.set_message("");
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reflowing {total_pages} pages…"))
        ));
    }

    fn on_page_complete(&self, _page_num: usize, _total: usize, _line_count: usize) {
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
        ));
    }

    fn on_chapter(&self, page_num: usize, title: &str) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("§"),
            bold(title),
            dim(&format!("page {page_num}")),
        ));
        self.bar.set_message(title.to_string());
    }

    fn on_conversion_complete(&self, total_pages: usize, chapter_count: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {} pages → {} chapters{}",
            if errors == 0 { green("✔") } else { cyan("⚠") },
            bold(&total_pages.to_string()),
            bold(&chapter_count.to_string()),
            if errors == 0 {
                String::new()
            } else {
                format!("  ({} page problems)", red(&errors.to_string()))
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # EPUB next to the PDF (book.epub)
  pdf2epub book.pdf --title "Influence" --author "Robert B. Cialdini"

  # Chapters start on the first line of a page matching a pattern
  pdf2epub book.pdf --chapter-pattern '^Chapter [0-9]+' --chapter-pattern '^Preface'

  # Headings may appear anywhere in the first 100 lines of a page
  pdf2epub book.pdf --chapter-pattern '^Book [IVX]+' --chapter-window 100

  # Drop running headers
  pdf2epub book.pdf --blacklist 'Progress and Poverty' --blacklist '^Page [0-9]+'

  # Per-book settings kept in a JSON profile; flags override it
  pdf2epub book.pdf --profile influence.json -o influence.epub

  # Plain text, chapter titles included
  pdf2epub book.pdf --format text --text-titles -o book.txt

  # Stats and page diagnostics as JSON
  pdf2epub book.pdf --json > stats.json

  # Inspect PDF metadata only
  pdf2epub --inspect-only book.pdf

PROFILE FILE (JSON):
  {
    "title": "The Problem of Political Authority",
    "author": "Michael Huemer",
    "chapter_patterns": ["^Preface", "^Part", "^[0-9]+$"],
    "blacklist": ["The Problem of Political Authority"],
    "chapter_line_index": 0,
    "cover_page_index": 0
  }

PATTERNS:
  Patterns use Rust regex syntax, which has no look-around. A pattern such as
  '[0-9](?!.)' is rejected; write '^[0-9]+$' instead.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   pdfium shared library (file or directory)
  RUST_LOG          Log filter, e.g. pdf2epub=debug to see every dropped line

EXIT STATUS:
  0 success, 1 input or configuration error, 2 output could not be written
"#;

/// Reflow a PDF book into EPUB or plain text.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2epub",
    version,
    about = "Reflow a paginated PDF book into EPUB or plain text",
    long_about = "Reflow a paginated PDF book into EPUB or plain text. Page text is read line \
by line; running headers and page numbers are dropped, wrapped lines and hyphenated words are \
joined, and chapters are split at lines matching the book's heading patterns.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Output file. Default: the input path with .epub / .txt.
    #[arg(short, long, env = "PDF2EPUB_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format. Default: epub, or text when --output ends in .txt.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Book title.
    #[arg(long)]
    title: Option<String>,

    /// Book author.
    #[arg(long)]
    author: Option<String>,

    /// Book language (BCP 47).
    #[arg(long)]
    language: Option<String>,

    /// Package identifier. Default: "<title>_cleaned".
    #[arg(long)]
    identifier: Option<String>,

    /// Chapter heading pattern (repeatable; first match wins).
    #[arg(long = "chapter-pattern", value_name = "REGEX")]
    chapter_patterns: Vec<String>,

    /// Line pattern to drop (repeatable).
    #[arg(long = "blacklist", value_name = "REGEX")]
    blacklist: Vec<String>,

    /// Test only this 0-indexed line of each page for a heading.
    #[arg(long, value_name = "N", conflicts_with = "chapter_window")]
    chapter_line: Option<usize>,

    /// Test lines 0..=N of each page for a heading.
    #[arg(long, value_name = "N")]
    chapter_window: Option<usize>,

    /// 0-indexed page whose first image becomes the cover.
    #[arg(long, value_name = "N", conflicts_with = "no_cover")]
    cover_page: Option<usize>,

    /// Do not add a cover.
    #[arg(long)]
    no_cover: bool,

    /// Do not inline page images.
    #[arg(long)]
    no_images: bool,

    /// Re-encode images as PNG instead of JPEG.
    #[arg(long)]
    png_images: bool,

    /// Do not repeat a heading line as the first line of its chapter body.
    #[arg(long)]
    skip_heading_line: bool,

    /// Text format only: write chapter titles.
    #[arg(long)]
    text_titles: bool,

    /// JSON book profile; flags override its values.
    #[arg(long, env = "PDF2EPUB_PROFILE")]
    profile: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2EPUB_PASSWORD")]
    password: Option<String>,

    /// Print stats and page diagnostics as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2EPUB_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2EPUB_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2EPUB_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Epub,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Epub => OutputFormat::Epub,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs are noise while the progress bar is up.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", red("error:"), err);
            let code = err
                .chain()
                .find_map(|e| e.downcast_ref::<Pdf2EpubError>())
                .map(Pdf2EpubError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta =
            inspect(&cli.input, cli.password.as_deref()).context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(cli, progress_cb)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input, config.output_format));

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config).context("Conversion failed")?;
    let bytes = render_output(&output.document, &config)?;
    write_output(&output_path, &bytes)?;

    if cli.json {
        let report = serde_json::json!({
            "output": output_path,
            "stats": output.stats,
            "diagnostics": output.diagnostics,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "{}  {} chapters  {} paragraphs  {} images{}  {}ms  →  {}",
            if output.diagnostics.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.chapters,
            stats.paragraphs,
            stats.images,
            if stats.has_cover { " + cover" } else { "" },
            stats.duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {}",
            dim(&format!(
                "{} lines: {} dropped, {} hyphen joins, {} soft joins, {} paragraph ends",
                stats.lines.lines,
                stats.lines.noise(),
                stats.lines.hyphen_joins,
                stats.lines.soft_joins,
                stats.lines.paragraph_ends,
            )),
        );
        if !show_progress {
            for diagnostic in &output.diagnostics {
                eprintln!("   {} {}", red("✗"), diagnostic);
            }
        }
    }

    Ok(())
}

/// Map the profile and CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder();

    if let Some(ref path) = cli.profile {
        let mut profile = BookProfile::load(path)?;
        // A line option on the command line replaces the profile's mode.
        if cli.chapter_line.is_some() || cli.chapter_window.is_some() {
            profile.chapter_line_index = None;
            profile.chapter_line_window = None;
        }
        builder = builder.profile(profile);
    }

    builder = builder
        .chapter_patterns(cli.chapter_patterns.iter().cloned())
        .blacklist_patterns(cli.blacklist.iter().cloned())
        .pages(parse_pages(&cli.pages)?)
        .skip_heading_line(cli.skip_heading_line)
        .include_titles(cli.text_titles);

    if let Some(ref t) = cli.title {
        builder = builder.title(t.clone());
    }
    if let Some(ref a) = cli.author {
        builder = builder.author(a.clone());
    }
    if let Some(ref l) = cli.language {
        builder = builder.language(l.clone());
    }
    if let Some(ref id) = cli.identifier {
        builder = builder.identifier(id.clone());
    }
    if let Some(n) = cli.chapter_line {
        builder = builder.chapter_line_index(n);
    }
    if let Some(n) = cli.chapter_window {
        builder = builder.chapter_line_window(n);
    }
    if cli.no_cover {
        builder = builder.cover_page(None);
    } else if let Some(n) = cli.cover_page {
        builder = builder.cover_page(Some(n));
    }
    if cli.no_images {
        builder = builder.embed_images(false);
    }
    if cli.png_images {
        builder = builder.image_encoding(ImageEncoding::Png);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }

    let format = cli.format.map(OutputFormat::from).or_else(|| {
        cli.output
            .as_deref()
            .and_then(|p| p.extension())
            .filter(|ext| ext.eq_ignore_ascii_case("txt"))
            .map(|_| OutputFormat::Text)
    });
    if let Some(format) = format {
        builder = builder.output_format(format);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    input.with_extension(format.extension())
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
