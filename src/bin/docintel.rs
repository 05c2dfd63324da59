//! CLI binary for docintel.
//!
//! A thin shim over the library crate that maps CLI flags to
//! [`QueryConfig`] / [`MatchConfig`] and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docintel::{
    ask, compare_files, extract_signing_rules, inspect, server, MatchConfig, PageSelection,
    ProgressCallback, ProviderKind, QueryConfig, RulesReport, RunProgressCallback, VqaOutput,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

/// Terminal progress callback: renders a live progress bar and per-page log
/// lines using [indicatif]. Designed to work correctly when pages complete
/// out-of-order (concurrent mode).
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Count of pages that errored out.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically
    /// by `on_run_start` (called before any pages are processed).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        // Initial style: spinner only (no counter until we know the total).
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Answering");
        self.bar.reset_eta();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        // Switch from spinner-only style to full progress bar now that we
        // know the actual page count.
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Questioning {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(page_num, Instant::now());
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, answer_count: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{answer_count} answers")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page_num)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let failed = total_pages.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages answered successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages answered  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ask the default signatory questions of every page
  docintel ask contract.pdf

  # Ask custom questions of pages 1-3
  docintel ask --pages 1-3 -q "What is the invoice total?" -q "Who issued it?" invoice.pdf

  # Extract signing-rule checkboxes with Gemini
  docintel rules --provider gemini --api-key $GEMINI_API_KEY bylaws.pdf

  # Structured JSON output
  docintel rules --json bylaws.pdf > report.json

  # Compare two scans (exit code 1 when not similar)
  docintel match scan_a.png scan_b.png --threshold 30

  # Inspect PDF metadata (no API key needed)
  docintel inspect contract.pdf

  # Launch the web UI on port 3000
  docintel serve --port 3000

SUPPORTED PROVIDERS & MODELS:
  Provider   Default model              Vision   Key variable
  ────────   ────────────────────────   ──────   ─────────────────
  claude     claude-sonnet-4-20250514   ✓        ANTHROPIC_API_KEY
  gemini     gemini-2.0-flash           ✓        GEMINI_API_KEY

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY   Anthropic API key (provider: claude)
  GEMINI_API_KEY      Google Gemini API key (provider: gemini)
  PDFIUM_LIB_PATH     Path to an existing libpdfium shared library
"#;

/// Document intelligence: VQA, signing-rule extraction, image similarity.
#[derive(Parser, Debug)]
#[command(
    name = "docintel",
    version,
    about = "Ask questions of PDFs, extract signing-rule checkboxes, compare images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCINTEL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(long, global = true, env = "DOCINTEL_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask questions about every selected page of a PDF (vision LLM).
    Ask(AskArgs),
    /// Extract signing-rule checkboxes from a PDF's text (LLM).
    Rules(RulesArgs),
    /// Compare two images by descriptor matching.
    Match(MatchArgs),
    /// Print PDF metadata, no LLM involved.
    Inspect(InspectArgs),
    /// Launch the web UI.
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug)]
struct AskArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Question to ask of every page (repeatable). Default: the signatory
    /// questions (full name, surname, official position).
    #[arg(short, long = "question")]
    questions: Vec<String>,

    #[command(flatten)]
    llm: LlmArgs,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "DOCINTEL_PAGES", default_value = "all")]
    pages: String,

    /// Rendering DPI (72–400).
    #[arg(long, env = "DOCINTEL_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Number of concurrent LLM API calls.
    #[arg(short, long, env = "DOCINTEL_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCINTEL_PASSWORD")]
    password: Option<String>,

    /// Output structured JSON instead of question/answer lines.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "DOCINTEL_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(clap::Args, Debug)]
struct RulesArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    #[command(flatten)]
    llm: LlmArgs,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCINTEL_PASSWORD")]
    password: Option<String>,

    /// Output the full report as JSON.
    #[arg(long)]
    json: bool,
}

/// Flags shared by the LLM-backed subcommands.
#[derive(clap::Args, Debug)]
struct LlmArgs {
    /// LLM provider: claude or gemini.
    #[arg(long, env = "DOCINTEL_PROVIDER", default_value = "claude")]
    provider: String,

    /// API key for the provider. Falls back to the provider's own variable
    /// (ANTHROPIC_API_KEY / GEMINI_API_KEY).
    #[arg(long, env = "DOCINTEL_API_KEY")]
    api_key: Option<String>,

    /// Model ID override (e.g. claude-sonnet-4-20250514, gemini-2.0-flash).
    #[arg(long, env = "DOCINTEL_MODEL")]
    model: Option<String>,

    /// Max LLM output tokens per call.
    #[arg(long, env = "DOCINTEL_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "DOCINTEL_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Retries per call on transient LLM failure.
    #[arg(long, env = "DOCINTEL_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, env = "DOCINTEL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, env = "DOCINTEL_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[derive(clap::Args, Debug)]
struct MatchArgs {
    /// First image.
    image_a: PathBuf,

    /// Second image.
    image_b: PathBuf,

    /// Match count strictly above this value means similar.
    #[arg(short, long, default_value_t = 30)]
    threshold: usize,

    /// FAST corner threshold.
    #[arg(long, default_value_t = 32)]
    fast_threshold: u8,

    /// Keep at most this many keypoints per image.
    #[arg(long, default_value_t = 500)]
    max_keypoints: usize,

    /// Output the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct InspectArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output metadata as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "DOCINTEL_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "DOCINTEL_PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The serve subcommand wants INFO logs by default (they are its only
    // console feedback); everything else stays quiet unless asked.
    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if matches!(cli.command, Commands::Serve(_)) {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask(args) => run_ask(args, cli.quiet).await,
        Commands::Rules(args) => run_rules(args, cli.quiet).await,
        Commands::Match(args) => run_match(args),
        Commands::Inspect(args) => run_inspect(args).await,
        Commands::Serve(args) => run_serve(args).await,
    }
}

// ── Subcommand drivers ───────────────────────────────────────────────────────

async fn run_ask(args: AskArgs, quiet: bool) -> Result<()> {
    let show_progress = !quiet && !args.no_progress && !args.json;

    let progress: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RunProgressCallback>)
    } else {
        None
    };

    let pages = parse_pages(&args.pages)?;
    let mut builder = build_llm_config(&args.llm)?
        .dpi(args.dpi)
        .concurrency(args.concurrency)
        .pages(pages);
    if let Some(pwd) = &args.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    let output = ask(&args.input, &args.questions, &config)
        .await
        .context("VQA run failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        print_answers(&output);
        if !quiet {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&output.stats.total_input_tokens.to_string()),
                dim(&output.stats.total_output_tokens.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

fn print_answers(output: &VqaOutput) {
    for page in &output.pages {
        println!("\n{} Page {}", cyan("📄"), page.page_num);
        match &page.error {
            Some(e) => println!("  {} {}", red("✗"), e),
            None => {
                for qa in &page.answers {
                    println!("{} → {}", qa.question, bold(&qa.answer));
                }
            }
        }
    }
}

async fn run_rules(args: RulesArgs, quiet: bool) -> Result<()> {
    let mut builder = build_llm_config(&args.llm)?;
    if let Some(pwd) = &args.password {
        builder = builder.password(pwd.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let report = extract_signing_rules(&args.input, &config)
        .await
        .context("Rule extraction failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    print_rules_report(&report, quiet);
    Ok(())
}

fn print_rules_report(report: &RulesReport, quiet: bool) {
    let r = &report.result;

    if !r.is_success() {
        eprintln!("{} {}", red("✘"), r.message);
        return;
    }

    println!("{} {}", green("✔"), r.message);
    println!(
        "\n  {}  total rules      {}",
        bold("Σ"),
        bold(&r.total_rules.to_string())
    );
    println!(
        "  {}  approved rules   {}",
        green("✓"),
        bold(&r.approved_count.to_string())
    );
    println!(
        "  {}  sections found   {}",
        cyan("§"),
        bold(&r.sections_found.len().to_string())
    );

    if !r.sections_found.is_empty() {
        println!("\n{}", bold("Sections"));
        for s in &r.sections_found {
            println!("  • {} {}  {}", s.section_name, s.section_number, dim(&s.location));
        }
    }

    if !r.all_rules.is_empty() {
        println!("\n{}", bold("Rules"));
        for rule in &r.all_rules {
            let (mark, verdict) = if rule.is_approved {
                (green("✓"), green("APPROVED"))
            } else {
                (red("✗"), red("NOT APPROVED"))
            };
            println!("  {} Rule {}: {}", mark, rule.rule_number, rule.rule_text);
            println!(
                "     {}",
                dim(&format!(
                    "section: {} | checkbox: {} | {}",
                    if rule.section.is_empty() { "N/A" } else { rule.section.as_str() },
                    rule.checkbox_content,
                    verdict
                ))
            );
        }
    }

    for w in &report.warnings {
        eprintln!("{} {}", cyan("⚠"), w);
    }

    if !quiet {
        eprintln!(
            "\n   {} tokens in  /  {} tokens out  —  {}ms",
            dim(&report.input_tokens.to_string()),
            dim(&report.output_tokens.to_string()),
            report.duration_ms,
        );
    }
}

fn run_match(args: MatchArgs) -> Result<()> {
    let config = MatchConfig {
        fast_threshold: args.fast_threshold,
        max_keypoints: args.max_keypoints,
        match_threshold: args.threshold,
        ..MatchConfig::default()
    };

    let report = compare_files(&args.image_a, &args.image_b, &config)
        .context("Image comparison failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else {
        println!(
            "{} keypoints  vs  {} keypoints  →  {} matches (threshold {})",
            report.keypoints_a, report.keypoints_b, report.matches, report.threshold
        );
        if report.is_similar {
            println!("{} images are similar", green("✔"));
        } else {
            println!("{} images are not similar", red("✘"));
        }
    }

    // Script-friendly: similar ⇒ 0, not similar ⇒ 1.
    if !report.is_similar {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_inspect(args: InspectArgs) -> Result<()> {
    let meta = inspect(&args.input).await.context("Failed to inspect PDF")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?
        );
    } else {
        println!("File:         {}", args.input);
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
    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", args.host, args.port))?;

    server::serve(addr).await.context("Server failed")?;
    Ok(())
}

// ── Flag parsing helpers ─────────────────────────────────────────────────────

/// Map shared LLM flags onto a config builder.
fn build_llm_config(llm: &LlmArgs) -> Result<docintel::QueryConfigBuilder> {
    let provider: ProviderKind = llm
        .provider
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let mut builder = QueryConfig::builder()
        .provider(provider)
        .max_tokens(llm.max_tokens)
        .temperature(llm.temperature)
        .max_retries(llm.max_retries)
        .download_timeout_secs(llm.download_timeout)
        .api_timeout_secs(llm.api_timeout);

    if let Some(key) = &llm.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(model) = &llm.model {
        builder = builder.model(model.clone());
    }

    Ok(builder)
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

        for &p in &pages {
            if p < 1 {
                anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
            }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pages_variants() {
        assert!(matches!(parse_pages("all").unwrap(), PageSelection::All));
        assert!(matches!(
            parse_pages("5").unwrap(),
            PageSelection::Single(5)
        ));
        assert!(matches!(
            parse_pages("3-15").unwrap(),
            PageSelection::Range(3, 15)
        ));
        assert!(matches!(
            parse_pages("1,3,5").unwrap(),
            PageSelection::Set(_)
        ));
        assert!(parse_pages("15-3").is_err());
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("x").is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        use clap::CommandFactory;
        Cli::command().debug_assert();

        let cli = Cli::parse_from(["docintel", "match", "a.png", "b.png", "--threshold", "10"]);
        match cli.command {
            Commands::Match(m) => assert_eq!(m.threshold, 10),
            other => panic!("unexpected subcommand: {other:?}"),
        }
    }
}
