//! CLI binary for doc2html.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `FormatterConfig` / `FormatRequest` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use doc2html::status::limits_for;
use doc2html::templates;
use doc2html::{
    current_model, format, FormatProgressCallback, FormatRequest, FormatterConfig,
    ProgressCallback, ProviderErrorKind, TemplateSpec, DEFAULT_MODELS,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

fn truncate(msg: &str, max: usize) -> String {
    match msg.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\u{2026}", &msg[..idx]),
        None => msg.to_string(),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner showing the current step, with one
/// log line per extracted file and per model attempt.
struct CliProgressCallback {
    bar: ProgressBar,
    failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            failures: AtomicUsize::new(0),
        })
    }
}

impl FormatProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_files: usize) {
        self.bar.set_prefix("Extracting");
        self.bar.set_message(format!("{total_files} document(s)"));
    }

    fn on_file_extracted(&self, file_num: usize, name: &str, chars: usize) {
        self.bar.println(format!(
            "  {} File {:>2}  {:<32}  {}",
            green("✓"),
            file_num,
            truncate(name, 32),
            dim(&format!("{chars:>7} chars")),
        ));
    }

    fn on_file_error(&self, file_num: usize, name: &str, error: &str) {
        self.bar.println(format!(
            "  {} File {:>2}  {:<32}  {}",
            red("✗"),
            file_num,
            truncate(name, 32),
            red(&truncate(error, 60)),
        ));
    }

    fn on_model_attempt(&self, model: &str, priority: u32, attempt: u32) {
        self.bar.set_prefix("Generating");
        let retry = if attempt > 1 { " (retry)" } else { "" };
        self.bar
            .set_message(format!("{model}{retry}  {}", dim(&format!("priority {priority}"))));
    }

    fn on_model_failed(&self, model: &str, kind: ProviderErrorKind, error: &str) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:<32}  {}  {}",
            red("✗"),
            model,
            yellow(&format!("{kind:?}")),
            dim(&truncate(error, 60)),
        ));
    }

    fn on_rate_limit_backoff(&self, model: &str, backoff_ms: u64) {
        self.bar.set_message(format!("{model} rate limited, waiting {backoff_ms}ms"));
    }

    fn on_generation_complete(&self, model: &str, html_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Generated with {}  {}",
            green("✔"),
            bold(model),
            dim(&format!("{html_len} bytes")),
        );
    }

    fn on_fallback(&self, models_tried: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} All {} models failed; used text-based fallback",
            cyan("⚠"),
            models_tried,
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Format a PDF with a built-in template
  doc2html report.pdf --template professional-report

  # Several documents, shaped by a description
  doc2html notes.docx figures.xlsx --format "meeting summary"

  # Pasted text with your own template
  doc2html --text "$(cat audit.txt)" --template-file seo.html

  # Pre-fill placeholders, print HTML to stdout
  doc2html cv.pdf --template resume --set candidate_name="Ada Lovelace" --stdout

  # Custom model chain
  doc2html doc.pdf --format report --models gemini-2.5-flash,gemma-3-27b

  # List templates / show the model chain and its rate limits
  doc2html --list-templates
  doc2html --status

MODEL CHAIN (default, tried in order):
  gemini-2.5-flash-lite   retried once after 2s when rate limited
  gemini-2.5-flash, gemini-3-flash, gemini-robotics-er-1.5-preview,
  gemma-3-12b, gemma-3-1b, gemma-3-27b, gemma-3-2b, gemma-3-4b
  When every model fails, a text-based fallback still produces a document.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  DOC2HTML_PROVIDER       edgequake-llm provider name (default: gemini)
  DOC2HTML_MODELS         Comma-separated model chain
  DOC2HTML_OUTPUT_DIR     Output directory (default: outputs)
  PDFIUM_LIB_PATH         Directory containing libpdfium (else the system path)
  RUST_LOG                tracing filter, e.g. doc2html=debug
"#;

/// Format documents and text into styled HTML using generative models.
#[derive(Parser, Debug)]
#[command(
    name = "doc2html",
    version,
    about = "Format documents and text into styled HTML using generative models",
    long_about = "Extract text from PDF, Word, spreadsheet and text documents (local files or \
URLs) and turn it into a complete HTML document shaped by a template or a short format \
description. Models are tried in priority order; if all fail, a text-based fallback still \
produces a document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local files or HTTP/HTTPS URLs (PDF, DOCX, XLSX/XLS, TXT, HTML).
    inputs: Vec<String>,

    /// Text to format instead of documents.
    #[arg(long, conflicts_with = "inputs")]
    text: Option<String>,

    /// Built-in template id (see --list-templates).
    #[arg(short, long, env = "DOC2HTML_TEMPLATE", group = "target")]
    template: Option<String>,

    /// Path to an HTML template file.
    #[arg(long, group = "target")]
    template_file: Option<PathBuf>,

    /// Template HTML given inline.
    #[arg(long, group = "target")]
    template_html: Option<String>,

    /// Free-text description of the desired output, e.g. "candidate profile".
    #[arg(short, long = "format", group = "target")]
    format_description: Option<String>,

    /// Pre-fill a template placeholder: KEY=VALUE (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_placeholder)]
    placeholders: Vec<(String, String)>,

    /// Directory the generated HTML is written to.
    #[arg(short, long, env = "DOC2HTML_OUTPUT_DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// Also print the generated HTML to stdout.
    #[arg(long)]
    stdout: bool,

    /// Model chain, highest priority first (comma-separated).
    #[arg(long, env = "DOC2HTML_MODELS", value_delimiter = ',')]
    models: Vec<String>,

    /// edgequake-llm provider used for every model in the chain.
    #[arg(long, env = "DOC2HTML_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Backoff before the primary model's one-time rate-limit retry.
    #[arg(long, env = "DOC2HTML_BACKOFF_MS", default_value_t = 2000)]
    backoff_ms: u64,

    /// Max output tokens per model call.
    #[arg(long, env = "DOC2HTML_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "DOC2HTML_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Per-attempt model timeout in seconds.
    #[arg(long, env = "DOC2HTML_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "DOC2HTML_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a JSON summary (FormatOutput without the HTML) to stdout.
    #[arg(long, env = "DOC2HTML_JSON")]
    json: bool,

    /// List built-in templates and exit.
    #[arg(long)]
    list_templates: bool,

    /// Show the model chain with published rate limits and exit.
    #[arg(long)]
    status: bool,

    /// Disable progress spinner.
    #[arg(long, env = "DOC2HTML_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2HTML_QUIET")]
    quiet: bool,
}

fn parse_placeholder(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // callback prints everything that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Informational modes ──────────────────────────────────────────────
    if cli.list_templates {
        return list_templates(cli.json);
    }
    if cli.status {
        return print_status(&cli);
    }

    // ── Build config and request ─────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn FormatProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let request = build_request(&cli);

    // ── Run ──────────────────────────────────────────────────────────────
    let output = format(&request, &config).await.context("Formatting failed")?;

    if cli.json {
        let mut summary = serde_json::to_value(&output).context("Failed to serialise output")?;
        if let Some(obj) = summary.as_object_mut() {
            obj.remove("html");
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise output")?
        );
    } else if cli.stdout {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.html.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.html.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        let path = output
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!(
            "{}  {}  {} chars in  {}ms  →  {}",
            if output.used_fallback { cyan("⚠") } else { green("✔") },
            output.model_used,
            output.extracted_chars,
            output.stats.total_duration_ms,
            bold(&path),
        );
        if !output.extraction_failures.is_empty() {
            eprintln!(
                "   {} document(s) could not be read",
                red(&output.extraction_failures.len().to_string())
            );
        }
    }

    Ok(())
}

/// Map CLI args to `FormatterConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<FormatterConfig> {
    let mut builder = FormatterConfig::builder()
        .provider_name(cli.provider.clone())
        .rate_limit_backoff_ms(cli.backoff_ms)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .output_dir(cli.output_dir.clone());

    let models: Vec<String> = cli
        .models
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect();
    if !models.is_empty() {
        builder = builder.models(models);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map CLI args to `FormatRequest`. Validation happens in the library.
fn build_request(cli: &Cli) -> FormatRequest {
    let mut request = if cli.inputs.is_empty() {
        FormatRequest {
            text: cli.text.clone(),
            ..Default::default()
        }
    } else {
        FormatRequest::from_documents(cli.inputs.iter().cloned())
    };

    request.target = if let Some(ref id) = cli.template {
        Some(TemplateSpec::Catalog(id.clone()))
    } else if let Some(ref path) = cli.template_file {
        Some(TemplateSpec::File(path.clone()))
    } else if let Some(ref html) = cli.template_html {
        Some(TemplateSpec::Html(html.clone()))
    } else {
        cli.format_description
            .as_ref()
            .map(|d| TemplateSpec::Description(d.clone()))
    };

    for (key, value) in &cli.placeholders {
        request = request.with_placeholder(key.clone(), value.clone());
    }
    request
}

fn list_templates(json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&templates::summaries())
                .context("Failed to serialise templates")?
        );
        return Ok(());
    }
    for t in templates::catalog() {
        println!("{:<22} {:<22} {}", bold(t.id), cyan(t.category), t.name);
        println!("{:<22} {}", "", dim(t.description));
    }
    Ok(())
}

fn print_status(cli: &Cli) -> Result<()> {
    let chain: Vec<String> = if cli.models.is_empty() {
        DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
    } else {
        cli.models.clone()
    };

    if cli.json {
        let rows: Vec<_> = chain
            .iter()
            .enumerate()
            .map(|(i, m)| {
                serde_json::json!({
                    "priority": i + 1,
                    "model": m,
                    "limits": limits_for(m),
                })
            })
            .collect();
        let status = serde_json::json!({
            "current_model": current_model(),
            "provider": cli.provider,
            "chain": rows,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("Failed to serialise status")?
        );
        return Ok(());
    }

    println!("Provider:      {}", cli.provider);
    println!("Current model: {}", current_model());
    println!();
    println!("  #  {:<32} {:>5} {:>7} {:>7}", "model", "RPM", "TPM", "RPD");
    for (i, m) in chain.iter().enumerate() {
        let l = limits_for(m);
        println!("{:>3}  {:<32} {:>5} {:>7} {:>7}", i + 1, m, l.rpm, l.tpm, l.rpd);
    }
    Ok(())
}
