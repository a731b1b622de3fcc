//! CLI binary for fatura2json.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractorConfig` / `ExtractionOptions` and prints one JSON document per
//! input: the enriched record, or `{"error": "..."}`.

use anyhow::{Context, Result};
use clap::Parser;
use fatura2json::prompts::load_system_prompt;
use fatura2json::{
    extract_batch_collect, write_record, BatchItem, ExtractionOptions, ExtractionProgressCallback,
    ExtractionStats, Extractor, ExtractorConfig, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// document. Documents finish out of order, so start times are keyed by input.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} bills  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, input: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(input))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_document_start(&self, input: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(input.to_string(), Instant::now());
        }
        self.bar.set_message(input.to_string());
    }

    fn on_document_complete(&self, input: &str, stats: &ExtractionStats) {
        let secs = self.elapsed_secs(input);
        self.bar.println(format!(
            "  {} {}  {}  {}",
            green("✓"),
            input,
            dim(&format!("{} pages, {} chars", stats.pages_read, stats.text_chars)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, input: &str, error: &str) {
        let secs = self.elapsed_secs(input);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let first_line = error.lines().next().unwrap_or_default();
        let msg: String = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {}  {}  {}",
            red("✗"),
            input,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} bills extracted", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} bills extracted  ({} failed)",
                red("✘"),
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One bill, JSON on stdout (first page only)
  fatura2json fatura.pdf

  # Read the first 3 pages, pretty-printed, written to a file
  fatura2json --page-limit 3 --pretty fatura.pdf -o fatura.json

  # Every page of every bill in a folder, one JSON file each
  fatura2json --all-pages faturas/*.pdf -o saida/

  # Custom instruction for another distributor
  fatura2json --prompt-file prompt_enel.txt conta.pdf

  # From a URL, with a specific model
  fatura2json --provider openai --model gpt-4.1 https://example.com/fatura.pdf

OUTPUT:
  Each document yields the extracted record with a `_meta` block
  (fonte_arquivo, data_processamento, opcoes), or {"error": "..."}.
  With several inputs and no --output, one JSON document per line.

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium
"#;

/// Extract structured billing fields from utility-bill PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "fatura2json",
    version,
    about = "Extract structured billing fields from utility-bill PDFs using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output file (one input) or directory (several inputs). Default: stdout.
    #[arg(short, long, env = "FATURA2JSON_OUTPUT")]
    output: Option<PathBuf>,

    /// Read every page instead of only the first.
    #[arg(long, env = "FATURA2JSON_ALL_PAGES", conflicts_with = "page_limit")]
    all_pages: bool,

    /// Read the first N pages (1–10).
    #[arg(long, env = "FATURA2JSON_PAGE_LIMIT",
          value_parser = clap::value_parser!(u8).range(1..=10))]
    page_limit: Option<u8>,

    /// Path to a text file containing the system instruction.
    #[arg(long, env = "FATURA2JSON_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-mini, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "FATURA2JSON_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "FATURA2JSON_MAX_TOKENS", default_value_t = 2500)]
    max_tokens: usize,

    /// LLM call timeout in seconds.
    #[arg(long, env = "FATURA2JSON_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FATURA2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "FATURA2JSON_PASSWORD")]
    password: Option<String>,

    /// Keep dates and numbers exactly as printed on the bill.
    #[arg(long, env = "FATURA2JSON_NO_LOCALE")]
    no_locale: bool,

    /// Number of bills processed at once.
    #[arg(short, long, env = "FATURA2JSON_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Pretty-print JSON.
    #[arg(long, env = "FATURA2JSON_PRETTY")]
    pretty: bool,

    /// Disable progress bar.
    #[arg(long, env = "FATURA2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FATURA2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FATURA2JSON_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && cli.inputs.len() > 1;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let options = build_options(&cli)?;
    let extractor = Extractor::new(config).context("Failed to initialise extractor")?;

    // ── Run extraction ───────────────────────────────────────────────────
    let items = extract_batch_collect(&extractor, cli.inputs.clone(), options).await;
    let failed = items.iter().filter(|i| i.result.is_err()).count();

    match cli.output {
        Some(ref out) if cli.inputs.len() == 1 => {
            write_item(&items[0], out).await?;
        }
        Some(ref dir) => {
            let names = unique_output_names(items.iter().map(|i| i.input.as_str()));
            for (item, name) in items.iter().zip(names) {
                write_item(item, &dir.join(name)).await?;
            }
        }
        None => print_items(&items, cli.pretty)?,
    }

    if !cli.quiet && !show_progress {
        for item in &items {
            match &item.result {
                Ok(o) => eprintln!(
                    "{} {}  {}",
                    green("✔"),
                    item.input,
                    dim(&format!(
                        "{} tokens in / {} out, {}ms",
                        o.stats.input_tokens, o.stats.output_tokens, o.stats.total_duration_ms
                    )),
                ),
                Err(e) => eprintln!("{} {}  {}", red("✘"), item.input, red(&e.to_string())),
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `ExtractorConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractorConfig> {
    let mut builder = ExtractorConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .normalize_locale(!cli.no_locale)
        .concurrency(cli.concurrency);

    if let Some(ref path) = cli.prompt_file {
        builder = builder.system_prompt(load_system_prompt(path)?);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Map page-selection flags to `ExtractionOptions`.
fn build_options(cli: &Cli) -> Result<ExtractionOptions> {
    let options = match (cli.all_pages, cli.page_limit) {
        (_, Some(n)) => ExtractionOptions::with_page_limit(n)?,
        (true, None) => ExtractionOptions::all_pages(),
        (false, None) => ExtractionOptions::default(),
    };
    Ok(options)
}

fn item_json(item: &BatchItem) -> serde_json::Value {
    match &item.result {
        Ok(output) => output.record.clone(),
        Err(e) => e.to_json(),
    }
}

async fn write_item(item: &BatchItem, path: &Path) -> Result<()> {
    write_record(&item_json(item), path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn print_items(items: &[BatchItem], pretty: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for item in items {
        let value = item_json(item);
        let json = if pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        }
        .context("Failed to serialise output")?;
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    }
    Ok(())
}

/// One output file name per input. Repeated stems get `_2`, `_3`, … so no
/// result overwrites another.
fn unique_output_names<'a>(inputs: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    inputs
        .into_iter()
        .map(|input| {
            let stem = output_stem(input);
            let mut name = format!("{stem}.json");
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{stem}_{n}.json");
                n += 1;
            }
            name
        })
        .collect()
}

/// `faturas/agosto.pdf` → `agosto`; URLs use their last path segment.
fn output_stem(input: &str) -> String {
    let last = input
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(input);
    let last = last.split(['?', '#']).next().unwrap_or(last);
    let stem = Path::new(last)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "fatura".to_string());
    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_stem_from_paths_and_urls() {
        assert_eq!(output_stem("faturas/agosto.pdf"), "agosto");
        assert_eq!(output_stem("https://cdn.example.com/f/set.pdf?sig=1"), "set");
        assert_eq!(output_stem("https://cdn.example.com/"), "cdn.example");
    }

    #[test]
    fn shared_stems_get_distinct_names() {
        let names = unique_output_names(["a/fatura.pdf", "b/fatura.pdf", "c/outra.pdf", "fatura.pdf"]);
        assert_eq!(
            names,
            vec!["fatura.json", "fatura_2.json", "outra.json", "fatura_3.json"]
        );
    }

    #[test]
    fn suffixed_name_already_taken_is_skipped() {
        let names = unique_output_names(["fatura_2.pdf", "x/fatura.pdf", "y/fatura.pdf"]);
        assert_eq!(names, vec!["fatura_2.json", "fatura.json", "fatura_3.json"]);
    }
}
