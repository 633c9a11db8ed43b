//! CLI binary for edgequake-pdfqa.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig`, drives one `DocumentPipeline`, and prints answers.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfqa::{
    extract_text, resolve_input, DocumentPipeline, ObserverHandle, Outcome, PipelineConfig,
    SessionObserver, SessionSnapshot,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner while parsing or waiting for the model,
/// plus one status line per finished step.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        Arc::new(Self { bar })
    }

    fn spin(&self, prefix: &'static str, msg: String) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.reset_elapsed();
        self.bar.set_prefix(prefix);
        self.bar.set_message(msg);
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn stop(&self) {
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

impl SessionObserver for CliObserver {
    fn on_document_selected(&self, name: &str, size: u64) {
        self.spin("Parsing", format!("{name} {}", dim(&format!("({size} bytes)"))));
    }

    fn on_extraction_complete(&self, page_count: usize, text_len: usize) {
        self.stop();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&format!("{page_count} pages parsed")),
            dim(&format!("{text_len} chars")),
        );
    }

    fn on_extraction_error(&self, message: &str) {
        self.stop();
        eprintln!("{} {}", red("✘"), red(&format!("Error parsing PDF: {message}")));
    }

    fn on_query_start(&self, _question: &str) {
        self.spin("Thinking", "waiting for the model…".to_string());
    }

    fn on_query_complete(&self, response_len: usize) {
        self.stop();
        eprintln!("{} {}", green("✔"), dim(&format!("{response_len} chars")));
    }

    fn on_query_error(&self, message: &str) {
        self.stop();
        eprintln!("{} {}", red("✘"), red(message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ask one question
  pdfqa report.pdf -q "What was revenue growth in 2023?"

  # Ask several independent questions
  pdfqa report.pdf -q "Who is the CEO?" -q "List the risk factors"

  # Interactive: one question per line on stdin (Ctrl-D to quit)
  pdfqa report.pdf

  # Questions from a file, JSON snapshots on stdout
  pdfqa report.pdf --json < questions.txt

  # Document from a URL
  pdfqa https://arxiv.org/pdf/1706.03762 -q "What is multi-head attention?"

  # Print the extracted text only (no API key needed)
  pdfqa --extract-only report.pdf

  # Use a specific provider and model
  pdfqa --provider openai --model gpt-4.1-mini report.pdf -q "Summarise"

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_DYNAMIC_LIB_PATH Path to libpdfium if it is not installed system-wide
"#;

/// Ask questions about a PDF document using an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdfqa",
    version,
    about = "Ask questions about a PDF document using an LLM",
    long_about = "Extract the text of a PDF (local file or URL) and answer free-form questions \
about it with a Large Language Model. Answers are grounded in the document only. Supports \
Google Gemini, OpenAI, Anthropic, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Question to ask (repeatable). Without it, questions are read from stdin.
    #[arg(short = 'q', long = "question")]
    questions: Vec<String>,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDFQA_PASSWORD")]
    password: Option<String>,

    /// LLM temperature (0.0–2.0). Default: provider default.
    #[arg(long, env = "PDFQA_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max LLM output tokens per answer. Default: provider default.
    #[arg(long, env = "PDFQA_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Per-question LLM call timeout in seconds. Default: none.
    #[arg(long, env = "PDFQA_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDFQA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the extracted text and exit; no LLM call.
    #[arg(long)]
    extract_only: bool,

    /// Output a JSON session snapshot per question instead of plain text.
    #[arg(long, env = "PDFQA_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDFQA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFQA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except answers and errors.
    #[arg(long, env = "PDFQA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && io::stderr().is_terminal();
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

    let observer: Option<ObserverHandle> = if show_progress {
        Some(CliObserver::new() as ObserverHandle)
    } else {
        None
    };
    let config = build_config(&cli, observer)?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let extraction = extract_text(&cli.input, &config)
            .await
            .context("Failed to extract PDF text")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&extraction).context("Failed to serialise text")?
            );
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(extraction.text.as_bytes())
                .context("Failed to write to stdout")?;
            if !cli.quiet {
                eprintln!("{}", dim(&format!("{} pages", extraction.page_count)));
            }
        }
        return Ok(());
    }

    // ── Session ──────────────────────────────────────────────────────────
    let document = resolve_input(&cli.input, config.download_timeout_secs)
        .await
        .context("Failed to open input")?;
    let session = DocumentPipeline::from_config(&config).context("Failed to set up the LLM")?;

    if let Err(e) = session.select_document(document).await {
        if !show_progress {
            eprintln!("{} {}", red("✘"), red(&e.to_string()));
        }
        if cli.json {
            print_snapshot(&session.snapshot())?;
        }
        anyhow::bail!("Could not process '{}'", cli.input);
    }

    let mut failures = 0usize;
    if cli.questions.is_empty() {
        let interactive = io::stdin().is_terminal();
        if interactive && !cli.quiet {
            eprintln!(
                "{} {}",
                cyan("◆"),
                bold("Ask a question about the document (Ctrl-D to quit)")
            );
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            if interactive {
                eprint!("{} ", cyan("?"));
                io::stderr().flush().ok();
            }
            let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
                break;
            };
            // Blank lines from piped input are not questions.
            if !interactive && line.trim().is_empty() {
                continue;
            }
            if !answer(&session, &line, &cli, show_progress).await? {
                failures += 1;
            }
        }
    } else {
        for question in &cli.questions {
            if !answer(&session, question, &cli, show_progress).await? {
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} question(s) could not be answered");
    }
    Ok(())
}

/// Submit one question and print the outcome. Returns `false` on failure.
async fn answer(
    session: &DocumentPipeline,
    question: &str,
    cli: &Cli,
    show_progress: bool,
) -> Result<bool> {
    let result = session.submit_query(question).await;
    let snapshot = session.snapshot();

    if cli.json {
        print_snapshot(&snapshot)?;
        return Ok(matches!(result, Ok(Outcome::Applied)));
    }

    match result {
        Ok(Outcome::Applied) => {
            let response = snapshot.response.unwrap_or_default();
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(response.as_bytes())
                .context("Failed to write to stdout")?;
            if !response.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
            Ok(true)
        }
        Ok(Outcome::Superseded) => Ok(false),
        Err(e) => {
            if !show_progress {
                eprintln!("{} {}", red("✘"), red(&e.to_string()));
            }
            Ok(false)
        }
    }
}

fn print_snapshot(snapshot: &SessionSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialise snapshot")?;
    println!("{json}");
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, observer: Option<ObserverHandle>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder().download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(observer) = observer {
        builder = builder.observer(observer);
    }

    builder.build().context("Invalid configuration")
}
