use anyhow::Result;
use clap::{Parser, Subcommand};
use groundchat_core::{AccessGate, Error, UserTier};
use groundchat_local::{FetchMode, PdfTextExtractor, Settings};
use std::io::IsTerminal;
use std::process::ExitCode;

mod envelope;
mod repl;

use envelope::{add_envelope_fields, failure, failure_from, ErrorCode};

#[derive(Parser, Debug)]
#[command(name = "groundchat")]
#[command(
    about = "Ask questions about a PDF or web page through an OpenAI-compatible model",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the text of a PDF (json).
    Pdf(PdfCmd),
    /// Extract the visible text of a web page, static fetch first, browser second (json).
    Fetch(FetchCmd),
    /// Interactive grounded chat on stdin/stdout.
    Chat(ChatCmd),
    /// Diagnose configuration (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct PdfCmd {
    path: std::path::PathBuf,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct FetchCmd {
    url: String,
    /// Extraction tier. Allowed: auto, static, dynamic
    #[arg(long, default_value = "auto")]
    mode: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

#[derive(clap::Args, Debug)]
struct ChatCmd {
    /// Log in with this name; without it the session is ungated.
    #[arg(long, env = "GROUNDCHAT_USERNAME")]
    username: Option<String>,
    /// User tier when logged in. Allowed: free-demo, paid
    #[arg(long, default_value = "free-demo")]
    tier: String,
    /// Load this PDF as the active resource before the first question.
    #[arg(long)]
    pdf: Option<std::path::PathBuf>,
    /// Skip the automatic summary after a document or link is loaded.
    #[arg(long)]
    no_summarize: bool,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Timeout for the Node.js probe (ms).
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn is_text(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("text")
}

/// Print a failure the way the command's output format asks for.
fn report_failure(output: &str, v: &serde_json::Value) -> ExitCode {
    if is_text(output) {
        let msg = v["error"]["message"].as_str().unwrap_or("failed");
        eprintln!("error: {msg}");
        if let Some(h) = v["error"]["hint"].as_str().filter(|h| !h.is_empty()) {
            eprintln!("hint: {h}");
        }
    } else {
        println!("{v}");
    }
    ExitCode::FAILURE
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = matches!(
        std::env::var("GROUNDCHAT_LOG_JSON")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    );
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn cmd_pdf(args: PdfCmd) -> ExitCode {
    let t0 = std::time::Instant::now();
    let bytes = match tokio::fs::read(&args.path).await {
        Ok(b) => b,
        Err(e) => {
            let v = failure(
                "pdf",
                ErrorCode::IoError,
                format!("cannot read {}: {e}", args.path.display()),
                t0.elapsed().as_millis(),
            );
            return report_failure(&args.output, &v);
        }
    };
    match PdfTextExtractor::new().extract(&bytes) {
        Ok(text) => {
            if is_text(&args.output) {
                println!("{text}");
            } else {
                let mut v = serde_json::json!({
                    "ok": true,
                    "path": args.path.display().to_string(),
                    "bytes": bytes.len(),
                    "text_chars": text.chars().count(),
                    "text": text,
                });
                add_envelope_fields(&mut v, "pdf", t0.elapsed().as_millis());
                println!("{v}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_failure(
            &args.output,
            &failure_from("pdf", &e, t0.elapsed().as_millis()),
        ),
    }
}

async fn cmd_fetch(args: FetchCmd, settings: &Settings) -> Result<ExitCode> {
    let t0 = std::time::Instant::now();
    let mode = match args.mode.parse::<FetchMode>() {
        Ok(m) => m,
        Err(e) => {
            return Ok(report_failure(
                &args.output,
                &failure_from("fetch", &e, t0.elapsed().as_millis()),
            ))
        }
    };
    let client = groundchat_local::build_http_client()?;
    let renderer = groundchat_local::PlaywrightRenderer::from_settings(settings);
    let extractor = groundchat_local::WebTextExtractor::from_settings(client, renderer, settings);

    match extractor.extract_with_mode(args.url.trim(), mode).await {
        Ok(w) => {
            if is_text(&args.output) {
                println!("{}", w.text);
            } else {
                let mut v = serde_json::json!({
                    "ok": true,
                    "url": args.url.trim(),
                    "mode": mode,
                    "tier": w.tier,
                    "status": w.status,
                    "text_chars": w.text.chars().count(),
                    "text": w.text,
                });
                add_envelope_fields(&mut v, "fetch", t0.elapsed().as_millis());
                println!("{v}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(report_failure(
            &args.output,
            &failure_from("fetch", &e, t0.elapsed().as_millis()),
        )),
    }
}

async fn cmd_chat(args: ChatCmd, settings: &Settings) -> Result<ExitCode> {
    let mut assistant = groundchat_local::assistant_from_settings(settings)?;
    if args.no_summarize {
        assistant = assistant.auto_summarize(false);
    }
    if let Some(name) = args.username.as_deref() {
        let gate = args
            .tier
            .parse::<UserTier>()
            .and_then(|tier| AccessGate::login(name, tier));
        match gate {
            Ok(g) => assistant = assistant.with_gate(g),
            Err(e) => {
                eprintln!("error: {e}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    if settings.openai_api_key.is_none() {
        tracing::warn!("no OpenAI API key configured; model calls will likely be rejected");
    }
    if let Some(path) = &args.pdf {
        let loaded = match tokio::fs::read(path).await {
            Ok(bytes) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                assistant.upload_document(&name, &bytes).await
            }
            Err(e) => Err(Error::Validation(format!(
                "cannot read {}: {e}",
                path.display()
            ))),
        };
        match loaded {
            Ok(act) => {
                println!(
                    "Loaded document: {} ({} characters)",
                    act.resource.name, act.resource.content_length
                );
                if let Some(t) = act.summary {
                    println!("assistant: {}", t.content);
                }
            }
            Err(e) => {
                eprintln!("error: {e}");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    repl::run(assistant, std::io::stdin().is_terminal()).await?;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_doctor(args: DoctorCmd, settings: &Settings) -> ExitCode {
    let t0 = std::time::Instant::now();
    let mut checks: Vec<serde_json::Value> = Vec::new();

    let key_ok = settings.openai_api_key.is_some();
    checks.push(serde_json::json!({
        "name": "openai_api_key",
        "ok": key_ok,
        "skipped": false,
        "message": if key_ok { "API key is set" } else { "API key is not set" },
        "hint": if key_ok { "" } else { "Set GROUNDCHAT_OPENAI_API_KEY (or OPENAI_API_KEY)." },
    }));

    if settings.render_disabled {
        checks.push(serde_json::json!({
            "name": "node_available",
            "ok": true,
            "skipped": true,
            "message": "browser rendering disabled",
            "hint": "",
        }));
    } else {
        let probe = tokio::process::Command::new(&settings.node_bin)
            .arg("--version")
            .kill_on_drop(true)
            .output();
        let res = tokio::time::timeout(std::time::Duration::from_millis(args.timeout_ms), probe).await;
        let (ok, message) = match res {
            Ok(Ok(out)) if out.status.success() => (
                true,
                String::from_utf8_lossy(&out.stdout).trim().to_string(),
            ),
            Ok(Ok(out)) => (false, format!("`{}` exited with {}", settings.node_bin, out.status)),
            Ok(Err(e)) => (false, format!("cannot run `{}`: {e}", settings.node_bin)),
            Err(_) => (false, format!("`{}` did not answer in time", settings.node_bin)),
        };
        checks.push(serde_json::json!({
            "name": "node_available",
            "ok": ok,
            "skipped": false,
            "message": message,
            "hint": if ok { "" } else { "Install Node.js and Playwright, set GROUNDCHAT_NODE, or set GROUNDCHAT_RENDER_DISABLE=1." },
        }));
    }

    let mut v = serde_json::json!({
        "ok": true,
        "name": "groundchat",
        "version": env!("CARGO_PKG_VERSION"),
        "configured": {
            "openai_api_key": key_ok,
            "openai_base_url": settings.openai_base_url,
            "render_disabled": settings.render_disabled,
            "node_bin": settings.node_bin,
            "max_turns": settings.max_turns,
            "auto_summarize": settings.auto_summarize,
        },
        "checks": checks,
    });
    add_envelope_fields(&mut v, "doctor", t0.elapsed().as_millis());

    if is_text(&args.output) {
        println!("groundchat {}", env!("CARGO_PKG_VERSION"));
        for c in v["checks"].as_array().into_iter().flatten() {
            let status = match (c["skipped"].as_bool(), c["ok"].as_bool()) {
                (Some(true), _) => "skip",
                (_, Some(true)) => "ok",
                _ => "FAIL",
            };
            println!(
                "[{status}] {}: {}",
                c["name"].as_str().unwrap_or(""),
                c["message"].as_str().unwrap_or("")
            );
        }
    } else {
        println!("{v}");
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    groundchat_local::config::load_env_file_from_env();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Pdf(args) => Ok(cmd_pdf(args).await),
        Commands::Fetch(args) => cmd_fetch(args, &settings).await,
        Commands::Chat(args) => cmd_chat(args, &settings).await,
        Commands::Doctor(args) => Ok(cmd_doctor(args, &settings).await),
        Commands::Version(args) => {
            let mut v = serde_json::json!({
                "ok": true,
                "name": "groundchat",
                "version": env!("CARGO_PKG_VERSION"),
            });
            add_envelope_fields(&mut v, "version", 0);
            if is_text(&args.output) {
                println!("groundchat {}", env!("CARGO_PKG_VERSION"));
            } else {
                println!("{v}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
