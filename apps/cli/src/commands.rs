//! CLI command definitions, routing, and tracing setup.

use std::io::Read as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use underwriter_api::AppState;
use underwriter_core::{AnalysisProgress, AnalyzeClient};
use underwriter_gateway::{GatewayConfig, ModelGateway};
use underwriter_intake::{AttachmentEncoder, AttachmentList};
use underwriter_shared::{
    AnalysisReport, AnalysisSection, AnalyzeRequest, AppConfig, init_config, load_config,
    load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Underwriter — structured underwriting for litigation funding requests.
#[derive(Parser)]
#[command(
    name = "underwriter",
    version,
    about = "Analyze litigation funding applications and split the verdict into sections.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.underwriter/underwriter.toml).
    #[arg(long = "config", global = true, env = "UNDERWRITER_CONFIG")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Analyze an intake form.
    Analyze {
        /// Intake form JSON (camelCase fields, optional `attachments`), or `-` for stdin.
        #[arg(short, long)]
        form: String,

        /// File to attach (can be specified multiple times).
        #[arg(short, long)]
        attach: Vec<PathBuf>,

        /// Send to a running Underwriter server instead of calling the model directly.
        #[arg(long)]
        server: Option<String>,

        /// Print the full report as JSON.
        #[arg(long, conflicts_with = "raw")]
        json: bool,

        /// Print the model's answer without segmenting it.
        #[arg(long)]
        raw: bool,
    },

    /// Segment an existing answer text into sections.
    Segment {
        /// Answer file, or `-` for stdin.
        input: String,

        /// Print sections as JSON instead of Markdown.
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API.
    Serve {
        /// Listen host (overrides config).
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "underwriter=info",
        1 => "underwriter=debug",
        _ => "underwriter=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path.as_deref();
    match cli.command {
        Command::Analyze {
            form,
            attach,
            server,
            json,
            raw,
        } => {
            let config = app_config(config_path)?;
            cmd_analyze(&config, &form, &attach, server.as_deref(), json, raw).await
        }
        Command::Segment { input, json } => cmd_segment(&input, json),
        Command::Serve { host, port } => {
            let config = app_config(config_path)?;
            cmd_serve(&config, host, port).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn app_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

/// Read a file, or stdin when `source` is `-`.
fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(source).map_err(|e| eyre!("cannot read '{source}': {e}"))
}

// ---------------------------------------------------------------------------
// analyze
// ---------------------------------------------------------------------------

async fn cmd_analyze(
    config: &AppConfig,
    form: &str,
    attach: &[PathBuf],
    server: Option<&str>,
    json: bool,
    raw: bool,
) -> Result<()> {
    let mut request: AnalyzeRequest = serde_json::from_str(&read_input(form)?)
        .map_err(|e| eyre!("invalid intake form '{form}': {e}"))?;

    let encoder = AttachmentEncoder::from_config(&config.attachments);
    let mut attachments = AttachmentList::new();
    let inline = attachments.adopt(&encoder, std::mem::take(&mut request.attachments));
    let files = attachments.ingest(&encoder, attach).await;
    for rejected in inline.rejected.iter().chain(&files.rejected) {
        eprintln!("  Skipped {}: {}", rejected.name, rejected.reason);
    }
    info!(
        accepted = inline.accepted + files.accepted,
        rejected = inline.rejected.len() + files.rejected.len(),
        "attachments ingested"
    );
    request.attachments = attachments.into_vec();

    // Fail before touching the network.
    request.form.validate()?;

    let progress = CliProgress::new();
    let report = match server {
        Some(server) => {
            let url = Url::parse(server).map_err(|e| eyre!("invalid server URL '{server}': {e}"))?;
            let client = AnalyzeClient::new(&url)?;
            info!(endpoint = %client.endpoint(), "analyzing remotely");
            client.analyze(&request, &progress).await?
        }
        None => {
            let gateway = ModelGateway::new(GatewayConfig::resolve(config)?)?;
            underwriter_core::analyze(&gateway, &request.form, &request.attachments, &progress)
                .await?
        }
    };

    if raw {
        println!("{}", report.raw_text);
    } else if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &AnalysisReport) {
    println!();
    for (i, section) in report.sections.iter().enumerate() {
        println!("{}", render_section(i + 1, section));
    }
    println!(
        "  {} section(s) | {} attachment(s) | {} | {:.1}s",
        report.sections.len(),
        report.attachment_count,
        report.model,
        report.elapsed_ms as f64 / 1000.0
    );
    println!();
}

fn render_section(index: usize, section: &AnalysisSection) -> String {
    let badge = section
        .verdict
        .map(|v| format!("  [{}]", v.label()))
        .unwrap_or_default();
    let body: String = section
        .content
        .lines()
        .map(|line| format!("     {line}\n"))
        .collect();
    format!("  {index:>2}. {}{badge}\n{body}", section.title)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl AnalysisProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _report: &AnalysisReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ---------------------------------------------------------------------------
// segment
// ---------------------------------------------------------------------------

fn cmd_segment(input: &str, json: bool) -> Result<()> {
    let text = read_input(input)?;
    let sections = underwriter_segment::segment(&text);
    info!(sections = sections.len(), "answer segmented");

    if json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
    } else {
        print!("{}", underwriter_segment::to_markdown(&sections));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

async fn cmd_serve(config: &AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let addr = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| eyre!("cannot resolve '{host}:{port}': {e}"))?
        .next()
        .ok_or_else(|| eyre!("no address found for '{host}:{port}'"))?;

    let state = AppState::from_config(config);
    if !state.is_ready() {
        eprintln!("  Warning: model gateway is not configured; /api/analyze will return 500.");
    }

    let server = underwriter_api::start(addr, state).await?;
    println!("Underwriter API listening on http://{}", server.addr());

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = app_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
