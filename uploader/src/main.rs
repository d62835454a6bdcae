//! Uploader binary entry point

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use shared::logging;
use uploader::config::{process_env, AppConfig};
use uploader::core::{CampaignPayload, CampaignPlanner, PlatformRegistry, RetryPolicy, SubmissionEngine, TargetingHints};
use uploader::services::{GoogleSheetsClient, LogNotifier, RealGraphClient, ThumbnailChain, TwilioNotifier};
use uploader::traits::Notifier;
use uploader::UploaderResult;

const STARTUP_FAILURE: i32 = 3;

#[derive(Parser)]
#[command(name = "uploader")]
#[command(about = "Create ad campaigns from spreadsheet rows")]
struct Args {
    /// Sheet tab to process (defaults to today's date, DD/MM)
    #[arg(short = 't', long)]
    tab: Option<String>,

    /// Verbose logging
    #[arg(short = 'd', long)]
    debug: bool,

    /// Defaults file
    #[arg(long, default_value = "defaults.yaml")]
    config: PathBuf,

    /// Platform credentials file
    #[arg(long, default_value = "platforms.yaml")]
    platforms: PathBuf,

    /// Reprocess rows already marked SUCCESS
    #[arg(long)]
    force: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Submit one JSON campaign payload instead of reading the sheet
    #[arg(long)]
    payload: Option<PathBuf>,

    /// Targeting hints for --payload, e.g. "platform: fb api 2, device: ios_only"
    #[arg(long, default_value = "", requires = "payload")]
    hints: String,
}

/// Notifier picked at startup from the Twilio settings
enum SummaryNotifier {
    Twilio(TwilioNotifier),
    Log(LogNotifier),
}

#[async_trait::async_trait]
impl Notifier for SummaryNotifier {
    async fn send(&self, message: &str) -> UploaderResult<()> {
        match self {
            SummaryNotifier::Twilio(twilio) => twilio.send(message).await,
            SummaryNotifier::Log(log) => log.send(message).await,
        }
    }
}

type AppUploader = uploader::Uploader<GoogleSheetsClient, RealGraphClient, ThumbnailChain, SummaryNotifier>;

fn build_uploader(args: &Args, config: &AppConfig, cancel: CancellationToken) -> anyhow::Result<AppUploader> {
    let registry = PlatformRegistry::load(&args.platforms, &config.facebook, &process_env)
        .context("loading platform registry")?;
    let planner = CampaignPlanner::from_config(config).context("loading landing page template")?;

    let timeout = config.submission.request_timeout();
    let graph = RealGraphClient::new(config.submission.graph_base_url.clone(), timeout)?;
    let thumbnails = ThumbnailChain::standard(&config.thumbnails)?;
    let engine = SubmissionEngine::new(
        Arc::new(graph),
        Arc::new(thumbnails),
        RetryPolicy::from_settings(&config.submission),
        config.thumbnails.static_fallback_url.clone(),
    )
    .with_identity_verification(config.submission.verify_identity);

    let sheets = GoogleSheetsClient::new(&config.google_sheets, timeout)?;
    let notifier = match config.twilio.clone().filter(|twilio| twilio.is_complete()) {
        Some(twilio) => SummaryNotifier::Twilio(TwilioNotifier::new(twilio, timeout)?),
        None => {
            tracing::warn!("Twilio is not fully configured; summaries will only be logged");
            SummaryNotifier::Log(LogNotifier)
        }
    };

    Ok(uploader::Uploader::new(sheets, notifier, engine, planner, registry, &config.submission)
        .with_force(args.force)
        .with_cancellation(cancel))
}

fn load_payload(path: &Path) -> anyhow::Result<CampaignPayload> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

async fn run(args: Args) -> anyhow::Result<i32> {
    let config = AppConfig::load(&args.config).context("loading configuration")?;

    let cancel = CancellationToken::new();
    let uploader = build_uploader(&args, &config, cancel.clone())?;
    logging::log_startup(uploader.run_id(), &format!("uploader with {} platform(s)", uploader.registry.len()));

    let run_id = uploader.run_id().to_string();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown(&run_id, "Received Ctrl+C, finishing in-flight rows");
                cancel.cancel();
            }
            Err(err) => logging::log_error(&run_id, "Signal handling", &err),
        }
    });

    if let Some(path) = &args.payload {
        let payload = load_payload(path)?;
        let hints = TargetingHints::parse(&args.hints);
        let outcome = uploader.submit_payload(&payload, &hints).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(match outcome.status {
            shared::OutcomeStatus::AllSucceeded => 0,
            _ => 1,
        });
    }

    config.validate_sheets()?;
    let tab = args
        .tab
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%d/%m").to_string());

    let summary = uploader.run_tab(&tab).await?;
    let code = summary.exit_code();
    logging::log_shutdown(uploader.run_id(), &format!("run finished with exit code {code}"));
    Ok(code)
}

#[tokio::main]
async fn main() {
    let _ = dotenv::dotenv();
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    if let Err(e) = logging::init_tracing(level, args.log_json) {
        eprintln!("{e}");
    }

    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("❌ Run failed: {:#}", e);
            STARTUP_FAILURE
        }
    };
    std::process::exit(code);
}
