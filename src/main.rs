//! Screen Status Detect CLI
//!
//! Inspect the screen-security facade from a terminal.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use screen_status_detect::{
    config::Config,
    sensor::{EmulatorProbe, NoopSensor, SimulatedSensor},
    Capability, ChannelDispatcher, Listener, Operation, Platform, ScreenStatus,
    ScreenStatusDetect, StatusEvent, VERSION,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "screen-status")]
#[command(version = VERSION)]
#[command(about = "Screen security state and signing certificate inspector", long_about = None)]
struct Cli {
    /// Gate operations as if running on this platform (android, ios, ...)
    #[arg(long, global = true)]
    platform: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the platform, supported operations and current screen status
    Status,

    /// Register a listener on a simulated sensor and print status changes
    Watch {
        /// Comma-separated statuses to play back (normal, mirroring, recording)
        #[arg(long, default_value = "mirroring,normal,recording,normal")]
        script: String,

        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,

        /// Seconds between status changes (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Show the signing certificate digests
    Certificate,

    /// Probe the filesystem for emulator artifacts
    Emulator {
        /// Filesystem root to probe (defaults to the configured root)
        #[arg(long)]
        root: Option<std::path::PathBuf>,
    },

    /// Show or update configuration
    Config {
        /// Persist a platform override (use "auto" to clear it)
        #[arg(long)]
        set_platform: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    init_tracing(&config.log_filter);

    if let Some(tag) = cli.platform.as_deref() {
        config.platform = Some(parse_platform(tag)?);
    }

    match cli.command {
        Commands::Status => cmd_status(&config).await,
        Commands::Watch {
            script,
            count,
            interval,
        } => cmd_watch(&config, &script, count, interval).await,
        Commands::Certificate => cmd_certificate(&config).await,
        Commands::Emulator { root } => cmd_emulator(&config, root).await,
        Commands::Config { set_platform } => cmd_config(set_platform),
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_platform(tag: &str) -> anyhow::Result<Platform> {
    Platform::from_tag(tag).with_context(|| format!("unknown platform '{tag}'"))
}

fn parse_script(script: &str) -> anyhow::Result<Vec<ScreenStatus>> {
    let statuses = script
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| ScreenStatus::parse(s).with_context(|| format!("unknown status '{}'", s.trim())))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if statuses.is_empty() {
        bail!("script must name at least one status");
    }
    Ok(statuses)
}

fn describe<T: std::fmt::Debug>(outcome: &Capability<T>) -> String {
    match outcome {
        Capability::Supported(value) => format!("{value:?}"),
        Capability::Unsupported(op) => format!("not available on this platform ({op})"),
        Capability::Failed(e) => format!("failed: {e}"),
    }
}

async fn cmd_status(config: &Config) -> anyhow::Result<()> {
    let detect = ScreenStatusDetect::from_config(
        config,
        Arc::new(NoopSensor::new()),
        Arc::new(ChannelDispatcher::new()),
    );

    println!("Screen Status Detect v{VERSION}");
    println!("==========================");
    println!();
    println!("Platform: {}", detect.platform());
    println!("Supported operations:");
    for op in Operation::ALL {
        let mark = if detect.gate().supports(op) { "✓" } else { "✗" };
        println!("  {mark} {op}");
    }
    println!();

    match detect.get_current_status().await {
        Capability::Supported(event) => {
            println!("Current status:");
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        other => println!("Current status: {}", describe(&other)),
    }
    Ok(())
}

async fn cmd_watch(
    config: &Config,
    script: &str,
    count: Option<usize>,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let statuses = parse_script(script)?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or(config.simulate_interval);

    let sensor = Arc::new(SimulatedSensor::with_script(statuses.iter().copied()));
    let dispatcher = ChannelDispatcher::new();
    let detect =
        ScreenStatusDetect::from_config(config, sensor.clone(), Arc::new(dispatcher.clone()));

    // Hosts without an arm signal observe continuously
    sensor.set_always_on(!detect.gate().supports(Operation::Subscribe));

    let received = Arc::new(AtomicUsize::new(0));
    let listener: Listener = {
        let received = Arc::clone(&received);
        Arc::new(move |event: &StatusEvent| {
            received.fetch_add(1, Ordering::SeqCst);
            println!("[{}] {}", Utc::now().format("%H:%M:%S"), event.screen_status);
        })
    };

    match detect.add_listener(listener.clone()) {
        Capability::Supported(id) => println!("Listening on '{}' as {id}", config.event_name),
        other => bail!("could not register listener: {}", describe(&other)),
    }
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(Arc::clone(&running))?;

    while running.load(Ordering::SeqCst) {
        if count.is_some_and(|limit| received.load(Ordering::SeqCst) >= limit) {
            break;
        }
        if sensor.remaining() == 0 {
            sensor.enqueue(statuses.iter().copied());
        }
        sensor.advance();
        dispatcher.pump(&config.event_name, sensor.receiver());
        tokio::time::sleep(interval).await;
    }

    println!();
    println!("Stopping...");
    detect.remove_listener(listener);
    println!();
    println!("{}", detect.stats().summary());
    Ok(())
}

async fn cmd_certificate(config: &Config) -> anyhow::Result<()> {
    let detect = ScreenStatusDetect::from_config(
        config,
        Arc::new(NoopSensor::new()),
        Arc::new(ChannelDispatcher::new()),
    );

    match detect.get_certificate_fingerprint().await {
        Capability::Supported(fp) => {
            println!("SHA1:   {}", fp.sha1.as_deref().unwrap_or("-"));
            println!("MD5:    {}", fp.md5.as_deref().unwrap_or("-"));
            println!("SHA256: {}", fp.sha256.as_deref().unwrap_or("-"));
        }
        other => println!("Fingerprint: {}", describe(&other)),
    }
    let value = detect.get_certificate_value().await;
    println!("Certificate hash: {}", describe(&value));
    Ok(())
}

async fn cmd_emulator(config: &Config, root: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let root = root.unwrap_or_else(|| config.emulator_root.clone());
    let sensor = SimulatedSensor::new().with_probe(EmulatorProbe::new(&root));
    let detect = ScreenStatusDetect::from_config(
        config,
        Arc::new(sensor),
        Arc::new(ChannelDispatcher::new()),
    );

    println!("Probing {root:?}");
    println!("Emulator:   {}", describe(&detect.is_emulator().await));
    println!("BlueStacks: {}", describe(&detect.check_is_bluestacks().await));
    Ok(())
}

fn cmd_config(set_platform: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading config")?;

    if let Some(tag) = set_platform {
        config.platform = if tag.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(parse_platform(&tag)?)
        };
        config.save().context("saving config")?;
        println!("Configuration saved.");
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
