use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use floorwatch::{parse_intent, ConsoleError, Dashboard, Settings};

#[derive(Parser, Debug)]
#[command(name = "floorwatch")]
#[command(about = "Telemetry state engine for factory-floor dashboards")]
struct Args {
    /// Settings file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Live telemetry endpoint (overrides the settings file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Open the live link on start instead of running the simulation
    #[arg(long)]
    connect: bool,

    /// Seed for the simulation (reproducible runs)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Seconds between status reports in the log
    #[arg(short, long, default_value = "5")]
    report_interval: u64,

    /// Exit after this many seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Write a snapshot export into this directory on exit
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Log level for floorwatch (overrides RUST_LOG)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(endpoint) = &args.endpoint {
        settings.endpoint = endpoint.clone();
    }
    if let Some(seed) = args.seed {
        settings.simulation.seed = Some(seed);
    }
    if args.connect {
        settings.connect_on_start = true;
    }
    settings.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(settings, args))
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(format!("floorwatch={}", level)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("floorwatch=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(settings: Settings, args: Args) -> Result<()> {
    let mut dashboard = Dashboard::new(&settings)?;
    if settings.connect_on_start {
        dashboard.connect();
    }
    println!("{}", dashboard.status_line());
    println!("Type `help` for commands.");

    let period = Duration::from_secs(args.report_interval.max(1));
    let mut report = tokio::time::interval_at(Instant::now() + period, period);
    let deadline = args.duration.map(|secs| Instant::now() + Duration::from_secs(secs));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    while dashboard.running {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            _ = until(deadline) => {
                info!("run duration elapsed");
                break;
            }
            _ = report.tick() => info!("{}", dashboard.status_line()),
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_line(&mut dashboard, &line),
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin closed: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    if let Some(dir) = &args.export_dir {
        match dashboard.export_to_dir(dir) {
            Ok(path) => println!("Exported to {}", path.display()),
            Err(e) => warn!("export failed: {}", e),
        }
    }

    dashboard.shutdown().await;
    Ok(())
}

fn handle_line(dashboard: &mut Dashboard, line: &str) {
    match parse_intent(line) {
        Ok(intent) => println!("{}", dashboard.apply(intent)),
        Err(ConsoleError::Empty) => {}
        Err(e) => println!("{}", e),
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
