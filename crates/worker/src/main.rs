use anyhow::Context;
use clap::{Parser, Subcommand};
use cineintel_core::analytics::AnalyticsService;
use cineintel_core::provider::Providers;
use cineintel_core::query::{CoordinatorConfig, MovieQueryCoordinator};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod explore;
mod report;

#[derive(Debug, Parser)]
#[command(name = "cineintel_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a one-shot analytics report (risk, allocation, optional benchmark) as JSON.
    Report {
        /// Risk appetite for the allocation plan, 0..=100.
        #[arg(long, default_value_t = 50.0)]
        risk_appetite: f64,

        /// Two genres to compare, e.g. `Action,Drama`.
        #[arg(long)]
        benchmark: Option<String>,

        /// Write the report here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Drive the catalog query coordinator with edit commands read from stdin.
    Explore {
        /// Overrides QUERY_DEBOUNCE_MS.
        #[arg(long)]
        debounce_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = cineintel_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let providers = Providers::from_settings(&settings)?
        .context("DATASET_PATH or DATA_PROVIDER_BASE_URL is required")?;

    let res = match args.command {
        Command::Report {
            risk_appetite,
            benchmark,
            out,
        } => run_report(providers, risk_appetite, benchmark.as_deref(), out).await,
        Command::Explore { debounce_ms } => {
            let mut config = CoordinatorConfig::from_env();
            if let Some(ms) = debounce_ms {
                config.debounce = Duration::from_millis(ms);
            }
            let coordinator = MovieQueryCoordinator::spawn(providers.catalog, config);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout().lock();
            explore::run_explore(coordinator, stdin, &mut stdout).await
        }
    };

    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    res
}

async fn run_report(
    providers: Providers,
    risk_appetite: f64,
    benchmark: Option<&str>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let opts = report::ReportOptions {
        risk_appetite,
        benchmark: benchmark.map(report::parse_benchmark_pair).transpose()?,
    };

    let service = AnalyticsService::new(providers.genres);
    let report = report::build_report(&service, &opts).await?;
    let body = serde_json::to_string_pretty(&report)?;

    match out {
        Some(path) => {
            std::fs::write(&path, body)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            tracing::info!(report_id = %report.report_id, path = %path.display(), "report written");
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn init_sentry(settings: &cineintel_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
