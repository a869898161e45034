use anyhow::Context;
use clap::{Parser, Subcommand};
use macroquad_core::domain::stock::{Horizon, RiskTolerance};
use macroquad_core::storage::ReportStorage;
use macroquad_core::views::build_banner;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod pipeline;

use pipeline::Pipeline;

#[derive(Debug, Parser)]
#[command(name = "macroquad_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch macro series and print the assembled snapshot.
    Ingest,

    /// Classify the macro regime.
    Stance {
        /// Read the snapshot from a JSON file instead of ingesting.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Fail on provider or contract errors instead of falling back to neutral.
        #[arg(long)]
        strict: bool,
    },

    /// Print the display banner for the current regime.
    Banner {
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Generate today's daily report and store it.
    Report {
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Print the report without storing it.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a stored report (latest when no date is given).
    ShowReport {
        /// Report date as yyyymmdd.
        #[arg(long)]
        date: Option<String>,
    },

    /// Per-security opinion under the current regime.
    Opinion {
        /// Security code, e.g. 005930.
        #[arg(long)]
        code: String,

        #[arg(long, default_value_t = Horizon::Mid)]
        horizon: Horizon,

        #[arg(long, default_value_t = RiskTolerance::Normal)]
        risk: RiskTolerance,

        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Warm the cache, then refresh it on schedule until Ctrl-C.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = macroquad_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    let pipeline = Pipeline::new(settings);

    if let Err(err) = run(&pipeline, args.command).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %err, "worker command failed");
        return Err(err);
    }
    Ok(())
}

async fn run(pipeline: &Pipeline, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Ingest => {
            let snapshot = pipeline.snapshot(None).await?;
            print_json(&snapshot)
        }
        Command::Stance { snapshot, strict } => {
            let snapshot = pipeline.snapshot(snapshot.as_deref()).await?;
            let engine = pipeline.engine()?;
            let decision = if strict {
                engine.infer(&snapshot).await.context("macro decision failed")?
            } else {
                engine.infer_safe(&snapshot).await
            };
            print_json(&decision)
        }
        Command::Banner { snapshot } => {
            let snapshot = pipeline.snapshot(snapshot.as_deref()).await?;
            let decision = pipeline.engine()?.infer_safe(&snapshot).await;
            print_json(&build_banner(&snapshot, &decision))
        }
        Command::Report { snapshot, dry_run } => {
            let snapshot = pipeline.snapshot(snapshot.as_deref()).await?;
            if dry_run {
                let decision = pipeline.engine()?.infer_safe(&snapshot).await;
                let report = pipeline
                    .report_builder()?
                    .generate_today(&snapshot, &decision)
                    .await;
                tracing::info!(tier = report.tier, dry_run = true, "report not stored");
                println!("{}", report.markdown);
                return Ok(());
            }

            let artifacts = pipeline
                .publisher()?
                .publish_latest()
                .await?
                .context("macro cache is empty")?;
            let report = tokio::fs::read_to_string(&artifacts.report_path)
                .await
                .with_context(|| format!("read report {} failed", artifacts.report_path.display()))?;
            println!("{report}");
            Ok(())
        }
        Command::ShowReport { date } => {
            let storage = pipeline.storage();
            let report = match date.as_deref() {
                Some(key) => storage.load_by_date(key).await?,
                None => storage.load_latest().await?,
            };
            let report = report.with_context(|| match date.as_deref() {
                Some(key) => format!("no report stored for {key}"),
                None => format!("no reports under {}", storage.root().display()),
            })?;
            println!("{report}");
            Ok(())
        }
        Command::Opinion {
            code,
            horizon,
            risk,
            snapshot,
        } => {
            let snapshot = pipeline.snapshot(snapshot.as_deref()).await?;
            let view = pipeline
                .opinion_builder()?
                .build(&snapshot, &code, horizon, risk)
                .await
                .with_context(|| format!("stock opinion for {code} failed"))?;
            print_json(&view)
        }
        Command::Run => serve(pipeline).await,
    }
}

async fn serve(pipeline: &Pipeline) -> anyhow::Result<()> {
    let publisher = Arc::new(pipeline.publisher()?);
    let scheduler = Arc::new(pipeline.scheduler()?.with_publisher(publisher));

    // Scheduled runs will retry; a cold cache is not fatal.
    if !scheduler.run_once("startup").await {
        tracing::error!("initial macro ingest failed; cache stays empty");
    }

    let handle = scheduler.spawn()?;
    tokio::signal::ctrl_c()
        .await
        .context("install Ctrl-C handler failed")?;

    handle.shutdown();
    tracing::info!(last_updated_at = ?pipeline.cache().last_updated_at(), "worker stopped");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("serialize output failed")?;
    println!("{out}");
    Ok(())
}

fn init_sentry(settings: &macroquad_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
