//! Bucket Ledger
//!
//! Command line auditor for object storage cost.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         bucket-ledger s3                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │  Discovery   │───▶│ Region scans │───▶│   Pricing    │       │
//! │  │ (ListBuckets)│    │ (ListObjects)│    │ (Price List) │       │
//! │  └──────────────┘    └──────────────┘    └──────────────┘       │
//! │                 all calls share one rate limiter                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The JSON report goes to stdout (or `--output`); logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bucket_ledger::adapters::aws::{load_sdk_config, PROVIDER_LABEL};
use bucket_ledger::adapters::{AwsConnector, AwsPriceCatalog, JsonReportSink, LoggingEventPublisher};
use bucket_ledger::domain::ports::ReportSink;
use bucket_ledger::report::{GroupBy, OrderKey, SizeUnit, SortOrder};
use bucket_ledger::{AuditConfig, AuditRun, Region, ReportOptions, ScanConfig, StorageClassId};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Bucket Ledger - audit object storage usage and cost across regions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LEDGER_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LEDGER_LOG_JSON", global = true)]
    log_json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit Amazon S3 buckets
    S3(S3Args),
}

#[derive(Args, Debug)]
struct S3Args {
    /// Regions to scan
    #[arg(long, env = "LEDGER_REGIONS", value_delimiter = ',', default_value = "ca-central-1")]
    regions: Vec<String>,

    /// Only audit buckets with these names
    #[arg(long = "name", env = "LEDGER_NAMES", value_delimiter = ',')]
    names: Vec<String>,

    /// Only count objects of these storage classes (e.g. STANDARD,GLACIER_IR)
    #[arg(long = "storage-class", env = "LEDGER_STORAGE_CLASSES", value_delimiter = ',')]
    storage_classes: Vec<StorageClassId>,

    /// Leave empty buckets out of the report
    #[arg(long, env = "LEDGER_OMIT_EMPTY")]
    omit_empty: bool,

    /// Maximum remote operations per second
    #[arg(long, env = "LEDGER_RATE_LIMIT", default_value_t = bucket_ledger::audit::DEFAULT_RATE_LIMIT)]
    rate_limit: u32,

    /// Concurrent bucket scans per region
    #[arg(long, env = "LEDGER_THREADING", default_value_t = bucket_ledger::audit::DEFAULT_THREADING)]
    threading: usize,

    /// Size unit: by, kb, mb, gb, tb, pb
    #[arg(long, env = "LEDGER_DISPLAY_SIZE", default_value = "by")]
    display_size: SizeUnit,

    /// Order ascending by: name, size, cost
    #[arg(long, conflicts_with = "order_by_dec")]
    order_by_inc: Option<OrderKey>,

    /// Order descending by: name, size, cost
    #[arg(long)]
    order_by_dec: Option<OrderKey>,

    /// Group by: region, global
    #[arg(long, env = "LEDGER_GROUP_BY", default_value = "global")]
    group_by: GroupBy,

    /// Write the report to a file instead of stdout
    #[arg(long, short, env = "LEDGER_OUTPUT")]
    output: Option<PathBuf>,
}

impl S3Args {
    fn audit_config(&self) -> AuditConfig {
        let order = match (self.order_by_inc, self.order_by_dec) {
            (Some(key), _) => Some(SortOrder::ascending(key)),
            (None, Some(key)) => Some(SortOrder::descending(key)),
            (None, None) => None,
        };

        AuditConfig {
            scan: ScanConfig {
                regions: self.regions.iter().map(|r| Region::from(r.trim())).collect(),
                name_filter: self.names.clone(),
                class_filter: self.storage_classes.clone(),
                omit_empty: self.omit_empty,
                rate_limit: self.rate_limit,
                threading: self.threading,
                ..ScanConfig::default()
            },
            report: ReportOptions {
                order,
                group_by: self.group_by,
                size_unit: self.display_size,
                provider: PROVIDER_LABEL.to_string(),
            },
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli);

    match cli.command {
        Command::S3(args) => run_s3(args).await,
    }
}

async fn run_s3(args: S3Args) -> anyhow::Result<()> {
    let config = args.audit_config();
    config.validate().context("invalid configuration")?;

    info!("Starting S3 audit");
    info!("  Regions: {:?}", args.regions);
    info!("  Rate limit: {} ops/s", args.rate_limit);
    info!("  Threading: {} per region", args.threading);

    let sdk_config = load_sdk_config().await;
    let connector = Arc::new(AwsConnector::new(sdk_config.clone()));
    let pricing = Arc::new(AwsPriceCatalog::new(&sdk_config));

    let outcome = AuditRun::new(connector, pricing)
        .with_events(Arc::new(LoggingEventPublisher::new()))
        .run(&config)
        .await
        .context("audit failed")?;

    let report = AuditRun::report(&outcome, &config.report);
    let sink = match &args.output {
        Some(path) => JsonReportSink::file(path),
        None => JsonReportSink::stdout(),
    };
    sink.emit(&report).await.context("failed to write report")?;

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(cli: &Cli) {
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "aws_config=warn", "aws_smithy_runtime=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
