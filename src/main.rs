mod backend;
mod cli;
mod config;
mod harvest;
mod report;

use std::time::Duration;

use chrono::Local;
use clap::Parser;
use reqwest::Client;
use tracing::{debug, info, warn};

use backend::duckduckgo::DuckDuckGo;
use cli::{Cli, Command, RunArgs};
use config::HarvestConfig;
use harvest::{HarvestPlan, Harvester, JitterPacer};
use report::{CsvReport, ReportSink};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let directive = if cli.verbose { "lookout=debug" } else { "lookout=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();

    let mut config = HarvestConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Plan(select) => {
            select.apply(&mut config);
            config.validate()?;
            print_plan(&plan_for(&config));
        }
        Command::Run(args) => {
            args.apply(&mut config);
            config.validate()?;
            run(&config).await?;
        }
    }
    Ok(())
}

fn plan_for(config: &HarvestConfig) -> HarvestPlan {
    HarvestPlan::new(
        config.subjects.clone(),
        &config.categories,
        &config.profiles,
    )
}

async fn run(config: &HarvestConfig) -> Result<(), Box<dyn std::error::Error>> {
    let http = Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()?;
    let backend = DuckDuckGo::new(http, &config.backend);
    let pacer = JitterPacer::new(config.pacing);
    let plan = plan_for(config);

    info!(
        subjects = plan.subjects.len(),
        calls = plan.len(),
        region = %config.backend.region,
        "starting harvest"
    );

    let harvester = Harvester::new(
        &backend,
        &pacer,
        Duration::from_secs(config.call_timeout_secs),
    );
    let result = harvester.run(&plan).await;

    if result.is_sentinel() {
        warn!("no results found; writing placeholder report");
    } else {
        for (category, records) in result.category_counts() {
            info!(category, records, "category summary");
        }
    }

    let sink = CsvReport::dated(&config.output, Local::now().date_naive());
    debug!(path = %sink.path().display(), "writing report");
    let path = sink
        .write(&result)
        .inspect_err(|e| tracing::error!("failed to save report: {e}"))?;

    info!(path = %path.display(), records = result.len(), "harvest complete");
    Ok(())
}

fn print_plan(plan: &HarvestPlan) {
    for (i, cell) in plan.cells().enumerate() {
        println!(
            "{:>4}  {:<24} {:<16} {:<8} {:>2}  {}",
            i + 1,
            cell.subject.name,
            cell.spec.category.label(),
            cell.spec.backend.name(),
            cell.spec.result_limit,
            cell.query()
        );
    }
}
