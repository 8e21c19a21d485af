use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use iobench::config::{BenchConfig, LoggingConfig};
use iobench::runner::FiringStatus;
use iobench::scheduler::DailySchedule;

#[derive(Parser)]
#[command(
    name = "iobench",
    about = "Scheduled network and file I/O latency benchmark",
    version,
    long_about = None
)]
struct Cli {
    /// Runs per firing (overrides config; invalid values keep the default)
    num_runs: Option<String>,

    /// Server identifier reported with every event
    server_id: Option<String>,

    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single firing immediately and exit
    #[arg(long, conflicts_with = "preview")]
    once: bool,

    /// Print the next N fire times and exit
    #[arg(long, value_name = "N")]
    preview: Option<usize>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config loading logs before the real subscriber exists.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    let mut config = tracing::subscriber::with_default(bootstrap, || {
        BenchConfig::load_or_default(cli.config.as_deref())
    });

    init_tracing(&config.logging);
    config.apply_env_overrides();
    config.apply_cli_overrides(cli.num_runs.as_deref(), cli.server_id.as_deref());

    if let Some(count) = cli.preview {
        let schedule = DailySchedule::from_config(&config.schedule)?;
        println!("Upcoming firings ({}):", schedule);
        for time in schedule.upcoming(chrono::Utc::now(), count) {
            println!("  {}", time.to_rfc3339());
        }
        return Ok(());
    }

    if cli.once {
        let report = iobench::run_once(config).await?;
        println!("\n=== iobench firing {} ===", report.id);
        println!("Run tag: {}", report.run_tag);
        println!("Status:  {}", report.status.as_str());
        println!("{:<6} | {:>10} | {:>10} | {:>10} | Notes", "Run", "Total (s)", "Net (s)", "File (s)");
        println!("{:-<6}-|-{:->10}-|-{:->10}-|-{:->10}-|-{:-<20}", "", "", "", "", "");
        for run in &report.runs {
            let mut notes = Vec::new();
            if run.symbols_failed > 0 {
                notes.push(format!("{} symbol(s) failed", run.symbols_failed));
            }
            if !run.file_ok {
                notes.push("file I/O failed".to_string());
            }
            println!(
                "{:<6} | {:>10.3} | {:>10.3} | {:>10.3} | {}",
                run.run_number,
                run.total_secs,
                run.network_secs,
                run.file_secs,
                notes.join(", ")
            );
        }
        if report.status == FiringStatus::Aborted {
            println!("Firing aborted: scratch directory could not be created.");
        }
        return Ok(());
    }

    iobench::serve(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Interrupt received, stopping scheduler");
    })
    .await
}
