use clap::Parser;
use profile_refresh::server::{self, AppState};
use profile_refresh::{ChromeBrowser, Config, StepSequencer};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "profile-refresh", about = "Keeps a job-portal profile freshly saved")]
struct Args {
    /// Listen on this port instead of $PORT
    #[arg(long)]
    port: Option<u16>,

    /// Do a single run and exit instead of serving
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if config.credentials.is_none() {
        error!("NAUKRI_EMAIL and NAUKRI_PASSWORD are not set; runs will fail");
    }

    let sequencer = StepSequencer::new(ChromeBrowser::new, config.clone())?;

    if args.once {
        let report = sequencer.run().await?;
        info!(
            run_id = %report.run_id,
            steps = report.steps.len(),
            "Single run finished"
        );
        return Ok(());
    }

    let state = AppState::new(Arc::new(sequencer));
    server::serve(&config, state).await
}
