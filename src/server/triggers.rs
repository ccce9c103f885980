//! Runs that start without an HTTP request.

use super::{dispatch, AppState, TriggerSource};
use crate::core::config::TriggerConfig;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

/// Spawns the startup run and the interval loop, as configured.
pub fn spawn(config: &TriggerConfig, state: AppState) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if config.run_on_start {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let _ = dispatch(&state, TriggerSource::Startup).await;
        }));
    } else {
        info!("Startup run disabled");
    }

    if config.enable_interval {
        info!(every_secs = config.interval.as_secs(), "Interval runs enabled");
        handles.push(tokio::spawn(run_every(config.interval, state)));
    }

    handles
}

/// First tick fires one full period after start.
async fn run_every(period: Duration, state: AppState) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let _ = dispatch(&state, TriggerSource::Interval).await;
    }
}
