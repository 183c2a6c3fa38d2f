use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, TimeDelta};
use futures::stream::FuturesUnordered;
use tracing::Instrument;
use tokio::task::JoinHandle;

use crate::state::ArcShared;
use crate::error::{self, Context};

mod session;

async fn job_task<F, T>(
    state: ArcShared,
    upcoming: cron::OwnedScheduleIterator<Local>,
    runner: F
) -> error::Result<()>
where
    T: Future<Output = error::Result<()>>,
    F: Fn(ArcShared) -> T,
{
    let zero_delta = TimeDelta::zero();

    for next in upcoming {
        let now = Local::now();
        let delta = next - now;

        if delta < zero_delta {
            continue;
        }

        tracing::debug!("waiting for {delta}");

        if let Ok(wait) = delta.to_std() {
            tokio::time::sleep(wait).await;
        }

        tracing::info!("running job");

        if let Err(err) = runner(Arc::clone(&state)).await {
            tracing::error!("job failed with error: {err}");
        } else {
            tracing::debug!("job finished {}", Local::now());
        }
    }

    tracing::info!("job finished");

    Ok(())
}

fn spawn_job<F, T>(
    state: &ArcShared,
    name: &'static str,
    crontab: &'static str,
    runner: F
) -> error::Result<JoinHandle<()>>
where
    T: Future<Output = error::Result<()>> + Send,
    F: Fn(ArcShared) -> T + Send + 'static,
{
    let local_state = Arc::clone(state);

    let schedule = cron::Schedule::from_str(crontab)
        .context("failed to parse crontab")?;

    let upcoming = schedule.upcoming_owned(Local);

    Ok(tokio::spawn(async move {
        let job_span = tracing::span!(
            tracing::Level::INFO,
            "job",
            name = name
        );

        let result = job_task(local_state, upcoming, runner)
            .instrument(job_span)
            .await;

        if let Err(err) = result {
            tracing::error!("job {name} failed with error {err}");
        }
    }))
}

pub fn background(state: &ArcShared) -> error::Result<FuturesUnordered<JoinHandle<()>>> {
    let waiter = FuturesUnordered::new();

    waiter.push(spawn_job(state, "session_cleanup", "0 0 * * * *", session::cleanup)?);

    Ok(waiter)
}
