//! Periodic invite dispatch.
//!
//! Runs the same dispatch as `POST /sync-and-invite` on a fixed interval.
//! Off unless `INVITE_POLL_INTERVAL_SECS` is set.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::services::{DispatchReport, InviteDispatcher};

/// Configuration for the invite polling task
#[derive(Debug, Clone)]
pub struct InvitePollerConfig {
    pub poll_interval: Duration,
    pub days_ahead: u32,
}

/// One dispatch cycle.
pub async fn run_once(
    dispatcher: &InviteDispatcher,
    config: &InvitePollerConfig,
) -> Result<DispatchReport> {
    dispatcher.dispatch(config.days_ahead).await
}

/// Start the invite polling background task.
///
/// The first cycle runs after one full interval; the server start itself
/// never sends invites.
pub async fn start_invite_polling_task(
    dispatcher: Arc<InviteDispatcher>,
    config: InvitePollerConfig,
) {
    tracing::info!(
        "Starting invite polling task (interval: {:?}, days ahead: {})",
        config.poll_interval,
        config.days_ahead
    );

    loop {
        tokio::time::sleep(config.poll_interval).await;

        match run_once(&dispatcher, &config).await {
            Ok(report) => {
                if report.invites_sent() > 0 {
                    tracing::info!("Invite poll sent {} invites", report.invites_sent());
                }
            }
            Err(e) => {
                tracing::error!("Invite poll cycle failed: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryIdentityStore;
    use crate::testing::{event, person, FakeEventsPlatform, RecordingMessenger};

    #[tokio::test]
    async fn test_run_once_uses_configured_window() {
        let events = Arc::new(
            FakeEventsPlatform::new()
                .with_event(event("E1", "Training", &["P1"], &[]))
                .with_person(person("P1", Some("447700900001"))),
        );
        let messenger = Arc::new(RecordingMessenger::new());
        let dispatcher = InviteDispatcher::new(
            events.clone(),
            messenger.clone(),
            Arc::new(MemoryIdentityStore::new()),
        );
        let config = InvitePollerConfig {
            poll_interval: Duration::from_secs(60),
            days_ahead: 3,
        };

        let report = run_once(&dispatcher, &config).await.expect("cycle");

        assert_eq!(report.invites_sent(), 1);
        assert_eq!(events.requested_windows(), vec![3]);
        assert_eq!(messenger.prompts().len(), 1);
    }
}
